use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque ID types
pub type QuestionId = u32;
pub type TeamId = u32;
pub type SoundId = String;
pub type TabId = String;

/// Every question carries exactly this many answer options
pub const ANSWER_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub answers: Vec<String>,
    pub correct_answer_index: usize,
    pub points: i64,
    pub time_limit: u32,
    #[serde(default)]
    pub used_custom_reward: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_reward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_penalty: Option<String>,
}

impl Question {
    /// Structural check: four answers and a correct index pointing into them
    pub fn is_valid(&self) -> bool {
        self.answers.len() == ANSWER_COUNT && self.correct_answer_index < self.answers.len()
    }

    pub fn from_draft(id: QuestionId, draft: QuestionDraft) -> Self {
        Self {
            id,
            text: draft.text,
            category: draft.category,
            answers: draft.answers,
            correct_answer_index: draft.correct_answer_index,
            points: draft.points,
            time_limit: draft.time_limit,
            used_custom_reward: draft.used_custom_reward,
            custom_reward: draft.custom_reward,
            custom_penalty: draft.custom_penalty,
        }
    }
}

/// A question as submitted by the admin panel, before an id is assigned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    pub answers: Vec<String>,
    pub correct_answer_index: usize,
    pub points: i64,
    pub time_limit: u32,
    #[serde(default)]
    pub used_custom_reward: bool,
    #[serde(default)]
    pub custom_reward: Option<String>,
    #[serde(default)]
    pub custom_penalty: Option<String>,
}

/// Partial edit of a question; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_custom_reward: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_reward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_penalty: Option<String>,
}

impl QuestionPatch {
    /// Apply the patch onto a copy of `question`
    pub fn applied_to(&self, question: &Question) -> Question {
        let mut next = question.clone();
        if let Some(text) = &self.text {
            next.text = text.clone();
        }
        if let Some(category) = &self.category {
            next.category = Some(category.clone());
        }
        if let Some(answers) = &self.answers {
            next.answers = answers.clone();
        }
        if let Some(index) = self.correct_answer_index {
            next.correct_answer_index = index;
        }
        if let Some(points) = self.points {
            next.points = points;
        }
        if let Some(time_limit) = self.time_limit {
            next.time_limit = time_limit;
        }
        if let Some(used) = self.used_custom_reward {
            next.used_custom_reward = used;
        }
        if let Some(reward) = &self.custom_reward {
            next.custom_reward = Some(reward.clone());
        }
        if let Some(penalty) = &self.custom_penalty {
            next.custom_penalty = Some(penalty.clone());
        }
        next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Signed: wrong answers can push a team below zero
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub id: SoundId,
    pub name: String,
    /// Either a static path or a `data:` URL produced by an upload
    pub url: String,
    #[serde(default)]
    pub builtin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizColors {
    pub correct: String,
    pub incorrect: String,
    pub selected: String,
    pub timer_start: String,
    pub timer_mid: String,
    pub timer_end: String,
    pub active_team: String,
}

impl Default for QuizColors {
    fn default() -> Self {
        Self {
            correct: "#22c55e".to_string(),
            incorrect: "#ef4444".to_string(),
            selected: "#3b82f6".to_string(),
            timer_start: "#22c55e".to_string(),
            timer_mid: "#eab308".to_string(),
            timer_end: "#ef4444".to_string(),
            active_team: "#3b82f6".to_string(),
        }
    }
}

impl QuizColors {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            &self.correct,
            &self.incorrect,
            &self.selected,
            &self.timer_start,
            &self.timer_mid,
            &self.timer_end,
            &self.active_team,
        ]
        .into_iter()
        .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogoConfig {
    pub url: Option<String>,
    pub text: Option<String>,
    /// Maximum rendered height in pixels
    pub size: u32,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            url: None,
            text: None,
            size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundConfig {
    pub image_url: Option<String>,
    pub opacity: f32,
    /// Percent of the viewport
    pub size: u32,
    pub position_x: u32,
    pub position_y: u32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            image_url: None,
            opacity: 0.5,
            size: 100,
            position_x: 50,
            position_y: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    pub image_url: Option<String>,
    pub opacity: f32,
}

impl Default for ImageLayer {
    fn default() -> Self {
        Self {
            image_url: None,
            opacity: 1.0,
        }
    }
}

/// Visual configuration shared by every role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Appearance {
    pub colors: QuizColors,
    pub logo: LogoConfig,
    pub background: BackgroundConfig,
    pub question_window: ImageLayer,
    pub custom_message_image_url: Option<String>,
    pub notification_display_ms: u64,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            colors: QuizColors::default(),
            logo: LogoConfig::default(),
            background: BackgroundConfig::default(),
            question_window: ImageLayer::default(),
            custom_message_image_url: None,
            notification_display_ms: DEFAULT_NOTIFICATION_MS,
        }
    }
}

pub const DEFAULT_NOTIFICATION_MS: u64 = 3000;
pub const MIN_NOTIFICATION_MS: u64 = 1000;
pub const MAX_NOTIFICATION_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    #[default]
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub visible: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Bumped on every show; a hide timer only hides the generation it was armed for
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Grid,
    Question,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Host,
    Player,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Host, Role::Player];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Host => "host",
            Role::Player => "player",
        }
    }

    /// Whether this role may originate actions of the given scope
    pub fn may_originate(&self, scope: ActionScope) -> bool {
        match self {
            Role::Admin => true,
            Role::Host => matches!(
                scope,
                ActionScope::Flow | ActionScope::Scoring | ActionScope::Roster
            ),
            Role::Player => false,
        }
    }

}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "host" => Ok(Role::Host),
            "player" => Ok(Role::Player),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Groups of actions with a common origination policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionScope {
    /// Selection, answer, reveal, close, timer
    Flow,
    /// Points, notifications, completion marks
    Scoring,
    /// Teams and the current team
    Roster,
    /// Question catalogue
    Content,
    /// Colors, sounds, logo, backgrounds
    Appearance,
    /// Whole-game reset
    Lifecycle,
}
