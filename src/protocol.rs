use crate::state::GameState;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Every state mutation that other tabs must observe.
///
/// Serialized as `{"type": "SELECT_QUESTION", "payload": {...}}`, the layout
/// stored under the synchronization key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum SyncAction {
    // Flow
    SelectQuestion {
        question_id: QuestionId,
    },
    SelectAnswer {
        answer_index: usize,
    },
    ShowAnswer {},
    CloseQuestion {},
    StartTimer {},
    StopTimer {},
    ResetTimer {
        #[serde(default)]
        time: Option<u32>,
    },

    // Scoring
    UpdateTeamPoints {
        team_id: TeamId,
        delta: i64,
    },
    ShowNotification {
        message: String,
        kind: NotificationKind,
    },
    HideNotification {},
    MarkQuestionCompleted {
        question_id: QuestionId,
    },

    // Roster
    AddTeam {
        team: Team,
    },
    RemoveTeam {
        team_id: TeamId,
    },
    SetCurrentTeam {
        index: usize,
    },
    NextTeam {},

    // Content
    AddQuestion {
        question: Question,
    },
    UpdateQuestion {
        question_id: QuestionId,
        patch: QuestionPatch,
    },
    RemoveQuestion {
        question_id: QuestionId,
    },
    SetQuestions {
        questions: Vec<Question>,
    },
    ResetQuestions {},

    // Appearance
    SetColors {
        colors: QuizColors,
    },
    ResetColors {},
    AddSound {
        sound: Sound,
    },
    RemoveSound {
        sound_id: SoundId,
    },
    SetLogo {
        logo: LogoConfig,
    },
    SetBackground {
        background: BackgroundConfig,
    },
    SetQuestionWindow {
        layer: ImageLayer,
    },
    SetCustomMessageImage {
        #[serde(default)]
        url: Option<String>,
    },
    SetNotificationDisplayTime {
        millis: u64,
    },

    // Lifecycle
    ResetGame {},
}

impl SyncAction {
    pub fn scope(&self) -> ActionScope {
        use SyncAction::*;

        match self {
            SelectQuestion { .. }
            | SelectAnswer { .. }
            | ShowAnswer {}
            | CloseQuestion {}
            | StartTimer {}
            | StopTimer {}
            | ResetTimer { .. } => ActionScope::Flow,

            UpdateTeamPoints { .. }
            | ShowNotification { .. }
            | HideNotification {}
            | MarkQuestionCompleted { .. } => ActionScope::Scoring,

            AddTeam { .. } | RemoveTeam { .. } | SetCurrentTeam { .. } | NextTeam {} => {
                ActionScope::Roster
            }

            AddQuestion { .. }
            | UpdateQuestion { .. }
            | RemoveQuestion { .. }
            | SetQuestions { .. }
            | ResetQuestions {} => ActionScope::Content,

            SetColors { .. }
            | ResetColors {}
            | AddSound { .. }
            | RemoveSound { .. }
            | SetLogo { .. }
            | SetBackground { .. }
            | SetQuestionWindow { .. }
            | SetCustomMessageImage { .. }
            | SetNotificationDisplayTime { .. } => ActionScope::Appearance,

            ResetGame {} => ActionScope::Lifecycle,
        }
    }

    /// Whether applying this action can change the persisted snapshot
    pub fn touches_persisted(&self) -> bool {
        use SyncAction::*;

        match self.scope() {
            ActionScope::Content | ActionScope::Appearance | ActionScope::Lifecycle => true,
            ActionScope::Roster => !matches!(self, SetCurrentTeam { .. } | NextTeam {}),
            ActionScope::Scoring => matches!(
                self,
                UpdateTeamPoints { .. } | MarkQuestionCompleted { .. }
            ),
            // Revealing marks the question as completed
            ActionScope::Flow => matches!(self, ShowAnswer {}),
        }
    }

    /// Wire name of the variant, for logs
    pub fn kind(&self) -> &'static str {
        use SyncAction::*;

        match self {
            SelectQuestion { .. } => "SELECT_QUESTION",
            SelectAnswer { .. } => "SELECT_ANSWER",
            ShowAnswer {} => "SHOW_ANSWER",
            CloseQuestion {} => "CLOSE_QUESTION",
            StartTimer {} => "START_TIMER",
            StopTimer {} => "STOP_TIMER",
            ResetTimer { .. } => "RESET_TIMER",
            UpdateTeamPoints { .. } => "UPDATE_TEAM_POINTS",
            ShowNotification { .. } => "SHOW_NOTIFICATION",
            HideNotification {} => "HIDE_NOTIFICATION",
            MarkQuestionCompleted { .. } => "MARK_QUESTION_COMPLETED",
            AddTeam { .. } => "ADD_TEAM",
            RemoveTeam { .. } => "REMOVE_TEAM",
            SetCurrentTeam { .. } => "SET_CURRENT_TEAM",
            NextTeam {} => "NEXT_TEAM",
            AddQuestion { .. } => "ADD_QUESTION",
            UpdateQuestion { .. } => "UPDATE_QUESTION",
            RemoveQuestion { .. } => "REMOVE_QUESTION",
            SetQuestions { .. } => "SET_QUESTIONS",
            ResetQuestions {} => "RESET_QUESTIONS",
            SetColors { .. } => "SET_COLORS",
            ResetColors {} => "RESET_COLORS",
            AddSound { .. } => "ADD_SOUND",
            RemoveSound { .. } => "REMOVE_SOUND",
            SetLogo { .. } => "SET_LOGO",
            SetBackground { .. } => "SET_BACKGROUND",
            SetQuestionWindow { .. } => "SET_QUESTION_WINDOW",
            SetCustomMessageImage { .. } => "SET_CUSTOM_MESSAGE_IMAGE",
            SetNotificationDisplayTime { .. } => "SET_NOTIFICATION_DISPLAY_TIME",
            ResetGame {} => "RESET_GAME",
        }
    }
}

/// The single most recent mutation, as stored in the synchronization slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRecord {
    pub action: SyncAction,
    /// Milliseconds since the Unix epoch, from the writer's hybrid clock
    pub timestamp: i64,
    /// Tab that wrote the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<TabId>,
    /// Per-origin sequence number, starting at 1
    #[serde(default)]
    pub seq: u64,
}

/// Commands sent by a view over its WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    SelectQuestion {
        question_id: QuestionId,
    },
    SelectAnswer {
        answer_index: usize,
    },
    ShowAnswer,
    CloseQuestion,
    StartTimer,
    StopTimer,
    ResetTimer {
        #[serde(default)]
        time: Option<u32>,
    },
    UpdateTeamPoints {
        team_id: TeamId,
        delta: i64,
    },
    /// Score the current team against the selected answer
    AwardPoints,
    AddTeam {
        name: String,
    },
    RemoveTeam {
        team_id: TeamId,
    },
    SetCurrentTeam {
        index: usize,
    },
    NextTeam,
    AddQuestion {
        question: QuestionDraft,
    },
    UpdateQuestion {
        question_id: QuestionId,
        patch: QuestionPatch,
    },
    RemoveQuestion {
        question_id: QuestionId,
    },
    ResetQuestions,
    ShowNotification {
        message: String,
        kind: NotificationKind,
    },
    HideNotification,
    ResetGame,
    SetColors {
        colors: QuizColors,
    },
    ResetColors,
    AddSound {
        name: String,
        url: String,
    },
    RemoveSound {
        sound_id: SoundId,
    },
    PlaySound {
        sound_id: SoundId,
    },
    SetLogo {
        logo: LogoConfig,
    },
    SetBackground {
        background: BackgroundConfig,
    },
    SetQuestionWindow {
        layer: ImageLayer,
    },
    SetCustomMessageImage {
        #[serde(default)]
        url: Option<String>,
    },
    SetNotificationDisplayTime {
        millis: u64,
    },
    VerifyAdminPassword {
        password: String,
    },
}

/// Messages pushed to a view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        tab_id: TabId,
        state: Box<GameState>,
        server_now: String,
    },
    /// Full snapshot after any change
    State {
        state: Box<GameState>,
    },
    PlaySound {
        sound_id: SoundId,
        url: String,
    },
    AdminVerified {
        ok: bool,
    },
    Error {
        code: String,
        msg: String,
    },
}
