//! The per-tab game state and every mutation that can be applied to it.
//!
//! `GameState` is plain data owned by one session. Mutators are synchronous
//! and treat invalid input as a silent no-op: each returns `true` only when
//! something actually changed, which is what the session uses to decide
//! whether to stamp, persist and publish.

mod appearance;
pub mod export;
mod flow;
mod questions;
mod score;
mod teams;

pub use appearance::builtin_sounds;
pub use export::{PersistedState, PERSIST_SCHEMA_VERSION};
pub use flow::TickOutcome;
pub use questions::default_questions;

use crate::protocol::SyncAction;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub questions: Vec<Question>,
    pub teams: Vec<Team>,
    pub current_team_index: usize,
    pub selected_question_id: Option<QuestionId>,
    pub selected_answer_index: Option<usize>,
    pub reveal_answer: bool,
    pub is_timer_running: bool,
    pub remaining_time: u32,
    pub active_view: ActiveView,
    pub completed_questions: BTreeSet<QuestionId>,
    pub notification: Notification,
    pub sounds: Vec<Sound>,
    pub appearance: Appearance,
    /// High-water marks for id allocation; ids are never handed out twice
    pub next_question_id: QuestionId,
    pub next_team_id: TeamId,
    /// Hybrid clock: wall time, but never behind anything this tab has seen
    pub last_update_timestamp: i64,
    /// Question the originating tab has already scored
    #[serde(skip)]
    pub(crate) awarded_question: Option<QuestionId>,
}

impl GameState {
    /// Fresh state with the built-in question catalogue and sounds
    pub fn new() -> Self {
        Self::from_persisted(PersistedState::default())
    }

    /// Rebuild a tab from the persisted subset; transient fields start at their defaults
    pub fn from_persisted(persisted: PersistedState) -> Self {
        let mut state = Self {
            questions: Vec::new(),
            teams: Vec::new(),
            current_team_index: 0,
            selected_question_id: None,
            selected_answer_index: None,
            reveal_answer: false,
            is_timer_running: false,
            remaining_time: 0,
            active_view: ActiveView::Grid,
            completed_questions: BTreeSet::new(),
            notification: Notification::default(),
            sounds: Vec::new(),
            appearance: Appearance::default(),
            next_question_id: 1,
            next_team_id: 1,
            last_update_timestamp: 0,
            awarded_question: None,
        };
        state.restore_persisted(persisted);
        state
    }

    /// The subset that survives a reload
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            schema_version: PERSIST_SCHEMA_VERSION,
            questions: self.questions.clone(),
            teams: self.teams.clone(),
            completed_questions: self.completed_questions.clone(),
            next_question_id: self.next_question_id,
            next_team_id: self.next_team_id,
            sounds: self.sounds.clone(),
            appearance: self.appearance.clone(),
        }
    }

    /// Overwrite the persisted subset, keeping transient fields where they still make sense
    pub fn restore_persisted(&mut self, persisted: PersistedState) {
        self.questions = persisted.questions;
        self.teams = persisted.teams;
        self.completed_questions = persisted.completed_questions;
        self.sounds = persisted.sounds;
        self.appearance = persisted.appearance;
        self.next_question_id = persisted.next_question_id.max(self.allocated_question_id());
        self.next_team_id = persisted.next_team_id.max(self.allocated_team_id());

        if self.current_team_index >= self.teams.len() {
            self.current_team_index = 0;
        }
        if let Some(id) = self.selected_question_id {
            if self.question(id).is_none() {
                self.clear_selection();
            }
        }
    }

    /// Advance the clock for a local mutation and return the new timestamp
    pub fn stamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_update_timestamp = now.max(self.last_update_timestamp + 1);
        self.last_update_timestamp
    }

    /// Fold a peer's timestamp into the clock
    pub fn observe(&mut self, timestamp: i64) {
        self.last_update_timestamp = self.last_update_timestamp.max(timestamp);
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.selected_question_id.and_then(|id| self.question(id))
    }

    pub fn current_team(&self) -> Option<&Team> {
        self.teams.get(self.current_team_index)
    }

    /// Apply one action. Returns whether anything changed.
    pub fn apply(&mut self, action: &SyncAction) -> bool {
        use SyncAction::*;

        match action {
            SelectQuestion { question_id } => self.select_question(*question_id),
            SelectAnswer { answer_index } => self.select_answer(*answer_index),
            ShowAnswer {} => self.show_answer(),
            CloseQuestion {} => self.close_question(),
            StartTimer {} => self.start_timer(),
            StopTimer {} => self.stop_timer(),
            ResetTimer { time } => self.reset_timer(*time),

            UpdateTeamPoints { team_id, delta } => self.update_team_points(*team_id, *delta),
            ShowNotification { message, kind } => self.show_notification(message, *kind),
            HideNotification {} => self.hide_notification(),
            MarkQuestionCompleted { question_id } => self.mark_question_completed(*question_id),

            AddTeam { team } => self.add_team(team.clone()),
            RemoveTeam { team_id } => self.remove_team(*team_id),
            SetCurrentTeam { index } => self.set_current_team(*index),
            NextTeam {} => self.next_team(),

            AddQuestion { question } => self.add_question(question.clone()),
            UpdateQuestion { question_id, patch } => self.update_question(*question_id, patch),
            RemoveQuestion { question_id } => self.remove_question(*question_id),
            SetQuestions { questions } => self.set_questions(questions.clone()),
            ResetQuestions {} => self.reset_questions(),

            SetColors { colors } => self.set_colors(colors.clone()),
            ResetColors {} => self.reset_colors(),
            AddSound { sound } => self.add_sound(sound.clone()),
            RemoveSound { sound_id } => self.remove_sound(sound_id),
            SetLogo { logo } => self.set_logo(logo.clone()),
            SetBackground { background } => self.set_background(background.clone()),
            SetQuestionWindow { layer } => self.set_question_window(layer.clone()),
            SetCustomMessageImage { url } => self.set_custom_message_image(url.clone()),
            SetNotificationDisplayTime { millis } => self.set_notification_display_time(*millis),

            ResetGame {} => self.reset_game(),
        }
    }

    /// Apply an action whose persisted effects are already contained in a
    /// freshly restored snapshot.
    ///
    /// Every action is idempotent against such a snapshot except point deltas,
    /// which only keep their notification here.
    pub fn apply_restored(&mut self, action: &SyncAction) -> bool {
        match action {
            SyncAction::UpdateTeamPoints { team_id, delta } => {
                self.announce_points(*team_id, *delta)
            }
            other => self.apply(other),
        }
    }

    /// Start a new game: scores, progress and the live question are wiped,
    /// the catalogue and the teams stay.
    pub fn reset_game(&mut self) -> bool {
        let before = (
            self.teams.iter().map(|t| t.points).collect::<Vec<_>>(),
            self.completed_questions.len(),
            self.current_team_index,
            self.selected_question_id,
            self.active_view,
            self.is_timer_running,
            self.notification.visible,
        );

        for team in &mut self.teams {
            team.points = 0;
        }
        self.completed_questions.clear();
        self.current_team_index = 0;
        self.clear_selection();
        self.notification.visible = false;
        self.awarded_question = None;

        before
            != (
                self.teams.iter().map(|t| t.points).collect::<Vec<_>>(),
                self.completed_questions.len(),
                self.current_team_index,
                self.selected_question_id,
                self.active_view,
                self.is_timer_running,
                self.notification.visible,
            )
    }

    /// Back to the grid with nothing selected
    fn clear_selection(&mut self) {
        self.selected_question_id = None;
        self.selected_answer_index = None;
        self.reveal_answer = false;
        self.is_timer_running = false;
        self.active_view = ActiveView::Grid;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
