//! One tab: a role, its own copy of the game state and its background tasks.
//!
//! Local commands go through [`Session::dispatch`], which applies, stamps,
//! persists and publishes. Peer records come in through
//! [`Session::poll_once`], which replays without publishing anything.

use crate::broadcast;
use crate::error::ImportError;
use crate::protocol::{ServerMessage, SyncAction, SyncRecord};
use crate::state::{export, GameState, TickOutcome};
use crate::storage::{self, KvStore};
use crate::sync::{SkipReason, SyncCursor, Verdict};
use crate::types::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast as channel, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Outcome of a locally originated command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// State changed and the record was published
    Applied,
    /// Guard refused or nothing to change
    Unchanged,
    /// The role may not originate this kind of action
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sync_interval: Duration,
    pub tick_interval: Duration,
    pub admin_password: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_millis(500),
            tick_interval: Duration::from_secs(1),
            admin_password: crate::auth::DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Session {
    pub role: Role,
    pub tab_id: TabId,
    pub config: Arc<SessionConfig>,
    pub state: Arc<RwLock<GameState>>,
    cursor: Arc<Mutex<SyncCursor>>,
    store: Arc<dyn KvStore>,
    /// In-process wake-up for pollers, shared by every session of the process
    bus: channel::Sender<()>,
    /// Pushes to the views attached to this tab
    views: channel::Sender<ServerMessage>,
    seq: Arc<AtomicU64>,
    armed_generation: Arc<AtomicU64>,
    tasks: Arc<std::sync::Mutex<Vec<JoinHandle<()>>>>,
}

impl Session {
    /// Bootstrap a tab from the persisted snapshot, then adopt whatever record
    /// already sits in the synchronization slot.
    pub async fn open(
        role: Role,
        store: Arc<dyn KvStore>,
        bus: channel::Sender<()>,
        config: SessionConfig,
    ) -> Self {
        let tab_id = ulid::Ulid::new().to_string();

        let mut state = match storage::load_snapshot(store.as_ref()).await {
            Some(snapshot) => GameState::from_persisted(snapshot),
            None => GameState::new(),
        };

        let mut cursor = SyncCursor::new();
        if let Some(record) = storage::read_sync_record(store.as_ref()).await {
            state.observe(record.timestamp);
            cursor.advance(&record);
            state.apply_restored(&record.action);
            tracing::debug!(
                "{} tab adopted pending {} record",
                role,
                record.action.kind()
            );
        }

        tracing::info!(
            "Opened {} tab {} ({} questions, {} teams)",
            role,
            tab_id,
            state.questions.len(),
            state.teams.len()
        );

        let (views, _) = channel::channel(64);
        let notification = state.notification.clone();
        let display_ms = state.appearance.notification_display_ms;
        let session = Self {
            role,
            tab_id,
            config: Arc::new(config),
            state: Arc::new(RwLock::new(state)),
            cursor: Arc::new(Mutex::new(cursor)),
            store,
            bus,
            views,
            seq: Arc::new(AtomicU64::new(0)),
            armed_generation: Arc::new(AtomicU64::new(0)),
            tasks: Arc::new(std::sync::Mutex::new(Vec::new())),
        };
        session.arm_notification_hide(&notification, display_ms);
        session
    }

    /// Spawn the countdown ticker and the sync poller
    pub fn start(&self) {
        let Ok(mut tasks) = self.tasks.lock() else {
            tracing::error!("{} tab task list is poisoned", self.role);
            return;
        };
        if !tasks.is_empty() {
            return;
        }
        tasks.push(broadcast::spawn_timer_ticker(self.clone()));
        tasks.push(broadcast::spawn_sync_poller(self.clone()));
    }

    /// Cancel background tasks. Nothing mutates the state afterwards except direct calls.
    pub fn shutdown(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        tracing::info!("Closed {} tab {}", self.role, self.tab_id);
    }

    pub fn subscribe(&self) -> channel::Receiver<ServerMessage> {
        self.views.subscribe()
    }

    pub(crate) fn nudges(&self) -> channel::Receiver<()> {
        self.bus.subscribe()
    }

    pub async fn snapshot(&self) -> GameState {
        self.state.read().await.clone()
    }

    // ---- Origination path ----

    /// Apply a local command and publish it to the other tabs
    pub async fn dispatch(&self, action: SyncAction) -> Dispatch {
        if !self.role.may_originate(action.scope()) {
            tracing::warn!("{} tab may not originate {}", self.role, action.kind());
            return Dispatch::Forbidden;
        }

        let mut state = self.state.write().await;
        if !state.apply(&action) {
            tracing::debug!("{} on {} tab changed nothing", action.kind(), self.role);
            return Dispatch::Unchanged;
        }
        self.publish(&mut state, action).await;
        self.after_change(&state);
        Dispatch::Applied
    }

    /// Stamp, persist and write the record for an action already applied to `state`.
    /// Storage failures degrade to single-tab operation.
    async fn publish(&self, state: &mut GameState, action: SyncAction) {
        let timestamp = state.stamp();

        if action.touches_persisted() {
            if let Err(e) = storage::save_snapshot(self.store.as_ref(), &state.persisted()).await {
                tracing::warn!("Could not persist state after {}: {}", action.kind(), e);
            }
        }

        let record = SyncRecord {
            timestamp,
            origin: Some(self.tab_id.clone()),
            seq: self.seq.fetch_add(1, Ordering::SeqCst) + 1,
            action,
        };
        match storage::write_sync_record(self.store.as_ref(), &record).await {
            Ok(()) => {
                tracing::info!(
                    "{} tab published {} #{}",
                    self.role,
                    record.action.kind(),
                    record.seq
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Sync slot unavailable, {} stays local: {}",
                    record.action.kind(),
                    e
                );
            }
        }

        // No receivers just means no other tab in this process
        let _ = self.bus.send(());
    }

    // ---- Replay path ----

    /// Look at the synchronization slot once. Returns whether the state changed.
    pub async fn poll_once(&self) -> bool {
        let Some(record) = storage::read_sync_record(self.store.as_ref()).await else {
            return false;
        };

        let mut state = self.state.write().await;
        let verdict = self.cursor.lock().await.admit(
            &record,
            &self.tab_id,
            state.last_update_timestamp,
        );

        let changed = match verdict {
            Verdict::Skip(SkipReason::AlreadyProcessed) | Verdict::Skip(SkipReason::OwnRecord) => {
                return false;
            }
            Verdict::Skip(reason) => {
                state.observe(record.timestamp);
                tracing::debug!(
                    "{} tab skipped {} ({:?})",
                    self.role,
                    record.action.kind(),
                    reason
                );
                return false;
            }
            Verdict::Apply => {
                state.observe(record.timestamp);
                state.apply(&record.action)
            }
            Verdict::Resync => {
                tracing::info!(
                    "{} tab missed records before {}, reloading snapshot",
                    self.role,
                    record.action.kind()
                );
                if let Some(snapshot) = storage::load_snapshot(self.store.as_ref()).await {
                    state.restore_persisted(snapshot);
                }
                state.observe(record.timestamp);
                state.apply_restored(&record.action);
                true
            }
        };

        if changed {
            tracing::debug!("{} tab replayed {}", self.role, record.action.kind());
            self.after_change(&state);
        }
        changed
    }

    /// Advance the local countdown by one step. When the clock runs out, a
    /// tab allowed to drive the flow announces the reveal to the others.
    pub async fn tick(&self) -> TickOutcome {
        let mut state = self.state.write().await;
        let outcome = state.tick();

        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Ticked => self.push_state(&state),
            TickOutcome::Expired => {
                if self.role.may_originate(ActionScope::Flow) {
                    self.publish(&mut state, SyncAction::ShowAnswer {}).await;
                }
                self.after_change(&state);
            }
        }
        outcome
    }

    fn push_state(&self, state: &GameState) {
        let _ = self.views.send(ServerMessage::State {
            state: Box::new(state.clone()),
        });
    }

    fn after_change(&self, state: &GameState) {
        self.push_state(state);
        self.arm_notification_hide(
            &state.notification,
            state.appearance.notification_display_ms,
        );
    }

    /// At most one hide timer per shown notification
    fn arm_notification_hide(&self, notification: &Notification, display_ms: u64) {
        let generation = notification.generation;
        if notification.visible
            && self.armed_generation.swap(generation, Ordering::SeqCst) != generation
        {
            let delay = Duration::from_millis(display_ms);
            broadcast::spawn_notification_hider(self.clone(), generation, delay);
        }
    }

    /// Local auto-hide; every tab runs its own timer so nothing is published
    pub async fn hide_notification_if(&self, generation: u64) -> bool {
        let mut state = self.state.write().await;
        let hidden = state.hide_notification_if(generation);
        if hidden {
            self.push_state(&state);
        }
        hidden
    }

    // ---- Collaborator interface ----

    pub async fn select_question(&self, question_id: QuestionId) -> Dispatch {
        self.dispatch(SyncAction::SelectQuestion { question_id }).await
    }

    pub async fn select_answer(&self, answer_index: usize) -> Dispatch {
        self.dispatch(SyncAction::SelectAnswer { answer_index }).await
    }

    pub async fn show_answer(&self) -> Dispatch {
        self.dispatch(SyncAction::ShowAnswer {}).await
    }

    pub async fn close_question(&self) -> Dispatch {
        self.dispatch(SyncAction::CloseQuestion {}).await
    }

    pub async fn start_timer(&self) -> Dispatch {
        self.dispatch(SyncAction::StartTimer {}).await
    }

    pub async fn stop_timer(&self) -> Dispatch {
        self.dispatch(SyncAction::StopTimer {}).await
    }

    pub async fn reset_timer(&self, time: Option<u32>) -> Dispatch {
        self.dispatch(SyncAction::ResetTimer { time }).await
    }

    pub async fn update_team_points(&self, team_id: TeamId, delta: i64) -> Dispatch {
        self.dispatch(SyncAction::UpdateTeamPoints { team_id, delta })
            .await
    }

    /// Score the current team against the selected answer, once per selection
    pub async fn award_points(&self) -> Dispatch {
        if !self.role.may_originate(ActionScope::Scoring) {
            return Dispatch::Forbidden;
        }
        let Some(action) = self.state.read().await.award_action() else {
            return Dispatch::Unchanged;
        };

        let outcome = self.dispatch(action).await;
        if outcome == Dispatch::Applied {
            self.state.write().await.mark_awarded();
        }
        outcome
    }

    pub async fn show_notification(&self, message: &str, kind: NotificationKind) -> Dispatch {
        self.dispatch(SyncAction::ShowNotification {
            message: message.to_string(),
            kind,
        })
        .await
    }

    pub async fn hide_notification(&self) -> Dispatch {
        self.dispatch(SyncAction::HideNotification {}).await
    }

    pub async fn add_team(&self, name: &str) -> Dispatch {
        if !self.role.may_originate(ActionScope::Roster) {
            return Dispatch::Forbidden;
        }
        let Some(team) = self.state.read().await.draft_team(name) else {
            return Dispatch::Unchanged;
        };
        self.dispatch(SyncAction::AddTeam { team }).await
    }

    pub async fn remove_team(&self, team_id: TeamId) -> Dispatch {
        self.dispatch(SyncAction::RemoveTeam { team_id }).await
    }

    pub async fn set_current_team(&self, index: usize) -> Dispatch {
        self.dispatch(SyncAction::SetCurrentTeam { index }).await
    }

    pub async fn next_team(&self) -> Dispatch {
        self.dispatch(SyncAction::NextTeam {}).await
    }

    pub async fn add_question(&self, draft: QuestionDraft) -> Dispatch {
        if !self.role.may_originate(ActionScope::Content) {
            return Dispatch::Forbidden;
        }
        let id = self.state.read().await.next_question_id();
        self.dispatch(SyncAction::AddQuestion {
            question: Question::from_draft(id, draft),
        })
        .await
    }

    pub async fn update_question(&self, question_id: QuestionId, patch: QuestionPatch) -> Dispatch {
        self.dispatch(SyncAction::UpdateQuestion { question_id, patch })
            .await
    }

    pub async fn remove_question(&self, question_id: QuestionId) -> Dispatch {
        self.dispatch(SyncAction::RemoveQuestion { question_id })
            .await
    }

    pub async fn reset_questions(&self) -> Dispatch {
        self.dispatch(SyncAction::ResetQuestions {}).await
    }

    /// Replace the whole catalogue with the content of a question file
    pub async fn import_questions(&self, content: &str) -> Result<Dispatch, ImportError> {
        let questions = export::import_questions(content)?;
        tracing::info!("Importing {} questions", questions.len());
        Ok(self.dispatch(SyncAction::SetQuestions { questions }).await)
    }

    pub async fn export_questions(&self) -> Result<String, serde_json::Error> {
        export::export_questions(&self.state.read().await.questions)
    }

    pub async fn reset_game(&self) -> Dispatch {
        self.dispatch(SyncAction::ResetGame {}).await
    }

    /// Register an uploaded sound under a fresh id
    pub async fn add_custom_sound(&self, name: &str, url: String) -> Dispatch {
        let sound = Sound {
            id: format!("custom-{}", ulid::Ulid::new().to_string().to_lowercase()),
            name: name.trim().to_string(),
            url,
            builtin: false,
        };
        self.dispatch(SyncAction::AddSound { sound }).await
    }

    /// Cue the views of this tab to play a sound. Unknown ids are ignored.
    pub async fn play_sound(&self, sound_id: &str) -> bool {
        let url = match self.state.read().await.sound_url(sound_id) {
            Some(url) => url.to_string(),
            None => {
                tracing::debug!("No sound with id {}", sound_id);
                return false;
            }
        };
        let _ = self.views.send(ServerMessage::PlaySound {
            sound_id: sound_id.to_string(),
            url,
        });
        true
    }

    pub fn verify_admin_password(&self, candidate: &str) -> bool {
        let ok = crate::auth::verify_password(&self.config.admin_password, candidate);
        if ok {
            tracing::info!("Admin password accepted on {} tab", self.role);
        } else {
            tracing::warn!("Admin password rejected on {} tab", self.role);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn open(role: Role, store: &MemoryStore, bus: &channel::Sender<()>) -> Session {
        Session::open(
            role,
            Arc::new(store.clone()),
            bus.clone(),
            SessionConfig::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_player_cannot_originate() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let player = open(Role::Player, &store, &bus).await;

        assert_eq!(player.select_question(1).await, Dispatch::Forbidden);
        assert_eq!(player.add_team("Sneaky").await, Dispatch::Forbidden);
        assert_eq!(player.snapshot().await.selected_question_id, None);
        assert!(storage::read_sync_record(&store).await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_writes_record_and_snapshot() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let admin = open(Role::Admin, &store, &bus).await;

        assert_eq!(admin.add_team("Owls").await, Dispatch::Applied);

        let record = storage::read_sync_record(&store).await.unwrap();
        assert_eq!(record.origin.as_deref(), Some(admin.tab_id.as_str()));
        assert_eq!(record.seq, 1);
        assert!(matches!(record.action, SyncAction::AddTeam { .. }));

        let snapshot = storage::load_snapshot(&store).await.unwrap();
        assert_eq!(snapshot.teams.len(), 1);
        assert_eq!(snapshot.teams[0].name, "Owls");
    }

    #[tokio::test]
    async fn test_unchanged_command_publishes_nothing() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let host = open(Role::Host, &store, &bus).await;

        assert_eq!(host.select_question(999).await, Dispatch::Unchanged);
        assert_eq!(host.add_team("   ").await, Dispatch::Unchanged);
        assert_eq!(host.stop_timer().await, Dispatch::Unchanged);
        assert!(storage::read_sync_record(&store).await.is_none());
    }

    #[tokio::test]
    async fn test_tab_does_not_replay_its_own_record() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let admin = open(Role::Admin, &store, &bus).await;

        admin.add_team("Owls").await;
        assert!(!admin.poll_once().await);
        assert_eq!(admin.snapshot().await.teams.len(), 1);
    }

    #[tokio::test]
    async fn test_new_tab_bootstraps_from_snapshot() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let admin = open(Role::Admin, &store, &bus).await;
        admin.add_team("Owls").await;
        admin.add_team("Foxes").await;
        admin.update_team_points(1, 30).await;

        let player = open(Role::Player, &store, &bus).await;
        let state = player.snapshot().await;
        assert_eq!(state.teams.len(), 2);
        // The adopted point record is not added on top of the snapshot
        assert_eq!(state.teams[0].points, 30);
        assert!(state.notification.visible);
    }

    #[tokio::test]
    async fn test_missed_records_are_recovered_from_snapshot() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let admin = open(Role::Admin, &store, &bus).await;
        let player = open(Role::Player, &store, &bus).await;

        // Player does not poll in between: only the last record survives in the slot
        admin.add_team("Owls").await;
        admin.add_team("Foxes").await;
        admin.update_team_points(2, 50).await;

        assert!(player.poll_once().await);
        let state = player.snapshot().await;
        assert_eq!(state.teams.len(), 2);
        assert_eq!(state.teams[1].points, 50);
    }

    #[tokio::test]
    async fn test_award_points_once_per_selection() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let host = open(Role::Host, &store, &bus).await;
        host.add_team("Owls").await;

        host.select_question(1).await;
        host.select_answer(1).await;
        host.show_answer().await;
        assert_eq!(host.award_points().await, Dispatch::Applied);
        assert_eq!(host.award_points().await, Dispatch::Unchanged);

        let state = host.snapshot().await;
        let expected = state.question(1).unwrap().points;
        assert_eq!(state.teams[0].points, expected);
    }

    #[tokio::test]
    async fn test_expiry_publishes_reveal() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let host = open(Role::Host, &store, &bus).await;
        let player = open(Role::Player, &store, &bus).await;

        host.select_question(1).await;
        host.reset_timer(Some(1)).await;
        assert_eq!(host.tick().await, TickOutcome::Expired);

        let record = storage::read_sync_record(&store).await.unwrap();
        assert_eq!(record.action, SyncAction::ShowAnswer {});

        // Player missed the selection and reset, so it resyncs, then reveals
        player.poll_once().await;
        let state = player.snapshot().await;
        assert!(state.reveal_answer);
        assert!(state.completed_questions.contains(&1));
    }

    #[tokio::test]
    async fn test_play_sound_reaches_views() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let player = open(Role::Player, &store, &bus).await;
        let mut views = player.subscribe();

        assert!(player.play_sound("timerEnd").await);
        assert!(!player.play_sound("nope").await);

        match views.recv().await.unwrap() {
            ServerMessage::PlaySound { sound_id, url } => {
                assert_eq!(sound_id, "timerEnd");
                assert_eq!(url, "/sounds/timer-end.mp3");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_sound_gets_generated_id() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let admin = open(Role::Admin, &store, &bus).await;

        let outcome = admin
            .add_custom_sound("Drumroll", "data:audio/mpeg;base64,AAAA".to_string())
            .await;
        assert_eq!(outcome, Dispatch::Applied);

        let state = admin.snapshot().await;
        let sound = state.sounds.iter().find(|s| s.name == "Drumroll").unwrap();
        assert!(sound.id.starts_with("custom-"));
        assert!(!sound.builtin);
    }

    #[tokio::test]
    async fn test_admin_password() {
        let store = MemoryStore::new();
        let (bus, _) = channel::channel(16);
        let admin = open(Role::Admin, &store, &bus).await;

        assert!(admin.verify_admin_password("112233"));
        assert!(!admin.verify_admin_password("112234"));
        assert!(!admin.verify_admin_password(""));
    }
}
