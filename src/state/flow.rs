//! Question lifecycle: grid -> selected (timer running) -> answer revealed -> grid.

use super::GameState;
use crate::types::*;

/// Fallback countdown when no question is selected
pub const DEFAULT_TIME_LIMIT: u32 = 30;

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer stopped, already at zero, or the answer is out
    Idle,
    /// One second consumed
    Ticked,
    /// The last second was consumed and the answer got revealed
    Expired,
}

impl GameState {
    pub fn select_question(&mut self, id: QuestionId) -> bool {
        let Some(time_limit) = self.question(id).map(|q| q.time_limit) else {
            tracing::debug!("Ignoring selection of unknown question {}", id);
            return false;
        };

        self.selected_question_id = Some(id);
        self.selected_answer_index = None;
        self.reveal_answer = false;
        self.active_view = ActiveView::Question;
        self.remaining_time = time_limit;
        self.is_timer_running = true;
        self.awarded_question = None;
        true
    }

    /// Record the chosen answer. Timer state is the view's concern.
    pub fn select_answer(&mut self, index: usize) -> bool {
        let Some(question) = self.current_question() else {
            return false;
        };
        if index >= question.answers.len() || self.selected_answer_index == Some(index) {
            return false;
        }
        self.selected_answer_index = Some(index);
        true
    }

    /// Reveal the answer and stop the clock. The live question is marked
    /// completed on its first reveal only. Nothing to reveal on the grid.
    pub fn show_answer(&mut self) -> bool {
        let Some(id) = self.selected_question_id else {
            tracing::debug!("Ignoring reveal with no question selected");
            return false;
        };

        let mut changed = !self.reveal_answer || self.is_timer_running;
        self.reveal_answer = true;
        self.is_timer_running = false;
        changed |= self.mark_question_completed(id);
        changed
    }

    pub fn mark_question_completed(&mut self, id: QuestionId) -> bool {
        if self.question(id).is_none() {
            return false;
        }
        self.completed_questions.insert(id)
    }

    /// Back to the grid and on to the next team. Refused while a selected
    /// question is still unanswered.
    pub fn close_question(&mut self) -> bool {
        if !self.reveal_answer && self.selected_question_id.is_some() {
            tracing::debug!("Refusing to close an unrevealed question");
            return false;
        }

        self.clear_selection();
        self.next_team();
        true
    }

    pub fn start_timer(&mut self) -> bool {
        let changed = !self.is_timer_running;
        self.is_timer_running = true;
        changed
    }

    pub fn stop_timer(&mut self) -> bool {
        let changed = self.is_timer_running;
        self.is_timer_running = false;
        changed
    }

    /// Explicit value, else the live question's limit. A zero from either
    /// source falls back to 30s.
    pub fn reset_timer(&mut self, time: Option<u32>) -> bool {
        let next = time
            .or_else(|| self.current_question().map(|q| q.time_limit))
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_TIME_LIMIT);

        let changed = next != self.remaining_time;
        self.remaining_time = next;
        changed
    }

    /// Consume one second. The tick that takes the clock from 1 to 0 is the
    /// one that reveals the answer.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_timer_running || self.remaining_time == 0 || self.reveal_answer {
            return TickOutcome::Idle;
        }

        self.remaining_time -= 1;
        if self.remaining_time > 0 {
            return TickOutcome::Ticked;
        }
        if self.show_answer() {
            TickOutcome::Expired
        } else {
            // A bare countdown on the grid just stops
            self.is_timer_running = false;
            TickOutcome::Ticked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_state;
    use super::*;

    #[test]
    fn test_select_question_starts_timer() {
        let mut state = sample_state();
        for id in [1, 2] {
            assert!(state.select_question(id));
            let limit = state.question(id).unwrap().time_limit;
            assert_eq!(state.remaining_time, limit);
            assert!(state.is_timer_running);
            assert!(!state.reveal_answer);
            assert_eq!(state.selected_answer_index, None);
            assert_eq!(state.active_view, ActiveView::Question);
        }
    }

    #[test]
    fn test_select_unknown_question_is_noop() {
        let mut state = sample_state();
        let before = state.clone();
        assert!(!state.select_question(42));
        assert_eq!(state, before);
    }

    #[test]
    fn test_select_answer_requires_valid_index() {
        let mut state = sample_state();
        assert!(!state.select_answer(0));

        state.select_question(1);
        assert!(!state.select_answer(4));
        assert!(state.select_answer(2));
        assert_eq!(state.selected_answer_index, Some(2));
        // Recording an answer does not advance the lifecycle
        assert!(!state.reveal_answer);
        assert!(state.is_timer_running);
    }

    #[test]
    fn test_show_answer_marks_completed_once() {
        let mut state = sample_state();
        state.select_question(1);

        assert!(state.show_answer());
        assert!(state.reveal_answer);
        assert!(!state.is_timer_running);
        assert_eq!(state.completed_questions.len(), 1);

        assert!(!state.show_answer());
        assert_eq!(state.completed_questions.iter().filter(|id| **id == 1).count(), 1);
    }

    #[test]
    fn test_close_refused_while_unrevealed() {
        let mut state = sample_state();
        state.select_question(1);
        let before = state.clone();

        assert!(!state.close_question());
        assert_eq!(state, before);
    }

    #[test]
    fn test_close_after_reveal_advances_team() {
        let mut state = sample_state();
        state.select_question(1);
        state.show_answer();

        assert!(state.close_question());
        assert_eq!(state.active_view, ActiveView::Grid);
        assert_eq!(state.selected_question_id, None);
        assert!(!state.reveal_answer);
        assert!(!state.is_timer_running);
        assert_eq!(state.current_team_index, 1);
    }

    #[test]
    fn test_close_with_nothing_selected_still_advances() {
        let mut state = sample_state();
        assert!(state.close_question());
        assert_eq!(state.current_team_index, 1);
    }

    #[test]
    fn test_tick_counts_down() {
        let mut state = sample_state();
        state.select_question(1);
        assert_eq!(state.tick(), TickOutcome::Ticked);
        assert_eq!(state.remaining_time, 19);

        state.stop_timer();
        assert_eq!(state.tick(), TickOutcome::Idle);
        assert_eq!(state.remaining_time, 19);
    }

    #[test]
    fn test_last_second_reveals_answer() {
        let mut state = sample_state();
        state.select_question(1);
        state.remaining_time = 1;

        assert_eq!(state.tick(), TickOutcome::Expired);
        assert_eq!(state.remaining_time, 0);
        assert!(state.reveal_answer);
        assert!(!state.is_timer_running);
        assert!(state.completed_questions.contains(&1));

        assert_eq!(state.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_tick_at_zero_does_not_reveal() {
        let mut state = sample_state();
        state.select_question(1);
        state.remaining_time = 0;

        assert_eq!(state.tick(), TickOutcome::Idle);
        assert!(!state.reveal_answer);
    }

    #[test]
    fn test_reset_timer_fallbacks() {
        let mut state = sample_state();
        state.reset_timer(None);
        assert_eq!(state.remaining_time, DEFAULT_TIME_LIMIT);

        state.select_question(2);
        state.remaining_time = 3;
        state.reset_timer(None);
        assert_eq!(state.remaining_time, 20);

        state.reset_timer(Some(12));
        assert_eq!(state.remaining_time, 12);

        state.reset_timer(Some(0));
        assert_eq!(state.remaining_time, DEFAULT_TIME_LIMIT);
    }

    #[test]
    fn test_show_answer_on_grid_is_noop() {
        let mut state = sample_state();
        assert!(!state.show_answer());
        assert!(!state.reveal_answer);
        assert!(state.completed_questions.is_empty());
    }

    #[test]
    fn test_grid_countdown_stops_without_reveal() {
        let mut state = sample_state();
        state.reset_timer(Some(1));
        state.start_timer();

        assert_eq!(state.tick(), TickOutcome::Ticked);
        assert_eq!(state.remaining_time, 0);
        assert!(!state.is_timer_running);
        assert!(!state.reveal_answer);
    }
}
