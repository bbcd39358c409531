use super::GameState;
use crate::types::*;
use std::collections::HashSet;

const DEFAULT_QUESTIONS_JSON: &str = include_str!("../../data/default_questions.json");

/// The built-in catalogue shipped with the binary
pub fn default_questions() -> Vec<Question> {
    match serde_json::from_str(DEFAULT_QUESTIONS_JSON) {
        Ok(questions) => questions,
        Err(e) => {
            tracing::error!("Built-in question catalogue is unreadable: {}", e);
            Vec::new()
        }
    }
}

/// Ids must be unique and every question structurally valid
pub(crate) fn catalogue_is_valid(questions: &[Question]) -> bool {
    let mut seen = HashSet::new();
    questions.iter().all(|q| q.is_valid() && seen.insert(q.id))
}

impl GameState {
    /// Smallest id above every question currently present
    pub(super) fn allocated_question_id(&self) -> QuestionId {
        self.questions.iter().map(|q| q.id).max().map_or(1, |id| id + 1)
    }

    /// Id the next added question will receive
    pub fn next_question_id(&self) -> QuestionId {
        self.next_question_id.max(self.allocated_question_id())
    }

    pub fn add_question(&mut self, question: Question) -> bool {
        if !question.is_valid() || self.question(question.id).is_some() {
            tracing::debug!("Ignoring question {}: invalid or duplicate id", question.id);
            return false;
        }

        self.next_question_id = self.next_question_id.max(question.id + 1);
        self.questions.push(question);
        true
    }

    /// Edit in place. A patch that would break the answer invariant is ignored.
    pub fn update_question(&mut self, id: QuestionId, patch: &QuestionPatch) -> bool {
        let Some(slot) = self.questions.iter_mut().find(|q| q.id == id) else {
            return false;
        };

        let next = patch.applied_to(slot);
        if !next.is_valid() || next == *slot {
            return false;
        }

        *slot = next;
        true
    }

    pub fn remove_question(&mut self, id: QuestionId) -> bool {
        let before = self.questions.len();
        self.questions.retain(|q| q.id != id);
        if self.questions.len() == before {
            return false;
        }

        self.completed_questions.remove(&id);
        if self.selected_question_id == Some(id) {
            self.clear_selection();
        }
        true
    }

    /// Replace the whole catalogue (bulk import). Progress is reset because
    /// completion marks refer to the old catalogue.
    pub fn set_questions(&mut self, questions: Vec<Question>) -> bool {
        if !catalogue_is_valid(&questions) {
            tracing::warn!("Rejecting question catalogue with invalid or duplicate entries");
            return false;
        }
        if questions == self.questions {
            return false;
        }

        self.questions = questions;
        self.next_question_id = self.next_question_id.max(self.allocated_question_id());
        self.completed_questions.clear();
        self.clear_selection();
        true
    }

    pub fn reset_questions(&mut self) -> bool {
        self.set_questions(default_questions())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{sample_question, sample_state};
    use super::*;

    #[test]
    fn test_default_catalogue_is_valid() {
        let questions = default_questions();
        assert_eq!(questions.len(), 30);
        assert!(catalogue_is_valid(&questions));
        assert_eq!(questions[0].answers[questions[0].correct_answer_index], "Mars");
    }

    #[test]
    fn test_add_question_rejects_invalid_and_duplicates() {
        let mut state = sample_state();

        assert!(!state.add_question(sample_question(1, 100, 0)));

        let mut broken = sample_question(50, 100, 0);
        broken.correct_answer_index = 7;
        assert!(!state.add_question(broken));

        assert!(state.add_question(sample_question(50, 100, 0)));
        assert_eq!(state.questions.len(), 3);
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let mut state = GameState::new();
        state.set_questions(Vec::new());
        state.next_question_id = 1;

        assert_eq!(state.next_question_id(), 1);
        state.add_question(sample_question(state.next_question_id(), 100, 0));
        state.add_question(sample_question(state.next_question_id(), 100, 0));
        assert_eq!(state.next_question_id(), 3);

        state.remove_question(2);
        assert_eq!(state.next_question_id(), 3);
    }

    #[test]
    fn test_update_question_respects_answer_invariant() {
        let mut state = sample_state();

        let bad = QuestionPatch {
            correct_answer_index: Some(9),
            ..Default::default()
        };
        assert!(!state.update_question(1, &bad));
        assert_eq!(state.question(1).unwrap().correct_answer_index, 2);

        let good = QuestionPatch {
            text: Some("Edited".to_string()),
            time_limit: Some(45),
            ..Default::default()
        };
        assert!(state.update_question(1, &good));
        assert_eq!(state.question(1).unwrap().text, "Edited");
        assert_eq!(state.question(1).unwrap().time_limit, 45);

        assert!(!state.update_question(99, &good));
    }

    #[test]
    fn test_remove_selected_question_returns_to_grid() {
        let mut state = sample_state();
        state.select_question(1);
        state.show_answer();

        assert!(state.remove_question(1));
        assert_eq!(state.selected_question_id, None);
        assert_eq!(state.active_view, ActiveView::Grid);
        assert!(!state.completed_questions.contains(&1));
        assert!(!state.remove_question(1));
    }

    #[test]
    fn test_set_questions_replaces_without_merge() {
        let mut state = sample_state();
        state.select_question(1);
        state.show_answer();

        let imported = vec![sample_question(7, 300, 1)];
        assert!(state.set_questions(imported.clone()));
        assert_eq!(state.questions, imported);
        assert!(state.completed_questions.is_empty());
        assert_eq!(state.selected_question_id, None);
        assert!(state.next_question_id() >= 8);
    }

    #[test]
    fn test_set_questions_rejects_duplicate_ids() {
        let mut state = sample_state();
        let dupes = vec![sample_question(4, 100, 0), sample_question(4, 200, 1)];
        assert!(!state.set_questions(dupes));
        assert_eq!(state.questions.len(), 2);
    }
}
