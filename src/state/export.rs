//! Persisted snapshot and question file import/export.
//!
//! The persisted snapshot is what a tab restores on load; the question file
//! is a bare JSON array of questions meant to be edited by hand.

use super::appearance::builtin_sounds;
use super::questions::{catalogue_is_valid, default_questions};
use crate::error::ImportError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Schema version for the persisted snapshot
pub const PERSIST_SCHEMA_VERSION: u32 = 1;

/// The part of the game state that survives a reload.
///
/// Transient fields (selection, timer, view, notification) are deliberately
/// absent and start from their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub schema_version: u32,
    pub questions: Vec<Question>,
    pub teams: Vec<Team>,
    pub completed_questions: BTreeSet<QuestionId>,
    pub next_question_id: QuestionId,
    pub next_team_id: TeamId,
    pub sounds: Vec<Sound>,
    pub appearance: Appearance,
}

impl Default for PersistedState {
    fn default() -> Self {
        let questions = default_questions();
        let next_question_id = questions.iter().map(|q| q.id).max().map_or(1, |id| id + 1);
        Self {
            schema_version: PERSIST_SCHEMA_VERSION,
            questions,
            teams: Vec::new(),
            completed_questions: BTreeSet::new(),
            next_question_id,
            next_team_id: 1,
            sounds: builtin_sounds(),
            appearance: Appearance::default(),
        }
    }
}

impl PersistedState {
    /// Validate a snapshot before restoring it
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > PERSIST_SCHEMA_VERSION {
            return Err(format!(
                "Snapshot schema version {} is newer than supported version {}",
                self.schema_version, PERSIST_SCHEMA_VERSION
            ));
        }

        if !catalogue_is_valid(&self.questions) {
            return Err("Snapshot contains invalid or duplicate questions".to_string());
        }

        let mut team_ids = HashSet::new();
        if let Some(team) = self.teams.iter().find(|t| !team_ids.insert(t.id)) {
            return Err(format!("Snapshot contains duplicate team id {}", team.id));
        }

        Ok(())
    }

    /// Built-in sounds that an older snapshot may lack are added back
    pub fn with_builtin_sounds(mut self) -> Self {
        for builtin in builtin_sounds() {
            if !self.sounds.iter().any(|s| s.id == builtin.id) {
                self.sounds.push(builtin);
            }
        }
        self
    }
}

/// Serialize the catalogue as a pretty-printed JSON array
pub fn export_questions(questions: &[Question]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(questions)
}

/// Parse and validate a question file. The result replaces the catalogue as a whole.
pub fn import_questions(content: &str) -> Result<Vec<Question>, ImportError> {
    let questions: Vec<Question> = serde_json::from_str(content)?;

    let mut ids = HashSet::new();
    for question in &questions {
        if !ids.insert(question.id) {
            return Err(ImportError::Invalid(format!(
                "duplicate question id {}",
                question.id
            )));
        }
        if question.answers.len() != ANSWER_COUNT {
            return Err(ImportError::Invalid(format!(
                "question {} has {} answers, expected {}",
                question.id,
                question.answers.len(),
                ANSWER_COUNT
            )));
        }
        if question.correct_answer_index >= question.answers.len() {
            return Err(ImportError::Invalid(format!(
                "question {} marks answer {} as correct but only has {}",
                question.id,
                question.correct_answer_index,
                question.answers.len()
            )));
        }
    }

    Ok(questions)
}
