use super::GameState;
use crate::types::*;

impl GameState {
    pub(super) fn allocated_team_id(&self) -> TeamId {
        self.teams.iter().map(|t| t.id).max().map_or(1, |id| id + 1)
    }

    /// Build the record an add-team action should carry, without mutating.
    /// Returns `None` for a blank name.
    pub fn draft_team(&self, name: &str) -> Option<Team> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Team {
            id: self.next_team_id.max(self.allocated_team_id()),
            name: name.to_string(),
            points: 0,
        })
    }

    pub fn add_team(&mut self, team: Team) -> bool {
        if team.name.trim().is_empty() || self.teams.iter().any(|t| t.id == team.id) {
            return false;
        }

        self.next_team_id = self.next_team_id.max(team.id + 1);
        self.teams.push(team);
        true
    }

    pub fn remove_team(&mut self, team_id: TeamId) -> bool {
        let before = self.teams.len();
        self.teams.retain(|t| t.id != team_id);
        if self.teams.len() == before {
            return false;
        }

        if self.current_team_index >= self.teams.len() {
            self.current_team_index = 0;
        }
        true
    }

    pub fn set_current_team(&mut self, index: usize) -> bool {
        if index >= self.teams.len() || index == self.current_team_index {
            return false;
        }
        self.current_team_index = index;
        true
    }

    /// Circular advance; a single team stays current
    pub fn next_team(&mut self) -> bool {
        if self.teams.is_empty() {
            return false;
        }
        let next = (self.current_team_index + 1) % self.teams.len();
        let changed = next != self.current_team_index;
        self.current_team_index = next;
        changed
    }
}
