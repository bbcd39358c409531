use super::GameState;
use crate::protocol::SyncAction;
use crate::types::*;

const DEFAULT_REWARD: &str = "Wins a prize!";
const DEFAULT_PENALTY: &str = "Gets a penalty!";

impl GameState {
    /// Add a signed delta to a team and announce it. Zero deltas and unknown teams are ignored.
    pub fn update_team_points(&mut self, team_id: TeamId, delta: i64) -> bool {
        if delta == 0 {
            return false;
        }
        let Some(team) = self.teams.iter_mut().find(|t| t.id == team_id) else {
            return false;
        };

        team.points = team.points.saturating_add(delta);
        self.announce_points(team_id, delta);
        true
    }

    /// The notification half of a point change
    pub fn announce_points(&mut self, team_id: TeamId, delta: i64) -> bool {
        let Some(name) = self
            .teams
            .iter()
            .find(|t| t.id == team_id)
            .map(|t| t.name.clone())
        else {
            return false;
        };

        if delta > 0 {
            self.show_notification(
                &format!("{} earned {} points!", name, delta),
                NotificationKind::Success,
            )
        } else if delta < 0 {
            self.show_notification(
                &format!("{} lost {} points!", name, delta.unsigned_abs()),
                NotificationKind::Error,
            )
        } else {
            false
        }
    }

    pub fn show_notification(&mut self, message: &str, kind: NotificationKind) -> bool {
        self.notification = Notification {
            visible: true,
            message: message.to_string(),
            kind,
            generation: self.notification.generation + 1,
        };
        true
    }

    pub fn hide_notification(&mut self) -> bool {
        let changed = self.notification.visible;
        self.notification.visible = false;
        changed
    }

    /// Hide only if the visible notification is still the one shown at `generation`
    pub fn hide_notification_if(&mut self, generation: u64) -> bool {
        if self.notification.generation != generation {
            return false;
        }
        self.hide_notification()
    }

    /// Work out what scoring the current team against the selected answer
    /// means, without applying it.
    ///
    /// Custom-reward questions only produce an announcement; regular questions
    /// pay out their points, or cost half of them (rounded down) on a miss.
    /// Returns `None` when there is no live question or no team, or when this
    /// question was already scored.
    pub fn award_action(&self) -> Option<SyncAction> {
        let question = self.current_question()?;
        let team = self.current_team()?;
        if self.awarded_question == Some(question.id) {
            return None;
        }

        let correct = self.selected_answer_index == Some(question.correct_answer_index);

        if question.used_custom_reward {
            let (outcome, kind) = if correct {
                (
                    question.custom_reward.as_deref().unwrap_or(DEFAULT_REWARD),
                    NotificationKind::Success,
                )
            } else {
                (
                    question.custom_penalty.as_deref().unwrap_or(DEFAULT_PENALTY),
                    NotificationKind::Error,
                )
            };
            return Some(SyncAction::ShowNotification {
                message: format!("{} {}", team.name, outcome),
                kind,
            });
        }

        let delta = if correct {
            question.points
        } else {
            -(question.points / 2)
        };
        Some(SyncAction::UpdateTeamPoints {
            team_id: team.id,
            delta,
        })
    }

    /// Remember that the live question has been scored by this tab
    pub(crate) fn mark_awarded(&mut self) {
        self.awarded_question = self.selected_question_id;
    }
}
