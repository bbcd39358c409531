//! WebSocket command dispatch
//!
//! Commands map one-to-one onto the tab's collaborator interface. Changes are
//! not answered directly: the tab pushes a fresh state snapshot to every view.

use crate::protocol::{ClientMessage, ServerMessage, SyncAction};
use crate::session::{Dispatch, Session};
use crate::types::Role;

/// On the admin tab, every command except the login needs a verified connection
macro_rules! check_admin_login {
    ($session:expr, $verified:expr) => {
        if $session.role == Role::Admin && !$verified {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: "Enter the admin password first".to_string(),
            });
        }
    };
}

/// Only a refused origination produces a reply
fn reply(session: &Session, outcome: Dispatch, action: &str) -> Option<ServerMessage> {
    match outcome {
        Dispatch::Forbidden => Some(ServerMessage::Error {
            code: "FORBIDDEN".to_string(),
            msg: format!("The {} view cannot {}", session.role, action),
        }),
        Dispatch::Applied | Dispatch::Unchanged => None,
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &Session,
    admin_verified: &mut bool,
) -> Option<ServerMessage> {
    if let ClientMessage::VerifyAdminPassword { password } = &msg {
        let ok = session.verify_admin_password(password);
        *admin_verified |= ok;
        return Some(ServerMessage::AdminVerified { ok });
    }
    check_admin_login!(session, *admin_verified);

    match msg {
        ClientMessage::VerifyAdminPassword { .. } => None,

        // Question flow
        ClientMessage::SelectQuestion { question_id } => {
            let outcome = session.select_question(question_id).await;
            reply(session, outcome, "select questions")
        }
        ClientMessage::SelectAnswer { answer_index } => {
            let outcome = session.select_answer(answer_index).await;
            reply(session, outcome, "select answers")
        }
        ClientMessage::ShowAnswer => {
            let outcome = session.show_answer().await;
            reply(session, outcome, "reveal answers")
        }
        ClientMessage::CloseQuestion => {
            let outcome = session.close_question().await;
            reply(session, outcome, "close questions")
        }
        ClientMessage::StartTimer => {
            let outcome = session.start_timer().await;
            reply(session, outcome, "control the timer")
        }
        ClientMessage::StopTimer => {
            let outcome = session.stop_timer().await;
            reply(session, outcome, "control the timer")
        }
        ClientMessage::ResetTimer { time } => {
            let outcome = session.reset_timer(time).await;
            reply(session, outcome, "control the timer")
        }

        // Scoring
        ClientMessage::UpdateTeamPoints { team_id, delta } => {
            let outcome = session.update_team_points(team_id, delta).await;
            reply(session, outcome, "change points")
        }
        ClientMessage::AwardPoints => {
            let outcome = session.award_points().await;
            reply(session, outcome, "award points")
        }
        ClientMessage::ShowNotification { message, kind } => {
            let outcome = session.show_notification(&message, kind).await;
            reply(session, outcome, "show notifications")
        }
        ClientMessage::HideNotification => {
            let outcome = session.hide_notification().await;
            reply(session, outcome, "hide notifications")
        }

        // Teams
        ClientMessage::AddTeam { name } => {
            let outcome = session.add_team(&name).await;
            reply(session, outcome, "add teams")
        }
        ClientMessage::RemoveTeam { team_id } => {
            let outcome = session.remove_team(team_id).await;
            reply(session, outcome, "remove teams")
        }
        ClientMessage::SetCurrentTeam { index } => {
            let outcome = session.set_current_team(index).await;
            reply(session, outcome, "change the current team")
        }
        ClientMessage::NextTeam => {
            let outcome = session.next_team().await;
            reply(session, outcome, "change the current team")
        }

        // Questions
        ClientMessage::AddQuestion { question } => {
            let outcome = session.add_question(question).await;
            reply(session, outcome, "add questions")
        }
        ClientMessage::UpdateQuestion { question_id, patch } => {
            let outcome = session.update_question(question_id, patch).await;
            reply(session, outcome, "edit questions")
        }
        ClientMessage::RemoveQuestion { question_id } => {
            let outcome = session.remove_question(question_id).await;
            reply(session, outcome, "remove questions")
        }
        ClientMessage::ResetQuestions => {
            let outcome = session.reset_questions().await;
            reply(session, outcome, "reset questions")
        }
        ClientMessage::ResetGame => {
            let outcome = session.reset_game().await;
            reply(session, outcome, "start a new game")
        }

        // Appearance
        ClientMessage::SetColors { colors } => {
            let outcome = session.dispatch(SyncAction::SetColors { colors }).await;
            reply(session, outcome, "change colors")
        }
        ClientMessage::ResetColors => {
            let outcome = session.dispatch(SyncAction::ResetColors {}).await;
            reply(session, outcome, "change colors")
        }
        ClientMessage::AddSound { name, url } => {
            let outcome = session.add_custom_sound(&name, url).await;
            reply(session, outcome, "add sounds")
        }
        ClientMessage::RemoveSound { sound_id } => {
            let outcome = session.dispatch(SyncAction::RemoveSound { sound_id }).await;
            reply(session, outcome, "remove sounds")
        }
        ClientMessage::PlaySound { sound_id } => {
            session.play_sound(&sound_id).await;
            None
        }
        ClientMessage::SetLogo { logo } => {
            let outcome = session.dispatch(SyncAction::SetLogo { logo }).await;
            reply(session, outcome, "change the logo")
        }
        ClientMessage::SetBackground { background } => {
            let outcome = session.dispatch(SyncAction::SetBackground { background }).await;
            reply(session, outcome, "change the background")
        }
        ClientMessage::SetQuestionWindow { layer } => {
            let outcome = session.dispatch(SyncAction::SetQuestionWindow { layer }).await;
            reply(session, outcome, "change the question window")
        }
        ClientMessage::SetCustomMessageImage { url } => {
            let outcome = session
                .dispatch(SyncAction::SetCustomMessageImage { url })
                .await;
            reply(session, outcome, "change the message image")
        }
        ClientMessage::SetNotificationDisplayTime { millis } => {
            let outcome = session
                .dispatch(SyncAction::SetNotificationDisplayTime { millis })
                .await;
            reply(session, outcome, "change the notification time")
        }
    }
}
