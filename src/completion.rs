//! Marking work as done, from a focus session or straight from a list.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::{
    db::{CompletionWrite, Database, FocusSession, FocusSourceKind},
    log_info, log_warn,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    /// The session had already been logged as complete.
    AlreadyLogged,
}

/// Completes the session's source task and ends the session. Safe to call
/// twice; the second call changes nothing.
pub async fn complete_from_session(
    db: &Database,
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<CompletionOutcome> {
    let mut session = db
        .get_focus_session(session_id)
        .await?
        .with_context(|| format!("Focus session {session_id} not found"))?;

    if session.completed_logged_at.is_some() {
        return Ok(CompletionOutcome::AlreadyLogged);
    }

    session.completed_logged_at = Some(now);
    session.is_active = false;
    session.ended_at = session.ended_at.or(Some(now));

    let outcome = record(db, &session).await?;
    if outcome == CompletionOutcome::Completed {
        log_info!("Completed focus session {}", session.id);
    }
    Ok(outcome)
}

pub async fn complete_inbox_item(db: &Database, item_id: &str, now: DateTime<Utc>) -> Result<()> {
    let item = db
        .get_inbox_item(item_id)
        .await?
        .with_context(|| format!("Inbox item {item_id} not found"))?;

    let session = completed_log(&item.title, &item.start_step, now)
        .with_source(FocusSourceKind::Inbox, item.id.clone());
    record(db, &session).await?;

    log_info!("Completed inbox item {}", item.id);
    Ok(())
}

pub async fn complete_reminder(db: &Database, reminder_id: &str, now: DateTime<Utc>) -> Result<()> {
    let reminder = db
        .get_reminder(reminder_id)
        .await?
        .with_context(|| format!("Reminder {reminder_id} not found"))?;

    let session = completed_log(&reminder.title, &reminder.start_step, now)
        .with_source(FocusSourceKind::Reminder, reminder.id.clone());
    record(db, &session).await?;

    log_info!("Completed reminder {}", reminder.id);
    Ok(())
}

/// A zero-length session that only records the completion.
fn completed_log(title: &str, start_step: &str, now: DateTime<Utc>) -> FocusSession {
    let mut session = FocusSession::new(title, start_step, 0, now);
    session.ended_at = Some(now);
    session.is_active = false;
    session.completed_logged_at = Some(now);
    session
}

async fn record(db: &Database, session: &FocusSession) -> Result<CompletionOutcome> {
    match db.record_completion(session).await? {
        CompletionWrite::AlreadyLogged => Ok(CompletionOutcome::AlreadyLogged),
        CompletionWrite::Recorded { source_found } => {
            if !source_found {
                log_warn!(
                    "Source of session {} was already gone ({:?} {:?})",
                    session.id,
                    session.source_kind,
                    session.source_id
                );
            }
            Ok(CompletionOutcome::Completed)
        }
    }
}
