// Per-session state and the in-memory store that owns it.
//
// A session is held behind its own async mutex. Actions lease it with
// `try_lock_owned`, so a second action on a busy session fails fast with
// `Conflict` rather than queueing behind the first.

pub mod actions;
pub mod handlers;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::{DocumentFormat, ExtractedText};
use crate::render::CompiledDocument;

/// The parsed résumé a session generates from.
#[derive(Debug, Clone)]
pub struct Resume {
    pub text: ExtractedText,
    pub file_name: String,
    pub format: DocumentFormat,
}

#[derive(Debug, Serialize)]
pub struct ResumeSummary {
    pub file_name: String,
    pub format: DocumentFormat,
    pub characters: usize,
    pub text: String,
}

impl From<&Resume> for ResumeSummary {
    fn from(resume: &Resume) -> Self {
        Self {
            file_name: resume.file_name.clone(),
            format: resume.format,
            characters: resume.text.char_count(),
            text: resume.text.as_str().to_string(),
        }
    }
}

/// One user's working state. Each field is replaced wholesale, never merged.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    pub resume: Option<Resume>,
    pub cv_source: Option<String>,
    pub cover_letter: Option<String>,
    pub cv_pdf: Option<CompiledDocument>,
}

impl Session {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            resume: None,
            cv_source: None,
            cover_letter: None,
            cv_pdf: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            created_at: self.created_at,
            resume: self.resume.as_ref().map(|r| ResumeBrief {
                file_name: r.file_name.clone(),
                format: r.format,
                characters: r.text.char_count(),
            }),
            has_cv_source: self.cv_source.is_some(),
            has_cover_letter: self.cover_letter.is_some(),
            has_cv_pdf: self.cv_pdf.is_some(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeBrief {
    pub file_name: String,
    pub format: DocumentFormat,
    pub characters: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub resume: Option<ResumeBrief>,
    pub has_cv_source: bool,
    pub has_cover_letter: bool,
    pub has_cv_pdf: bool,
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    cancel: CancellationToken,
    last_active: Instant,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        // An entry with an action in flight is never expired
        self.last_active.elapsed() >= ttl && self.session.try_lock().is_ok()
    }
}

/// Exclusive access to one session for the duration of an action.
///
/// Dropping the lease releases the session. Its token is cancelled when the
/// session is deleted while the lease is held.
pub struct SessionLease {
    guard: OwnedMutexGuard<Session>,
    cancel: CancellationToken,
}

impl SessionLease {
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Deref for SessionLease {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.guard
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.guard
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Creates an empty session, pruning idle ones first.
    pub async fn create(&self) -> Uuid {
        let mut sessions = self.sessions.write().await;

        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let expired = entry.is_expired(ttl);
            if expired {
                entry.cancel.cancel();
                debug!(session_id = %id, "pruned idle session");
            }
            !expired
        });
        let pruned = before - sessions.len();

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(Session::new(id))),
                cancel: CancellationToken::new(),
                last_active: Instant::now(),
            },
        );

        info!(session_id = %id, pruned, active = sessions.len(), "session created");
        id
    }

    /// Takes exclusive hold of a session, or fails with `Conflict` if an action
    /// already holds it.
    pub async fn lease(&self, id: Uuid) -> Result<SessionLease, AppError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;

        let guard = entry
            .session
            .clone()
            .try_lock_owned()
            .map_err(|_| AppError::Conflict)?;
        entry.last_active = Instant::now();

        Ok(SessionLease {
            guard,
            cancel: entry.cancel.clone(),
        })
    }

    /// Removes a session and cancels whatever action is running on it.
    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        entry.cancel.cancel();
        info!(session_id = %id, "session deleted");
        Ok(())
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
