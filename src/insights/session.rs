//! Session and visitor identifiers.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Inactivity after which a new session starts.
pub const SESSION_TIMEOUT: TimeDelta = TimeDelta::minutes(30);

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a random-looking 128-bit hex identifier.
///
/// Hashes the kind, current time, process id and a process-wide counter,
/// so two calls never collide within a process.
pub fn generate_id(kind: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_bytes());
    hasher.update(&Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    hasher.update(&ID_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    hex::encode(&hasher.finalize().as_bytes()[..16])
}

/// Whether `id` looks like an identifier produced by [`generate_id`].
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[derive(Debug, Clone)]
struct Session {
    id: String,
    last_active: DateTime<Utc>,
}

/// Current session, renewed after [`SESSION_TIMEOUT`] of inactivity.
#[derive(Debug, Default)]
pub struct SessionState {
    current: Option<Session>,
}

impl SessionState {
    /// Id of the session active at `now`, starting a new one if expired.
    pub fn touch(&mut self, now: DateTime<Utc>) -> String {
        match &mut self.current {
            Some(session) if now - session.last_active < SESSION_TIMEOUT => {
                session.last_active = now;
                session.id.clone()
            }
            current => {
                let session = Session {
                    id: generate_id("session"),
                    last_active: now,
                };
                let id = session.id.clone();
                *current = Some(session);
                id
            }
        }
    }
}
