//! Durable player identity used for the connect / resume handshake.
//!
//! Only `{player_id, session_token, name}` is ever persisted. Team, ready
//! state and scores are always re-synced from the server.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::PlayerId;

/// The persisted identity triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub player_id: Option<PlayerId>,
    pub session_token: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl SessionIdentity {
    /// Credentials for a resume handshake, if both halves are known.
    pub fn resume_credentials(&self) -> Option<(&str, &str)> {
        match (&self.player_id, &self.session_token) {
            (Some(id), Some(token)) => Some((id.as_str(), token.as_str())),
            _ => None,
        }
    }
}

/// Storage backend that keeps a [`SessionIdentity`] across restarts.
pub trait SessionStore: Send + 'static {
    /// Load the stored identity, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store exists but cannot be read.
    fn load(&self) -> Result<Option<SessionIdentity>>;

    /// Persist the identity, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&self, identity: &SessionIdentity) -> Result<()>;

    /// Remove the stored identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be cleared.
    fn clear(&self) -> Result<()>;
}

/// In-memory store. Clones share the same slot, so a test (or an embedding
/// application) can keep a handle and inspect what the engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<SessionIdentity>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `identity`.
    pub fn with_identity(identity: SessionIdentity) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(identity))),
        }
    }

    /// Current content of the store.
    pub fn snapshot(&self) -> Option<SessionIdentity> {
        match self.slot.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace(&self, value: Option<SessionIdentity>) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionIdentity>> {
        Ok(self.snapshot())
    }

    fn save(&self, identity: &SessionIdentity) -> Result<()> {
        self.replace(Some(identity.clone()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.replace(None);
        Ok(())
    }
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionIdentity>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, identity: &SessionIdentity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(identity)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The live identity plus the store it is mirrored to.
///
/// Every mutation is written through immediately. Store failures are logged
/// and otherwise ignored: losing persistence only costs a resume after the
/// next restart.
pub struct Session {
    identity: SessionIdentity,
    store: Box<dyn SessionStore>,
}

impl Session {
    /// Load the persisted identity from `store`, falling back to a blank
    /// identity named `default_name`.
    pub fn load(store: impl SessionStore, default_name: &str) -> Self {
        let identity = match store.load() {
            Ok(Some(identity)) => {
                debug!(player_id = ?identity.player_id, "loaded persisted session");
                identity
            }
            Ok(None) => SessionIdentity::default(),
            Err(e) => {
                warn!("failed to load persisted session: {e}");
                SessionIdentity::default()
            }
        };
        let mut session = Self {
            identity,
            store: Box::new(store),
        };
        if session.identity.name.is_empty() {
            session.identity.name = default_name.to_owned();
        }
        session
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn player_id(&self) -> Option<&str> {
        self.identity.player_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn set_id(&mut self, player_id: impl Into<PlayerId>) {
        self.identity.player_id = Some(player_id.into());
        self.persist();
    }

    pub fn set_session_token(&mut self, token: impl Into<String>) {
        self.identity.session_token = Some(token.into());
        self.persist();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.identity.name = name.into();
        self.persist();
    }

    /// Replace the whole identity in one write.
    pub fn assign(&mut self, player_id: PlayerId, token: String, name: String) {
        self.identity = SessionIdentity {
            player_id: Some(player_id),
            session_token: Some(token),
            name,
        };
        self.persist();
    }

    /// Forget the id and token; the name is kept for the next fresh connect.
    pub fn clear_session_data(&mut self) {
        self.identity.player_id = None;
        self.identity.session_token = None;
        if let Err(e) = self.store.clear() {
            warn!("failed to clear persisted session: {e}");
        }
        if !self.identity.name.is_empty() {
            self.persist();
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.identity) {
            warn!("failed to persist session: {e}");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("player_id", &self.identity.player_id)
            .field("has_token", &self.identity.session_token.is_some())
            .field("name", &self.identity.name)
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn blank_store_uses_default_name() {
        let session = Session::load(MemorySessionStore::new(), "Player");
        assert_eq!(session.name(), "Player");
        assert!(session.identity().resume_credentials().is_none());
    }

    #[test]
    fn mutations_are_written_through() {
        let store = MemorySessionStore::new();
        let mut session = Session::load(store.clone(), "Player");
        session.set_id("p1");
        session.set_session_token("t1");
        session.set_name("Ada");

        let saved = store.snapshot().unwrap();
        assert_eq!(saved.player_id.as_deref(), Some("p1"));
        assert_eq!(saved.session_token.as_deref(), Some("t1"));
        assert_eq!(saved.name, "Ada");
        assert_eq!(saved.resume_credentials(), Some(("p1", "t1")));
    }

    #[test]
    fn clear_keeps_only_the_name() {
        let store = MemorySessionStore::with_identity(SessionIdentity {
            player_id: Some("p1".into()),
            session_token: Some("t1".into()),
            name: "Ada".into(),
        });
        let mut session = Session::load(store.clone(), "Player");
        session.clear_session_data();

        let saved = store.snapshot().unwrap();
        assert_eq!(saved.player_id, None);
        assert_eq!(saved.session_token, None);
        assert_eq!(saved.name, "Ada");
    }

    #[test]
    fn file_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut session = Session::load(FileSessionStore::new(&path), "Player");
        session.assign("p1".into(), "t1".into(), "Ada".into());
        drop(session);

        let reloaded = Session::load(FileSessionStore::new(&path), "Player");
        assert_eq!(reloaded.identity().resume_credentials(), Some(("p1", "t1")));
        assert_eq!(reloaded.name(), "Ada");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"sessionToken\""));
        assert!(!text.contains("team"));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_falls_back_to_blank_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{oops").unwrap();

        let session = Session::load(FileSessionStore::new(&path), "Player");
        assert_eq!(session.player_id(), None);
        assert_eq!(session.name(), "Player");
    }
}
