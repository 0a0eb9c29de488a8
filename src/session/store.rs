//! Session Store
//!
//! Allocates one directory per scan under a common root and keeps sessions on
//! disk afterwards so their files can be fetched again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use super::types::{validate_file_name, Session, SessionError};

/// Filesystem-backed session store
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    /// Root directory, one sub-directory per session
    root: PathBuf,

    /// IDs of sessions whose request is still running
    active: Mutex<HashSet<Uuid>>,
}

impl SessionStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        Ok(Self {
            inner: Arc::new(SessionStoreInner {
                root,
                active: Mutex::new(HashSet::new()),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Allocate a fresh session with an empty directory
    pub async fn create(&self) -> Result<Session, SessionError> {
        let id = self.reserve(Uuid::new_v4);
        self.prepare(id).await
    }

    /// Reserve an ID that no running request holds, drawing again on a clash
    fn reserve(&self, mut next_id: impl FnMut() -> Uuid) -> Uuid {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        loop {
            let id = next_id();
            if active.insert(id) {
                return id;
            }
            tracing::warn!(session_id = %id.simple(), "Session ID already active, drawing again");
        }
    }

    /// Create the directory for a reserved ID.
    ///
    /// A leftover directory from an earlier run with the same ID is wiped so
    /// two sessions never share files.
    async fn prepare(&self, id: Uuid) -> Result<Session, SessionError> {
        let lease = Arc::new(Lease {
            id,
            store: self.inner.clone(),
        });
        let dir = self.inner.root.join(id.simple().to_string());

        if tokio::fs::try_exists(&dir).await? {
            tracing::warn!(session_id = %id.simple(), "Session directory exists, recreating");
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir(&dir).await?;

        tracing::debug!(session_id = %id.simple(), dir = %dir.display(), "Session created");

        Ok(Session {
            id,
            dir,
            created_at: Utc::now(),
            _lease: Some(lease),
        })
    }

    /// Persist the uploaded image into the session directory
    pub async fn write(
        &self,
        session: &Session,
        file_name: &str,
        data: &[u8],
    ) -> Result<PathBuf, SessionError> {
        validate_file_name(file_name)?;

        let path = session.dir().join(file_name);
        tokio::fs::write(&path, data).await?;

        tracing::debug!(
            session_id = %session.key(),
            file_name = %file_name,
            size = data.len(),
            "Source image stored"
        );

        Ok(path)
    }

    /// Locate a file of a previous session
    pub async fn resolve(
        &self,
        session_id: &str,
        file_name: &str,
    ) -> Result<PathBuf, SessionError> {
        let id = Uuid::parse_str(session_id)
            .map_err(|_| SessionError::InvalidSessionId(session_id.to_string()))?;
        validate_file_name(file_name)?;

        let path = self
            .inner
            .root
            .join(id.simple().to_string())
            .join(file_name);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(SessionError::NotFound(format!("{}/{}", session_id, file_name))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SessionError::NotFound(format!("{}/{}", session_id, file_name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of sessions whose request is still in flight
    pub fn active_count(&self) -> usize {
        self.inner
            .active
            .lock()
            .map(|active| active.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}

/// Holds a session ID reserved until the last handle to the session drops
#[derive(Debug)]
pub(crate) struct Lease {
    id: Uuid,
    store: Arc<SessionStoreInner>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut active = self
            .store
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.id);
    }
}

impl std::fmt::Debug for SessionStoreInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStoreInner")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
