use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use stockdaily_api::{AuthResponse, CredentialSource, Identity};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::{Error, Result};

/// The current authenticated session: who we are plus the bearer token
/// proving it. Held as `Option<Session>` in the store, so identity and
/// credential are present together or absent together by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub credential: String,
}

/// Durable form of a session. Identity and the obfuscated credential are
/// written to one file together and removed together.
///
/// The credential is obfuscated with a machine-specific XOR key for basic
/// at-rest hygiene. For stronger guarantees, consider a proper keyring.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    identity: Identity,
    credential: Vec<u8>,
    stored_at: u64,
}

/// Process-wide owner of authentication state.
///
/// Every transition (login, register, logout, restore, transport-forced
/// clear) happens under the write lock and pairs the in-memory session with
/// its durable copy, so no observer ever sees identity without credential or
/// a store that disagrees with disk outside a single transition.
pub struct SessionStore {
    inner: RwLock<Option<Session>>,
    path: PathBuf,
    authed_tx: watch::Sender<bool>,
}

impl SessionStore {
    /// Create a store backed by the given file. The store starts empty;
    /// call [`restore`](Self::restore) to load a persisted session.
    pub fn open(path: PathBuf) -> Self {
        let (authed_tx, _) = watch::channel(false);
        Self {
            inner: RwLock::new(None),
            path,
            authed_tx,
        }
    }

    /// Default session file location under the platform data dir.
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| Error::Config("Could not find data directory".into()))?
            .join("stockdaily");
        Ok(data_dir.join("session.json"))
    }

    /// Load the persisted session, if any. Run once at startup; this is the
    /// only path by which a session survives a process restart.
    pub fn restore(&self) -> Result<bool> {
        if !self.path.exists() {
            debug!("no persisted session at {}", self.path.display());
            return Ok(false);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let stored: StoredSession = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                // An unreadable session file must not brick the process:
                // drop it and start logged out; the next login rewrites it.
                warn!("session file is unreadable ({}), starting logged out", e);
                let _ = std::fs::remove_file(&self.path);
                return Ok(false);
            }
        };

        let session = Session {
            identity: stored.identity,
            credential: deobfuscate(&stored.credential),
        };

        let mut guard = self.inner.write().expect("session lock poisoned");
        *guard = Some(session);
        drop(guard);

        self.authed_tx.send_replace(true);
        debug!("restored session from {}", self.path.display());
        Ok(true)
    }

    /// Exchange credentials for a session. On success the store holds the
    /// server-issued identity and token, both in memory and on disk; on
    /// failure the store is untouched and the error propagates for display.
    pub async fn login(&self, api: &dyn Backend, email: &str, password: &str) -> Result<Identity> {
        let auth = api.login(email, password).await?;
        self.establish(auth)
    }

    /// Create an account. The server issues a credential immediately, so a
    /// successful registration is treated exactly as a login.
    pub async fn register(
        &self,
        api: &dyn Backend,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<Identity> {
        let auth = api.register(email, password, name).await?;
        self.establish(auth)
    }

    /// Clear the session, in memory and on disk. No network call; idempotent.
    pub fn logout(&self) {
        let mut guard = self.inner.write().expect("session lock poisoned");

        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove session file: {}", e);
            }
        }
        *guard = None;
        drop(guard);

        self.authed_tx.send_replace(false);
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.read().expect("session lock poisoned").clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current().map(|s| s.identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().expect("session lock poisoned").is_some()
    }

    /// Watch authentication state changes, e.g. a transport-forced clear
    /// arriving between renders.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authed_tx.subscribe()
    }

    /// Commit a successful auth exchange. The durable copy is written before
    /// memory is touched; a disk failure aborts the whole transition.
    fn establish(&self, auth: AuthResponse) -> Result<Identity> {
        let session = Session {
            identity: auth.user,
            credential: auth.token,
        };

        let mut guard = self.inner.write().expect("session lock poisoned");
        self.persist(&session)?;
        *guard = Some(session.clone());
        drop(guard);

        self.authed_tx.send_replace(true);
        Ok(session.identity)
    }

    fn persist(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stored = StoredSession {
            identity: session.identity.clone(),
            credential: obfuscate(&session.credential),
            stored_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };

        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl CredentialSource for SessionStore {
    fn credential(&self) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|s| s.credential.clone())
    }

    /// Transport-forced clear: the backend rejected the token, so the
    /// session is dead no matter what the client thinks.
    fn invalidate(&self) {
        warn!("session invalidated by transport");
        self.logout();
    }
}

/// XOR obfuscation with a machine-specific key.
/// For basic obfuscation - not cryptographically secure.
fn obfuscate(data: &str) -> Vec<u8> {
    let key = machine_key();
    data.bytes()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

fn deobfuscate(data: &[u8]) -> String {
    let key = machine_key();
    let plain: Vec<u8> = data
        .iter()
        .enumerate()
        .map(|(i, &b)| b ^ key[i % key.len()])
        .collect();
    String::from_utf8_lossy(&plain).to_string()
}

/// Machine-specific key seeded from hostname + username.
fn machine_key() -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hostname = hostname::get()
        .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
        .to_string_lossy()
        .to_string();

    let username = whoami::username();
    let seed = format!("stockdaily-{}-{}", hostname, username);

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    let hash = hasher.finish();

    // Generate 32-byte key from hash
    let mut key = Vec::with_capacity(32);
    let mut val = hash;
    for _ in 0..4 {
        key.extend_from_slice(&val.to_le_bytes());
        val = val.wrapping_mul(1103515245).wrapping_add(12345);
    }
    key
}
