use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Deserialize;

use crate::token::store::{CredentialStore, TokenPair, holds_refresh};

/// Token storage owned by a user-agent session.
///
/// The pair lives in memory and, when the store was opened on a path, in a
/// JSON document keyed `accessToken` / `refreshToken` so that it survives
/// restarts. The file is replaced with a rename, never rewritten in place.
///
/// Writers take the `io` lock for the whole update and only hold the pair's
/// write lock for the in-memory swap, so readers never wait on the disk.
#[derive(Clone, Debug)]
pub struct ClientStore {
    path: Option<Arc<PathBuf>>,
    pair: Arc<RwLock<Option<TokenPair>>>,
    io: Arc<Mutex<()>>,
}

#[derive(Deserialize)]
struct Persisted {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

impl ClientStore {
    /// Opens the store backed by `path`, loading any pair persisted there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let pair = load(&path);

        Self {
            path: Some(Arc::new(path)),
            pair: Arc::new(RwLock::new(pair)),
            io: Arc::new(Mutex::new(())),
        }
    }

    /// A store that forgets its pair when dropped.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            pair: Arc::new(RwLock::new(None)),
            io: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    fn persist(&self, pair: Option<&TokenPair>) {
        if let Some(path) = self.path() {
            if let Err(e) = save(path, pair) {
                tracing::error!("Error persisting session to {:?}, {:?}", path, e);
            }
        }
    }

    fn io(&self) -> MutexGuard<'_, ()> {
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn swap(&self, pair: Option<TokenPair>) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = pair;
    }
}

impl CredentialStore for ClientStore {
    fn read(&self) -> Option<TokenPair> {
        self.pair
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, pair: TokenPair) {
        let _io = self.io();
        self.swap(Some(pair.clone()));
        self.persist(Some(&pair));
    }

    fn clear(&self) {
        let _io = self.io();
        self.swap(None);
        self.persist(None);
    }

    fn replace_if(&self, expected_refresh: &str, pair: TokenPair) -> bool {
        let _io = self.io();

        {
            let mut current = self.pair.write().unwrap_or_else(PoisonError::into_inner);
            if !holds_refresh(current.as_ref(), expected_refresh) {
                return false;
            }
            *current = Some(pair.clone());
        }

        self.persist(Some(&pair));
        true
    }
}

fn load(path: &Path) -> Option<TokenPair> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Error reading session from {:?}, {:?}", path, e);
            return None;
        }
    };

    match serde_json::from_str::<Persisted>(&content) {
        Ok(Persisted {
            access_token: Some(access),
            refresh_token: Some(refresh),
        }) => Some(TokenPair::new(access, refresh)),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Ignoring malformed session file {:?}, {:?}", path, e);
            None
        }
    }
}

fn save(path: &Path, pair: Option<&TokenPair>) -> io::Result<()> {
    let Some(pair) = pair else {
        return match fs::remove_file(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        };
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut file, pair)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
