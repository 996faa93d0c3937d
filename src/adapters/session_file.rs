//! Persisted session storage.
//!
//! The REST adapter keeps the current session in `~/.tenantdash/session.json`
//! so that a restarted process can answer the current-session query without
//! signing in again.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::SessionFileError;
use crate::session::Session;

/// The session directory name.
const SESSION_DIR: &str = ".tenantdash";

/// The session file name.
const SESSION_FILE: &str = "session.json";

/// A JSON file holding at most one session.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.tenantdash/session.json`, if the home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(SESSION_DIR).join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session.
    ///
    /// A missing, unreadable, or corrupt file loads as no session.
    pub fn load(&self) -> Option<Session> {
        let file = File::open(&self.path).ok()?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring corrupt session file");
                None
            }
        }
    }

    /// Store `session`, creating the parent directory if needed.
    pub fn save(&self, session: &Session) -> Result<(), SessionFileError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut writer = BufWriter::new(options.open(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, session)?;
        writer.flush()?;
        Ok(())
    }

    /// Remove the stored session. A missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
