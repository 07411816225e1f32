use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Default instructional preamble prepended to every provider request.
/// Operators can override it with a plain-text file via `--preamble-path`.
const DEFAULT_PREAMBLE: &str = "\
You are a customer support agent for a software product. Your goal is to \
provide helpful and friendly assistance to users of the platform.

When a user asks a question, first try to understand their specific need or \
concern, then give a clear and concise answer. If you do not have enough \
information to answer fully, ask for clarification.

Be empathetic and patient, provide step-by-step guidance where appropriate, \
and keep your tone friendly, professional, and helpful at all times.";

#[derive(Debug, Error)]
pub enum PreambleError {
    #[error("preamble file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("preamble file '{path}' is empty")]
    Empty { path: String },
}

/// The system-role message text sent ahead of the visible conversation.
/// Never stored in, or returned to, the client's history.
#[derive(Debug, Clone)]
pub struct SystemPreamble {
    text: String,
    path: Option<PathBuf>,
    last_loaded: Option<SystemTime>,
}

impl Default for SystemPreamble {
    fn default() -> Self {
        Self {
            text: DEFAULT_PREAMBLE.to_string(),
            path: None,
            last_loaded: None,
        }
    }
}

impl SystemPreamble {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PreambleError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Err(PreambleError::Empty { path: path.display().to_string() });
        }
        Ok(Self {
            text: text.trim().to_string(),
            path: Some(path.to_path_buf()),
            last_loaded: Some(SystemTime::now()),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Re-reads the preamble file when its mtime is newer than the last load.
    /// Returns `Ok(Some(_))` with the fresh preamble on change, `Ok(None)`
    /// when the file is unchanged or no file is configured.
    pub fn reload_if_changed(&self) -> Result<Option<SystemPreamble>, PreambleError> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(None),
        };

        let metadata = fs::metadata(path)?;
        if let Ok(modified) = metadata.modified() {
            match self.last_loaded {
                Some(last) if modified <= last => return Ok(None),
                _ => {
                    info!("Preamble file changed, reloading...");
                    return Self::load(path).map(Some);
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("support-relay-{}-{}", std::process::id(), name));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn default_preamble_is_non_empty() {
        let preamble = SystemPreamble::default();
        assert!(!preamble.text().is_empty());
        assert!(preamble.reload_if_changed().unwrap().is_none());
    }

    #[test]
    fn loads_and_trims_file() {
        let path = temp_file("load.txt", "  You are a support agent.\n");
        let preamble = SystemPreamble::load(&path).unwrap();
        assert_eq!(preamble.text(), "You are a support agent.");
        fs::remove_file(path).ok();
    }

    #[test]
    fn empty_file_is_rejected() {
        let path = temp_file("empty.txt", "   \n");
        assert!(matches!(SystemPreamble::load(&path), Err(PreambleError::Empty { .. })));
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("support-relay-does-not-exist.txt");
        assert!(matches!(SystemPreamble::load(&path), Err(PreambleError::Io(_))));
    }
}
