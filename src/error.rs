use std::{io, path::PathBuf};

pub type Result<T> = std::result::Result<T, ModError>;

#[derive(Debug, thiserror::Error)]
pub enum ModError {
    /// The registry root is missing, not a directory, or not `UE4SS/Mods`.
    #[error("invalid mods folder {}: {reason}", path.display())]
    InvalidModFolder { path: PathBuf, reason: String },

    /// A single mod folder has no scripts or no main entry point.
    #[error("invalid mod {name}: {reason}")]
    InvalidMod { name: String, reason: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("json error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ModError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ModError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_mod(name: &str, reason: impl Into<String>) -> Self {
        ModError::InvalidMod {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_folder(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ModError::InvalidModFolder {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
