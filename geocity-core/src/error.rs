use std::path::PathBuf;

use crate::sink::SinkError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which translation sink rejected a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    City,
    Country,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::City => write!(f, "city translations"),
            SinkKind::Country => write!(f, "country translations"),
        }
    }
}

/// Fatal ingestion errors and rejected catalog queries. Malformed lines never
/// end up here, they are skipped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{name} not found (checked {} and {})", archive.display(), plain.display())]
    SourceNotFound {
        name: &'static str,
        archive: PathBuf,
        plain: PathBuf,
    },

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("no {expected} entry found in archive {}", path.display())]
    MissingEntry {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("failed to read {name}: {source}")]
    Read { name: String, source: csv::Error },

    #[error("{kind} sink failed: {source}")]
    Sink { kind: SinkKind, source: SinkError },

    #[error("query must be at least {min} characters")]
    QueryTooShort { min: usize },
}
