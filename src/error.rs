use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimplifyError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("no geometries found in input")]
    EmptyInput,
}

impl From<geojson::Error> for SimplifyError {
    fn from(err: geojson::Error) -> Self {
        SimplifyError::Geometry(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimplifyError>;
