use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;

use crate::error::{Result, SimplifyError};

// Read the whole file and parse it as generic JSON. GeoJSON interpretation
// happens later in the extractor.
pub fn load_document(path: &Path) -> Result<Value> {
    println!("Reading GeoJSON file: {}", path.display());
    let file = File::open(path).map_err(|source| SimplifyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| {
        if source.is_io() {
            SimplifyError::Io {
                path: path.to_path_buf(),
                source: source.into(),
            }
        } else {
            SimplifyError::Parse {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
