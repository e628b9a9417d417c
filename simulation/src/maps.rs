//! Map files on disk.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tile_defence_world::map::{Map, MapError};

/// Error raised while reading or writing a map file.
#[derive(Debug, thiserror::Error)]
pub enum MapFileError {
    /// The file could not be read or written.
    #[error("failed to access map file {}", path.display())]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file does not hold a valid map.
    #[error("invalid map file {}", path.display())]
    Malformed {
        /// File that was parsed.
        path: PathBuf,
        /// Parse failure with its location.
        #[source]
        source: MapError,
    },
}

/// Reads and parses the map stored at `path`.
pub fn load_map(path: &Path, tile_size: f64) -> Result<Map, MapFileError> {
    let text = fs::read_to_string(path).map_err(|source| MapFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Map::parse_with_tile_size(&text, tile_size).map_err(|source| MapFileError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `map` to `path` in the text format, creating parent directories.
pub fn save_map(map: &Map, path: &Path) -> Result<(), MapFileError> {
    let io_error = |source: io::Error| MapFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, map.to_text()).map_err(io_error)
}
