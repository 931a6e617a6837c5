// Libraries/dash_loop/src/probe.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigurationError;

/// Counts the physical fragments stored for one representation.
///
/// Only regular files directly inside `dir` are counted. When the template
/// declares an initialization segment, one of those files is that segment and
/// is not a fragment. A representation without fragments cannot be looped.
pub fn count_fragments(
    dir: &Path,
    representation_id: &str,
    has_initialization: bool,
) -> Result<u64, ConfigurationError> {
    let io_err = |source| ConfigurationError::FragmentDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut files: u64 = 0;
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_file() {
            files += 1;
        }
    }

    let fragments = if has_initialization {
        files.saturating_sub(1)
    } else {
        files
    };

    debug!(
        "Representation {}: {} files in {:?}, {} fragments",
        representation_id, files, dir, fragments
    );

    if fragments == 0 {
        return Err(ConfigurationError::NoFragments {
            representation_id: representation_id.to_string(),
            path: dir.to_path_buf(),
        });
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_counts_regular_files_only() {
        let dir = tempdir().unwrap();
        for name in ["1", "2", "3"] {
            fs::write(dir.path().join(name), b"frag").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(count_fragments(dir.path(), "v0", false).unwrap(), 3);
    }

    #[test]
    fn test_initialization_segment_is_excluded() {
        let dir = tempdir().unwrap();
        for name in ["init", "1", "2"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(count_fragments(dir.path(), "v0", true).unwrap(), 2);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let err = count_fragments(dir.path(), "v0", false).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoFragments { .. }));

        // Only an initialization segment: still nothing to loop.
        fs::write(dir.path().join("init"), b"x").unwrap();
        let err = count_fragments(dir.path(), "v0", true).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoFragments { .. }));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let err = count_fragments(&dir.path().join("absent"), "v0", false).unwrap_err();
        assert!(matches!(err, ConfigurationError::FragmentDirectory { .. }));
    }
}
