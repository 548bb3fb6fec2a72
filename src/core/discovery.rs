use crate::utils::error::{CalibError, Result};
use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};

/// Finds the calibration video `dir/*.<extension>`.
///
/// Matching ignores case, so `MP4` also finds `clip.mp4`. With several
/// candidates the lexicographically first one wins.
pub fn find_calibration_video(dir: &Path, extension: &str) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(CalibError::DatasetNotFound {
            path: dir.to_path_buf(),
        });
    }

    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(extension)
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut candidates: Vec<PathBuf> = glob_with(&pattern, options)?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .collect();
    candidates.sort();

    let Some(video) = candidates.first().cloned() else {
        return Err(CalibError::VideoNotFound {
            path: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    };

    if candidates.len() > 1 {
        tracing::warn!(
            "Found {} {} files in {}, using {}",
            candidates.len(),
            extension,
            dir.display(),
            video.display()
        );
    }

    Ok(video)
}
