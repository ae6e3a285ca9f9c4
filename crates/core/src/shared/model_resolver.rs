use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR: &str = "FaceAuth";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file by name, checking local locations before downloading.
///
/// Resolution order:
/// 1. Explicit model directory (`--models-dir`, packaged installs)
/// 2. User cache directory (platform-specific)
/// 3. Download from URL to cache
pub fn resolve(
    name: &str,
    url: &str,
    models_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, models_dir, progress)
}

fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    models_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(dir) = models_dir {
        let local_path = dir.join(name);
        if local_path.exists() {
            return Ok(local_path);
        }
    }

    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    log::info!("Model {name} not cached, downloading from {url}");
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceAuth/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceAuth/models/` or `~/.cache/FaceAuth/models/`
/// - Windows: `%LOCALAPPDATA%/FaceAuth/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let bytes = response.bytes().map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Write to a temp file first, then rename so a crash never leaves a
    // truncated model under the final name.
    let temp_path = dest.with_extension("part");
    let write_err = |e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let chunk_size = 1024 * 1024;
    for chunk in bytes.chunks(chunk_size) {
        file.write_all(chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
