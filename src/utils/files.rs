use std::path::{Path, PathBuf};
use anyhow::Context;
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;
use crate::config::config::UploadConfig;
use crate::errors::PostureError;

/// file_extension returns the lower-cased extension of `file_name`, dot included.
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

pub fn is_valid_video_format(file_name: &str, config: &UploadConfig) -> bool {
    let extension = file_extension(file_name);
    config.allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&extension))
}

/// validate_video_file checks the extension whitelist and the size limit of an upload.
pub fn validate_video_file(file_name: &str, size: u64, config: &UploadConfig) -> Result<(), PostureError> {
    if !is_valid_video_format(file_name, config) {
        let supported = config
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_uppercase())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PostureError::UnsupportedFormat(file_name.to_string(), supported));
    }
    if size > config.max_file_size {
        return Err(PostureError::FileTooLarge { size, limit: config.max_file_size });
    }
    Ok(())
}

/// unique_file_name replaces the stem of `original` with a random identifier.
pub fn unique_file_name(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!("{}{extension}", Uuid::new_v4())
}

/// Files created while serving one request.
///
/// Uploaded videos live in a private temporary directory that disappears with
/// the guard. Thumbnails are written to the shared thumbnail directory and are
/// removed on drop too, unless the request completed and `keep_thumbnails` was called.
#[derive(Debug)]
pub struct RequestArtifacts {
    uploads: TempDir,
    thumbnails: Vec<PathBuf>,
    keep_thumbnails: bool,
}

impl RequestArtifacts {
    pub fn new(upload_root: &Path) -> Result<Self, PostureError> {
        std::fs::create_dir_all(upload_root)
            .with_context(|| format!("cannot create upload directory {}", upload_root.display()))?;
        let uploads = tempfile::Builder::new()
            .prefix("request-")
            .tempdir_in(upload_root)
            .with_context(|| format!("cannot create request directory in {}", upload_root.display()))?;
        Ok(RequestArtifacts {
            uploads,
            thumbnails: Vec::new(),
            keep_thumbnails: false,
        })
    }

    /// upload_path returns where an upload named `original` is stored for this request.
    pub fn upload_path(&self, original: &str) -> PathBuf {
        self.uploads.path().join(unique_file_name(original))
    }

    pub fn upload_dir(&self) -> &Path {
        self.uploads.path()
    }

    pub fn track_thumbnail(&mut self, path: PathBuf) {
        self.thumbnails.push(path);
    }

    pub fn thumbnails(&self) -> &[PathBuf] {
        &self.thumbnails
    }

    /// keep_thumbnails marks the request as successful; its thumbnails outlive the guard.
    pub fn keep_thumbnails(&mut self) {
        self.keep_thumbnails = true;
    }
}

impl Drop for RequestArtifacts {
    fn drop(&mut self) {
        if self.keep_thumbnails {
            return;
        }
        for path in &self.thumbnails {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed thumbnail"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), "cannot remove thumbnail: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::config::UploadConfig;
    use crate::errors::PostureError;
    use crate::utils::files::{file_extension, unique_file_name, validate_video_file, RequestArtifacts};

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("clip.MP4"), ".mp4");
        assert_eq!(file_extension("archive.tar.mkv"), ".mkv");
        assert_eq!(file_extension("noext"), "");
    }

    #[test]
    fn test_validate_video_file() {
        let config = UploadConfig::new();
        assert!(validate_video_file("front.MOV", 1024, &config).is_ok());
        assert!(matches!(
            validate_video_file("front.gif", 1024, &config),
            Err(PostureError::UnsupportedFormat(..))
        ));
        assert!(matches!(
            validate_video_file("front.mp4", config.max_file_size + 1, &config),
            Err(PostureError::FileTooLarge { .. })
        ));
        assert!(validate_video_file("front.mp4", config.max_file_size, &config).is_ok());
    }

    #[test]
    fn test_unique_file_name_keeps_extension() {
        let first = unique_file_name("my video.mp4");
        let second = unique_file_name("my video.mp4");
        assert!(first.ends_with(".mp4"));
        assert_ne!(first, second);
        assert_eq!(first.len(), 36 + 4);
    }

    #[test]
    fn test_artifacts_are_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let thumbnail = root.path().join("thumb.jpg");
        std::fs::write(&thumbnail, b"jpg").unwrap();

        let upload_dir = {
            let mut artifacts = RequestArtifacts::new(&root.path().join("uploads")).unwrap();
            std::fs::write(artifacts.upload_path("a.mp4"), b"video").unwrap();
            artifacts.track_thumbnail(thumbnail.clone());
            artifacts.upload_dir().to_path_buf()
        };

        assert!(!upload_dir.exists());
        assert!(!thumbnail.exists());
    }

    #[test]
    fn test_kept_thumbnails_survive_drop() {
        let root = tempfile::tempdir().unwrap();
        let thumbnail = root.path().join("thumb.jpg");
        std::fs::write(&thumbnail, b"jpg").unwrap();

        let upload_dir = {
            let mut artifacts = RequestArtifacts::new(&root.path().join("uploads")).unwrap();
            artifacts.track_thumbnail(thumbnail.clone());
            artifacts.keep_thumbnails();
            artifacts.upload_dir().to_path_buf()
        };

        assert!(!upload_dir.exists());
        assert!(thumbnail.exists());
    }
}
