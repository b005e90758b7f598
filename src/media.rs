use crate::error::ApiError;

/// File extensions accepted for image uploads.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// File extensions accepted for video uploads.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Video => VIDEO_EXTENSIONS,
        }
    }
}

/// What we know about an uploaded file before any content analysis runs.
#[derive(Debug, Clone)]
pub struct MediaMetadata {
    pub filename: String,
    pub extension: String,
    pub kind: MediaKind,
    pub size_bytes: usize,
}

/// Lowercased final extension of a filename, if it has one.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Checks the upload against the declared media kind and captures its
/// metadata. Extension rules mirror what the verification pipeline can
/// handle downstream.
pub fn validate_upload(
    kind: MediaKind,
    filename: &str,
    size_bytes: usize,
) -> Result<MediaMetadata, ApiError> {
    let extension = file_extension(filename).ok_or_else(|| {
        ApiError::Validation(format!("file '{filename}' has no usable extension"))
    })?;

    if !kind.allowed_extensions().contains(&extension.as_str()) {
        return Err(ApiError::Validation(format!(
            "invalid {} format: {}. supported formats: {}",
            kind.as_str(),
            extension,
            kind.allowed_extensions().join(", ")
        )));
    }

    Ok(MediaMetadata {
        filename: filename.to_string(),
        extension,
        kind,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Foto.JPG").as_deref(), Some("jpg"));
        assert_eq!(file_extension("clip.mp4").as_deref(), Some("mp4"));
    }

    #[test]
    fn extension_takes_the_final_segment() {
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some("gz"));
    }

    #[test]
    fn missing_or_empty_extension_is_none() {
        assert_eq!(file_extension("semextensao"), None);
        assert_eq!(file_extension("pendente."), None);
        assert_eq!(file_extension(".gitignore"), None);
    }

    #[test]
    fn image_upload_with_image_extension_passes() {
        let media = validate_upload(MediaKind::Image, "foto.png", 1024).unwrap();
        assert_eq!(media.extension, "png");
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.size_bytes, 1024);
    }

    #[test]
    fn video_upload_with_video_extension_passes() {
        let media = validate_upload(MediaKind::Video, "entrevista.MOV", 2048).unwrap();
        assert_eq!(media.extension, "mov");
    }

    #[test]
    fn image_upload_with_text_extension_is_rejected() {
        let err = validate_upload(MediaKind::Image, "documento.txt", 10).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("image format"));
        assert!(message.contains("txt"));
    }

    #[test]
    fn video_upload_with_image_extension_is_rejected() {
        let err = validate_upload(MediaKind::Video, "foto.png", 10).unwrap_err();
        assert!(err.to_string().contains("video format"));
    }

    #[test]
    fn no_overlap_between_image_and_video_extensions() {
        for ext in IMAGE_EXTENSIONS {
            assert!(
                !VIDEO_EXTENSIONS.contains(ext),
                "{ext} appears in both image and video extensions"
            );
        }
    }
}
