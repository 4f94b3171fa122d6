//! Reads user-picked media files into an upload slot.

use pagelink_core::publish::{UploadSlot, UploadedFile};
use pagelink_core::{PagelinkError, Result};
use std::path::Path;

/// Loads `path` and files it as a photo or a video based on its guessed MIME type.
pub async fn load_upload(path: &Path) -> Result<UploadSlot> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PagelinkError::io(format!("Not a file: {}", path.display())))?;

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let bytes = tokio::fs::read(path).await?;
    let file = UploadedFile::new(filename.clone(), mime.essence_str(), bytes);

    match mime.type_().as_str() {
        "image" => Ok(UploadSlot::Photo(file)),
        "video" => Ok(UploadSlot::Video(file)),
        _ => Err(PagelinkError::UnsupportedMedia {
            filename,
            mime_type: mime.essence_str().to_string(),
        }),
    }
}
