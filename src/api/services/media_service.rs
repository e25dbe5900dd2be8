//! Image uploads and file cleanup around record changes.

use thiserror::Error;
use tracing::debug;

use super::image_service::{normalize_service_image, validate_image_upload};
use crate::storage::{MediaStore, StorageError};

#[derive(Debug, Error)]
pub enum UploadError {
    /// Rejected by validation; the message is shown to the client.
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Validate an image and store it under `dir`.
pub async fn save_image(
    media: &dyn MediaStore,
    dir: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<String, UploadError> {
    let validated = validate_image_upload(file_name, bytes).map_err(UploadError::Invalid)?;
    Ok(media.save(dir, &validated.extension, bytes).await?)
}

/// Validate a catalog image and store it re-encoded as a 1024x1024 JPEG.
/// Images that fail to re-encode are stored unchanged.
pub async fn save_service_image(
    media: &dyn MediaStore,
    file_name: &str,
    bytes: &[u8],
) -> Result<String, UploadError> {
    let validated = validate_image_upload(file_name, bytes).map_err(UploadError::Invalid)?;
    let path = match normalize_service_image(bytes) {
        Some(jpeg) => media.save("services", "jpg", &jpeg).await?,
        None => media.save("services", &validated.extension, bytes).await?,
    };
    Ok(path)
}

/// Delete `old` when it is being replaced by (or cleared in favour of) `new`.
pub async fn replace_file(media: &dyn MediaStore, old: Option<&str>, new: Option<&str>) {
    if let Some(old) = old
        && Some(old) != new
    {
        debug!("Removing replaced media file {}", old);
        media.delete(old).await;
    }
}

/// Delete every file in `paths`, ignoring failures.
pub async fn delete_files<I, S>(media: &dyn MediaStore, paths: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for path in paths {
        media.delete(path.as_ref()).await;
    }
}
