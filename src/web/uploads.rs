use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Receipt scans and bank slips
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "pdf"];

/// Maximum file size (10 MB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Public URL prefix the uploads directory is served under
pub const UPLOADS_URL_PREFIX: &str = "/uploads/";

/// Save a payment document to the uploads directory.
/// Returns the public URL of the file (e.g., "/uploads/abc123.pdf")
pub async fn save_payment_document(
    uploads_dir: &str,
    filename: &str,
    data: &[u8],
) -> Result<String> {
    if data.is_empty() {
        return Err(AppError::Validation("Payment document is empty".to_string()));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::Validation("File too large (max 10 MB)".to_string()));
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| AppError::Validation("Invalid filename".to_string()))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let uploads_path = PathBuf::from(uploads_dir);
    fs::create_dir_all(&uploads_path).await.map_err(|e| {
        AppError::Internal(format!("Failed to create uploads directory: {}", e))
    })?;

    let new_filename = format!("payment-{}.{}", Uuid::new_v4(), extension);
    let file_path = uploads_path.join(&new_filename);

    let mut file = fs::File::create(&file_path).await.map_err(|e| {
        AppError::Internal(format!("Failed to create file: {}", e))
    })?;

    file.write_all(data).await.map_err(|e| {
        AppError::Internal(format!("Failed to write file: {}", e))
    })?;

    Ok(format!("{}{}", UPLOADS_URL_PREFIX, new_filename))
}

/// Delete a payment document by its public URL. URLs outside the uploads
/// prefix are ignored.
pub async fn delete_payment_document(uploads_dir: &str, url_path: &str) -> Result<()> {
    let Some(name) = url_path.strip_prefix(UPLOADS_URL_PREFIX) else {
        return Ok(());
    };
    // Only a bare file name may address the uploads directory
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Ok(());
    }

    let path = PathBuf::from(uploads_dir).join(name);
    if fs::try_exists(&path).await.unwrap_or(false) {
        fs::remove_file(&path).await.map_err(|e| {
            AppError::Internal(format!("Failed to delete file: {}", e))
        })?;
    }

    Ok(())
}
