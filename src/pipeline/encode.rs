//! Image encoding: page image file → base64 `ImageData` for the VLM request.
//!
//! Files are sent as they are on disk; no re-encoding happens here. A file
//! that cannot be read does not stop the run: it is logged and yields a
//! request without payload, which later fails as
//! [`crate::error::ClassifyError::MissingImage`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One image awaiting classification.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub path: PathBuf,
    /// `None` when the file could not be read.
    pub image: Option<ImageData>,
    /// Why `image` is `None`.
    pub read_error: Option<String>,
}

/// MIME type inferred from the file extension; PNG when unknown.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// Base64-encode raw image bytes.
pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}

/// Read and encode one file.
pub async fn encode_file(path: &Path) -> ClassificationRequest {
    match tokio::fs::read(path).await {
        Ok(bytes) => ClassificationRequest {
            path: path.to_path_buf(),
            image: Some(encode_bytes(&bytes, mime_type_for(path))),
            read_error: None,
        },
        Err(e) => {
            warn!("Error reading the image file {}: {}", path.display(), e);
            ClassificationRequest {
                path: path.to_path_buf(),
                image: None,
                read_error: Some(e.to_string()),
            }
        }
    }
}

/// Build the requests for one batch, in order.
pub async fn encode_batch(paths: &[PathBuf]) -> Vec<ClassificationRequest> {
    let mut requests = Vec::with_capacity(paths.len());
    for path in paths {
        requests.push(encode_file(path).await);
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_type_for(Path::new("1_doc.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("1_doc.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("1_doc.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("1_doc")), "image/png");
    }

    #[test]
    fn encode_small_payload() {
        let data = encode_bytes(b"\x89PNG\r\n\x1a\n", "image/png");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn unreadable_file_yields_no_payload() {
        let dir = tempfile::tempdir().unwrap();
        let req = encode_file(&dir.path().join("4_missing.png")).await;
        assert!(req.image.is_none());
        assert!(req.read_error.is_some());
    }

    #[tokio::test]
    async fn batch_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("1_doc.png");
        let b = dir.path().join("2_doc.png");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();
        let reqs = encode_batch(&[b.clone(), a.clone()]).await;
        assert_eq!(reqs[0].path, b);
        assert_eq!(reqs[1].path, a);
    }
}
