//! Input resolution: turn the user-supplied PDF path or URL into a local
//! file plus the document base name used in page image names.
//!
//! pdfium opens files by path, so a remote document is streamed into a
//! `TempDir` owned by the returned [`ResolvedPdf`] and removed with it.
//! Both kinds of input are sniffed for the `%PDF` header before pdfium sees
//! them.

use crate::error::PageLabelError;
use crate::naming::document_base_name;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const FALLBACK_FILE_NAME: &str = "downloaded.pdf";

/// Where the document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSource<'a> {
    Local(&'a Path),
    Remote(&'a str),
}

impl<'a> PdfSource<'a> {
    /// Classify a CLI-style input string. Anything that is not an HTTP(S)
    /// URL is treated as a path.
    pub fn parse(input: &'a str) -> Result<Self, PageLabelError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PageLabelError::InvalidInput {
                input: input.to_string(),
            });
        }
        if is_url(trimmed) {
            Ok(PdfSource::Remote(trimmed))
        } else {
            Ok(PdfSource::Local(Path::new(input)))
        }
    }
}

/// A PDF ready to be opened by pdfium.
#[derive(Debug)]
pub struct ResolvedPdf {
    path: PathBuf,
    base_name: String,
    // Keeps a downloaded file alive until rendering is done.
    _download_dir: Option<TempDir>,
}

impl ResolvedPdf {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name used in `{page}_{base_name}.{ext}`.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

pub fn is_url(input: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| input.starts_with(scheme))
}

/// Resolve a local path or HTTP(S) URL to a local PDF.
pub async fn resolve_pdf(input: &str, timeout_secs: u64) -> Result<ResolvedPdf, PageLabelError> {
    match PdfSource::parse(input)? {
        PdfSource::Local(path) => resolve_local(path).await,
        PdfSource::Remote(url) => download(url, timeout_secs).await,
    }
}

/// `Err(magic)` when `head` is long enough to judge and is not a PDF header.
fn sniff_pdf(head: &[u8]) -> Result<(), [u8; 4]> {
    match head.get(..4) {
        Some(first) if first != PDF_MAGIC => {
            let mut magic = [0u8; 4];
            magic.copy_from_slice(first);
            Err(magic)
        }
        _ => Ok(()),
    }
}

async fn resolve_local(path: &Path) -> Result<ResolvedPdf, PageLabelError> {
    let owned = || path.to_path_buf();

    let mut file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PageLabelError::PermissionDenied { path: owned() },
        _ => PageLabelError::FileNotFound { path: owned() },
    })?;

    let mut head = [0u8; 4];
    if file.read_exact(&mut head).await.is_ok() {
        sniff_pdf(&head).map_err(|magic| PageLabelError::NotAPdf {
            path: owned(),
            magic,
        })?;
    }

    debug!("Using local PDF {}", path.display());
    Ok(ResolvedPdf {
        path: owned(),
        base_name: document_base_name(path),
        _download_dir: None,
    })
}

async fn download(url: &str, timeout_secs: u64) -> Result<ResolvedPdf, PageLabelError> {
    info!("Fetching {}", url);
    let failed = |reason: String| PageLabelError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let transport = |e: reqwest::Error| {
        if e.is_timeout() {
            PageLabelError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;
    let response = client.get(url).send().await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("server answered {status}")));
    }

    let dir = TempDir::new().map_err(|e| PageLabelError::Internal(e.to_string()))?;
    let target = dir.path().join(file_name_from_url(url));
    let write_failed =
        |e: std::io::Error| PageLabelError::Internal(format!("writing {}: {e}", target.display()));
    let mut out = tokio::fs::File::create(&target).await.map_err(write_failed)?;

    let mut body = response.bytes_stream();
    let mut head: Vec<u8> = Vec::with_capacity(4);
    let mut received = 0usize;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(transport)?;
        if head.len() < 4 {
            let take = (4 - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
            sniff_pdf(&head).map_err(|magic| PageLabelError::NotAPdf {
                path: target.clone(),
                magic,
            })?;
        }
        out.write_all(&chunk).await.map_err(write_failed)?;
        received += chunk.len();
    }
    out.flush().await.map_err(write_failed)?;

    info!("Saved {} bytes to {}", received, target.display());
    Ok(ResolvedPdf {
        base_name: document_base_name(&target),
        path: target,
        _download_dir: Some(dir),
    })
}

/// The URL's last path segment if it looks like a file name, otherwise
/// `downloaded.pdf`.
fn file_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}
