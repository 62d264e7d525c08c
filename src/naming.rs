//! The file-naming contract between the rasterizer and the labeler.
//!
//! Page images are named `{page}_{document}.{ext}`, with `page` 1-based.
//! The labeler recovers reading order from the leading number alone, so the
//! rest of the name may contain further underscores (`3_annual_report.png`).
//! Numeric ordering matters: `10_doc.png` sorts after `2_doc.png`.

use crate::error::PageLabelError;
use std::path::{Path, PathBuf};

/// A parsed or to-be-written page image name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImageName {
    /// 1-based page index.
    pub page: usize,
    /// Base name of the source document, without extension.
    pub document: String,
}

impl PageImageName {
    pub fn new(page: usize, document: impl Into<String>) -> Self {
        Self {
            page,
            document: document.into(),
        }
    }

    /// File name with the given extension, e.g. `12_report.png`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}_{}.{}", self.page, self.document, extension)
    }

    /// Parse a path's file stem.
    ///
    /// The page number is whatever precedes the first underscore (the whole
    /// stem when there is none). A stem without an underscore yields an
    /// empty document name.
    pub fn parse(path: &Path) -> Result<Self, PageLabelError> {
        let invalid = || PageLabelError::InvalidPageFileName {
            path: path.to_path_buf(),
        };
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
        let (prefix, document) = stem.split_once('_').unwrap_or((stem, ""));
        let page = prefix.trim().parse::<usize>().map_err(|_| invalid())?;
        Ok(Self::new(page, document))
    }
}

/// Sort paths by the page number in their names.
///
/// Fails on the first name that does not follow the contract. The sort is
/// stable, so equal page numbers (two documents in one directory) keep their
/// listing order.
pub fn sort_by_page(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>, PageLabelError> {
    let mut keyed = paths
        .into_iter()
        .map(|p| PageImageName::parse(&p).map(|n| (n.page, p)))
        .collect::<Result<Vec<_>, _>>()?;
    keyed.sort_by_key(|(page, _)| *page);
    Ok(keyed.into_iter().map(|(_, p)| p).collect())
}

/// Document base name used in page image names: the file stem.
pub fn document_base_name(pdf_path: &Path) -> String {
    pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
