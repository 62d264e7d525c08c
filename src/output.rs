//! Output types: the page manifest produced by the rasterizer and the label
//! table produced by the labeler.

use crate::config::PageImageFormat;
use crate::error::{ClassifyError, PageLabelError};
use crate::label::PageLabel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

// ── Rasterizer output ────────────────────────────────────────────────────

/// One page image written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based page index.
    pub page: usize,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Record of one rasterisation run.
///
/// Returned by [`crate::rasterize::rasterize`] and optionally persisted as
/// JSON so the labeler can read the page list without parsing file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageManifest {
    /// Base name of the source document.
    pub document: String,
    pub dpi: u32,
    pub image_format: PageImageFormat,
    /// Pages in reading order.
    pub pages: Vec<PageImage>,
}

impl PageManifest {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Write the manifest as pretty-printed JSON.
    ///
    /// Page paths under the manifest's directory are stored relative to it,
    /// so the manifest and its images can be moved together and read from
    /// any working directory.
    pub fn write(&self, path: &Path) -> Result<(), PageLabelError> {
        let manifest_err = |reason: String| PageLabelError::Manifest {
            path: path.to_path_buf(),
            reason,
        };
        let parent = manifest_dir(path);
        std::fs::create_dir_all(parent).map_err(|e| manifest_err(e.to_string()))?;
        let base = std::fs::canonicalize(parent).map_err(|e| manifest_err(e.to_string()))?;

        let mut stored = self.clone();
        for page in &mut stored.pages {
            if let Ok(abs) = std::fs::canonicalize(&page.path) {
                page.path = match abs.strip_prefix(&base) {
                    Ok(rel) => rel.to_path_buf(),
                    Err(_) => abs,
                };
            }
        }

        let json =
            serde_json::to_string_pretty(&stored).map_err(|e| manifest_err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| manifest_err(e.to_string()))?;
        debug!("Wrote manifest {}", path.display());
        Ok(())
    }

    /// Read a manifest; relative page paths are resolved against the
    /// manifest's directory.
    pub fn read(path: &Path) -> Result<Self, PageLabelError> {
        let manifest_err = |reason: String| PageLabelError::Manifest {
            path: path.to_path_buf(),
            reason,
        };
        let json = std::fs::read_to_string(path).map_err(|e| manifest_err(e.to_string()))?;
        let mut manifest: Self =
            serde_json::from_str(&json).map_err(|e| manifest_err(e.to_string()))?;
        let parent = manifest_dir(path);
        for page in &mut manifest.pages {
            if page.path.is_relative() {
                page.path = parent.join(&page.path);
            }
        }
        Ok(manifest)
    }

    /// Image paths ordered by page number.
    pub fn image_paths(&self) -> Vec<PathBuf> {
        let mut pages: Vec<&PageImage> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.page);
        pages.into_iter().map(|p| p.path.clone()).collect()
    }
}

fn manifest_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

// ── Labeler output ───────────────────────────────────────────────────────

/// Content of the `label` column for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelCell {
    Label(PageLabel),
    /// Classification failed and failures were tolerated.
    Failed(ClassifyError),
}

impl LabelCell {
    pub fn label(&self) -> Option<PageLabel> {
        match self {
            LabelCell::Label(l) => Some(*l),
            LabelCell::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LabelCell::Failed(_))
    }
}

impl From<Result<PageLabel, ClassifyError>> for LabelCell {
    fn from(r: Result<PageLabel, ClassifyError>) -> Self {
        match r {
            Ok(l) => LabelCell::Label(l),
            Err(e) => LabelCell::Failed(e),
        }
    }
}

impl fmt::Display for LabelCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelCell::Label(l) => write!(f, "{l}"),
            LabelCell::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// One row of the label table.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub local_image_path: PathBuf,
    pub label: LabelCell,
}

/// Serialised form of a row; field names are the CSV header.
#[derive(Serialize)]
struct CsvRow<'a> {
    local_image_path: std::borrow::Cow<'a, str>,
    label: String,
}

/// Ordered `(image path, label)` rows in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
    pub rows: Vec<LabelRow>,
}

impl LabelTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.label.is_failed()).count()
    }

    /// Serialise as CSV with a `local_image_path,label` header.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(writer);
        if self.rows.is_empty() {
            wtr.write_record(["local_image_path", "label"])?;
        }
        for row in &self.rows {
            wtr.serialize(CsvRow {
                local_image_path: row.local_image_path.to_string_lossy(),
                label: row.label.to_string(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the table to `path` atomically (temp file + rename).
    ///
    /// The temp file is removed again if any step after its creation fails.
    pub async fn write_to_file(&self, path: &Path) -> Result<(), PageLabelError> {
        let write_err = |source: std::io::Error| PageLabelError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let mut buf = Vec::new();
        self.write_csv(&mut buf)
            .map_err(|e| write_err(std::io::Error::other(e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        let written = async {
            tokio::fs::write(&tmp_path, &buf).await?;
            tokio::fs::rename(&tmp_path, path).await
        }
        .await;
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }

        debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_string(table: &LabelTable) -> String {
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn csv_has_header_and_no_index_column() {
        let table = LabelTable {
            rows: vec![
                LabelRow {
                    local_image_path: "data/1_doc.png".into(),
                    label: LabelCell::Label(PageLabel::CoverPage),
                },
                LabelRow {
                    local_image_path: "data/2_doc.png".into(),
                    label: LabelCell::Label(PageLabel::TextPage),
                },
            ],
        };
        assert_eq!(
            csv_string(&table),
            "local_image_path,label\ndata/1_doc.png,COVER_PAGE\ndata/2_doc.png,TEXT_PAGE\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        assert_eq!(csv_string(&LabelTable::default()), "local_image_path,label\n");
    }

    #[test]
    fn failed_cell_holds_error_text() {
        let table = LabelTable {
            rows: vec![LabelRow {
                local_image_path: "3_doc.png".into(),
                label: LabelCell::Failed(ClassifyError::LlmFailed {
                    detail: "rate limited, retry later".into(),
                }),
            }],
        };
        let csv = csv_string(&table);
        assert!(
            csv.contains("3_doc.png,\"ERROR: LLM call failed: rate limited, retry later\""),
            "got: {csv}"
        );
        assert_eq!(table.failed_count(), 1);
    }

    #[test]
    fn manifest_orders_paths_by_page() {
        let manifest = PageManifest {
            document: "doc".into(),
            dpi: 300,
            image_format: PageImageFormat::Png,
            pages: vec![
                PageImage {
                    page: 2,
                    path: "out/2_doc.png".into(),
                    width: 10,
                    height: 10,
                },
                PageImage {
                    page: 1,
                    path: "out/1_doc.png".into(),
                    width: 10,
                    height: 10,
                },
            ],
        };
        assert_eq!(
            manifest.image_paths(),
            vec![PathBuf::from("out/1_doc.png"), PathBuf::from("out/2_doc.png")]
        );
    }

    #[test]
    fn manifest_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/manifest.json");
        let manifest = PageManifest {
            document: "doc".into(),
            dpi: 150,
            image_format: PageImageFormat::Jpeg,
            pages: vec![PageImage {
                page: 1,
                path: "1_doc.jpg".into(),
                width: 1275,
                height: 1650,
            }],
        };
        manifest.write(&path).unwrap();

        let back = PageManifest::read(&path).unwrap();
        assert_eq!(back.document, "doc");
        assert_eq!(back.image_format, PageImageFormat::Jpeg);
        // A page path that does not exist is stored as given and read back
        // relative to the manifest.
        assert_eq!(back.pages[0].path, dir.path().join("nested/1_doc.jpg"));
    }

    #[test]
    fn manifest_paths_survive_a_change_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pages_dir = dir.path().join("data/pages");
        std::fs::create_dir_all(&pages_dir).unwrap();
        let image = pages_dir.join("1_doc.png");
        std::fs::write(&image, b"x").unwrap();

        let manifest_path = dir.path().join("data/manifest.json");
        PageManifest {
            document: "doc".into(),
            dpi: 72,
            image_format: PageImageFormat::Png,
            pages: vec![PageImage {
                page: 1,
                path: image.clone(),
                width: 1,
                height: 1,
            }],
        }
        .write(&manifest_path)
        .unwrap();

        let raw = std::fs::read_to_string(&manifest_path).unwrap();
        assert!(raw.contains("\"pages/1_doc.png\""), "got: {raw}");

        // Move the whole tree; the manifest still points at its images.
        let moved = dir.path().join("elsewhere");
        std::fs::rename(dir.path().join("data"), &moved).unwrap();
        let paths = PageManifest::read(&moved.join("manifest.json"))
            .unwrap()
            .image_paths();
        assert_eq!(paths, vec![moved.join("pages/1_doc.png")]);
        assert!(paths[0].is_file());
    }

    #[tokio::test]
    async fn write_to_file_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/labels.csv");
        let table = LabelTable {
            rows: vec![LabelRow {
                local_image_path: "1_doc.png".into(),
                label: LabelCell::Label(PageLabel::BlankPage),
            }],
        };
        table.write_to_file(&path).await.unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv, "local_image_path,label\n1_doc.png,BLANK_PAGE\n");
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory sits where the CSV should go.
        let path = dir.path().join("labels.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let err = LabelTable::default().write_to_file(&path).await.unwrap_err();

        assert!(matches!(err, PageLabelError::OutputWriteFailed { .. }));
        assert!(!path.with_extension("csv.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
