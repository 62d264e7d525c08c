//! Image discovery: the ordered list of page images to classify.
//!
//! Directory listing order is arbitrary, so the order is rebuilt from the
//! page number in each file name (see [`crate::naming`]). A name that does
//! not carry one aborts discovery before any request is built.

use crate::config::ImageSource;
use crate::error::PageLabelError;
use crate::naming::sort_by_page;
use crate::output::PageManifest;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resolve an [`ImageSource`] to image paths in page order.
pub fn discover_images(source: &ImageSource) -> Result<Vec<PathBuf>, PageLabelError> {
    let paths = match source {
        ImageSource::Directory { dir, pattern } => {
            let matched = glob_images(dir, pattern)?;
            sort_by_page(matched)?
        }
        ImageSource::Manifest(path) => PageManifest::read(path)?.image_paths(),
    };
    info!("Found {} page images", paths.len());
    Ok(paths)
}

/// Entries of `dir` whose names match `pattern`.
///
/// The directory part is escaped so characters like `[` in it are taken
/// literally; only `pattern` is interpreted.
pub fn glob_images(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, PageLabelError> {
    if !dir.is_dir() {
        return Err(PageLabelError::ImageDirUnreadable {
            path: dir.to_path_buf(),
            reason: "not a directory".into(),
        });
    }

    let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
    let full = Path::new(&escaped_dir).join(pattern);
    let full = full.to_string_lossy();
    debug!("Globbing {}", full);

    let entries = glob::glob(&full).map_err(|e| PageLabelError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    entries
        .map(|entry| {
            entry.map_err(|e| PageLabelError::ImageDirUnreadable {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageImageFormat;
    use crate::output::PageImage;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn directory_listing_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10_doc.png", "2_doc.png", "1_doc.png"] {
            touch(dir.path(), name);
        }
        let source = ImageSource::Directory {
            dir: dir.path().to_path_buf(),
            pattern: "*.*".into(),
        };
        let found = discover_images(&source).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["1_doc.png", "2_doc.png", "10_doc.png"]);
    }

    #[test]
    fn pattern_filters_documents() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1_a.png", "1_b.png", "2_a.png", "notes.txt"] {
            touch(dir.path(), name);
        }
        let source = ImageSource::Directory {
            dir: dir.path().to_path_buf(),
            pattern: "*_a.png".into(),
        };
        let found = discover_images(&source).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("1_a.png"));
        assert!(found[1].ends_with("2_a.png"));
    }

    #[test]
    fn malformed_name_aborts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1_doc.png");
        touch(dir.path(), "readme.md");
        let source = ImageSource::Directory {
            dir: dir.path().to_path_buf(),
            pattern: "*.*".into(),
        };
        let err = discover_images(&source).unwrap_err();
        assert!(matches!(err, PageLabelError::InvalidPageFileName { .. }));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = glob_images(dir.path(), "[*.png").unwrap_err();
        assert!(matches!(err, PageLabelError::InvalidPattern { .. }));
    }

    #[test]
    fn missing_directory_is_reported() {
        let err = glob_images(Path::new("/no/such/dir"), "*.*").unwrap_err();
        assert!(matches!(err, PageLabelError::ImageDirUnreadable { .. }));
    }

    #[test]
    fn manifest_source_skips_name_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("pages.json");
        PageManifest {
            document: "doc".into(),
            dpi: 300,
            image_format: PageImageFormat::Png,
            pages: vec![
                PageImage {
                    page: 2,
                    path: "page-two.png".into(),
                    width: 1,
                    height: 1,
                },
                PageImage {
                    page: 1,
                    path: "cover.png".into(),
                    width: 1,
                    height: 1,
                },
            ],
        }
        .write(&manifest_path)
        .unwrap();

        let found = discover_images(&ImageSource::Manifest(manifest_path)).unwrap();
        assert_eq!(found, vec![PathBuf::from("cover.png"), PathBuf::from("page-two.png")]);
    }
}
