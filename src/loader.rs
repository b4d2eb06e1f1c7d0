//! # File loading and text extraction
//!
//! Turns paths given by the user into [`LoadedFile`] records: the file's
//! display name plus either its extracted text or the [`ExtractionError`]
//! explaining why it is unreadable.
//!
//! Extraction runs exactly once, at load time. The result lives on the
//! `LoadedFile` for the rest of the session, so switching query modes never
//! re-reads or re-parses anything. When the user changes the file set the
//! whole list is rebuilt with [`load_files`]; there is no incremental
//! update.
//!
//! ## Supported formats
//!
//! | Extension | Extractor |
//! |-----------|-----------|
//! | `txt`, `md`, `markdown`, `text`, `log` | UTF-8 read |
//! | `pdf` | `pdf-extract`, with `lopdf` probing for encryption first |
//!
//! Anything else is recorded as [`ExtractionError::UnsupportedFormat`].
//! A parse that succeeds but yields only whitespace becomes
//! [`ExtractionError::Empty`]; scanned/image-only PDFs land here.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ExtractionError;

/// One file in the current session's working set.
///
/// Exactly one of the two `text` outcomes holds: the extracted text, or the
/// error that made the file unreadable. Unreadable files stay in the list
/// so the dispatcher can report them alongside every reply.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Display name, unique within one loaded set. Usually the file name;
    /// falls back to the full path when two files share a name.
    pub name: String,

    /// Extracted text, or the reason extraction failed.
    pub text: Result<String, ExtractionError>,
}

impl LoadedFile {
    /// The extracted text, if this file is readable.
    pub fn readable_text(&self) -> Option<&str> {
        self.text.as_deref().ok()
    }

    /// The extraction error, if this file is unreadable.
    pub fn extraction_error(&self) -> Option<&ExtractionError> {
        self.text.as_ref().err()
    }

    /// Build a `LoadedFile` directly from parts. Mostly useful in tests.
    pub fn new(name: impl Into<String>, text: Result<String, ExtractionError>) -> Self {
        Self {
            name: name.into(),
            text,
        }
    }
}

/// Load a set of paths wholesale, replacing any previous set.
///
/// Files are kept in the order given. Extraction failures do not abort the
/// load; the failing file is recorded with its error and the rest proceed.
///
/// Names are the final path component; if two paths collide on it, those
/// entries use the full path as their name so every entry stays unique.
pub fn load_files(paths: &[PathBuf]) -> Vec<LoadedFile> {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for path in paths {
        *name_counts.entry(display_name(path)).or_insert(0) += 1;
    }

    paths
        .iter()
        .map(|path| {
            let short = display_name(path);
            let name = if name_counts[&short] > 1 {
                path.display().to_string()
            } else {
                short
            };

            let text = extract_text(path);
            match &text {
                Ok(content) => debug!(
                    "loaded {} ({} chars)",
                    name,
                    content.len()
                ),
                Err(err) => warn!("could not read {}: {}", name, err),
            }

            LoadedFile { name, text }
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract the text of a single file, dispatching on its extension.
///
/// # Errors
/// Returns the [`ExtractionError`] kind matching what went wrong:
/// `Io` for read failures, `UnsupportedFormat` for unknown extensions,
/// `Encrypted`/`Corrupt` for broken PDFs, and `Empty` when parsing
/// produced no usable text.
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "md" | "markdown" | "text" | "log" => extract_plain(path),
        "pdf" => extract_pdf(path),
        other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
    }
}

fn extract_plain(path: &Path) -> Result<String, ExtractionError> {
    let bytes = fs::read(path).map_err(|e| ExtractionError::Io(e.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| ExtractionError::Corrupt("not valid UTF-8 text".to_string()))?;

    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text)
}

fn extract_pdf(path: &Path) -> Result<String, ExtractionError> {
    let bytes = fs::read(path).map_err(|e| ExtractionError::Io(e.to_string()))?;

    // Probe the document structure before handing it to the text
    // extractor: lopdf distinguishes "encrypted" from "broken".
    let document =
        lopdf::Document::load_mem(&bytes).map_err(|e| ExtractionError::Corrupt(e.to_string()))?;
    if document.is_encrypted() {
        return Err(ExtractionError::Encrypted);
    }

    let raw = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| ExtractionError::Corrupt(e.to_string()))?;

    // pdf-extract leaves stray blank lines and null bytes behind.
    let text = raw
        .replace('\0', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn plain_text_file_is_extracted() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.txt", b"Paris is the capital of France");

        let text = extract_text(&path).unwrap();
        assert_eq!(text, "Paris is the capital of France");
    }

    #[test]
    fn empty_text_file_is_reported_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "blank.txt", b"  \n\t\n");

        assert_eq!(extract_text(&path), Err(ExtractionError::Empty));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "sheet.xlsx", b"whatever");

        assert_eq!(
            extract_text(&path),
            Err(ExtractionError::UnsupportedFormat("xlsx".to_string()))
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = extract_text(Path::new("/no/such/file.txt")).unwrap_err();
        assert!(matches!(err, ExtractionError::Io(_)));
    }

    #[test]
    fn invalid_utf8_text_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "garbage.txt", &[0xff, 0xfe, 0x00, 0x80]);

        assert!(matches!(
            extract_text(&path).unwrap_err(),
            ExtractionError::Corrupt(_)
        ));
    }

    #[test]
    fn garbage_pdf_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "broken.pdf", b"not a pdf at all");

        assert!(matches!(
            extract_text(&path).unwrap_err(),
            ExtractionError::Corrupt(_)
        ));
    }

    #[test]
    fn load_files_keeps_order_and_records_failures() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"alpha");
        let missing = dir.path().join("gone.txt");
        let b = write_file(&dir, "b.txt", b"beta");

        let files = load_files(&[a, missing, b]);

        assert_eq!(files.len(), 3);
        assert_eq!(files[0].name, "a.txt");
        assert_eq!(files[0].readable_text(), Some("alpha"));
        assert!(matches!(
            files[1].extraction_error(),
            Some(ExtractionError::Io(_))
        ));
        assert_eq!(files[2].readable_text(), Some("beta"));
    }

    #[test]
    fn load_files_disambiguates_duplicate_names() {
        let dir = TempDir::new().unwrap();
        let sub_a = dir.path().join("one");
        let sub_b = dir.path().join("two");
        fs::create_dir_all(&sub_a).unwrap();
        fs::create_dir_all(&sub_b).unwrap();

        let a = sub_a.join("notes.txt");
        let b = sub_b.join("notes.txt");
        fs::write(&a, "from one").unwrap();
        fs::write(&b, "from two").unwrap();

        let files = load_files(&[a.clone(), b.clone()]);

        assert_ne!(files[0].name, files[1].name);
        assert_eq!(files[0].name, a.display().to_string());
        assert_eq!(files[1].name, b.display().to_string());
    }
}
