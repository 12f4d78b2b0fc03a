use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{DocFormat, Document};

pub const PLACEHOLDER_FILE: &str = "readme.txt";
pub const PLACEHOLDER_TEXT: &str = "This is a placeholder document for the RAG system.";

/// Reads `.txt`, `.md`/`.markdown` and `.pdf` files under a directory.
#[derive(Debug, Default, Clone)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self { Self }

    /// Load every supported file under `dir`, recursively, in path order.
    ///
    /// A missing `dir` is created and seeded with a placeholder document so a
    /// fresh install always has something to index. Files that cannot be read
    /// or parsed are skipped with a warning.
    pub fn load_directory(&self, dir: &Path) -> Result<Vec<Document>> {
        if !dir.exists() {
            Self::bootstrap(dir)?;
        }
        let files = Self::list_supported_files(dir);
        let mut docs = Vec::with_capacity(files.len());
        for (path, format) in files {
            match Self::read_document(&path, format) {
                Ok(doc) => {
                    debug!(path = %path.display(), format = format.as_str(), "loaded document");
                    docs.push(doc);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }
        info!(dir = %dir.display(), documents = docs.len(), "loaded documents");
        Ok(docs)
    }

    fn bootstrap(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(PLACEHOLDER_FILE), PLACEHOLDER_TEXT)?;
        info!(dir = %dir.display(), "created docs directory with placeholder document");
        Ok(())
    }

    pub fn read_document(path: &Path, format: DocFormat) -> Result<Document> {
        let text = match format {
            DocFormat::Plain | DocFormat::Markdown => Self::read_text(path)?,
            DocFormat::Pdf => {
                let bytes = fs::read(path)?;
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("PDF extraction failed for {}: {e}", path.display()),
                    ))
                })?
            }
        };
        Ok(Document { path: path.to_path_buf(), text, format })
    }

    fn read_text(path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
        }
    }

    pub fn list_supported_files(root: &Path) -> Vec<(PathBuf, DocFormat)> {
        let mut files: Vec<(PathBuf, DocFormat)> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let format = e.path().extension().and_then(|s| s.to_str()).and_then(DocFormat::from_extension)?;
                Some((e.into_path(), format))
            })
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }
}
