use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};

// Size tiers for reading documents
const BUFFER_CAPACITY: usize = 65536;
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 8192;

/// Where a document's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A file on disk
    Path(PathBuf),
    /// An in-memory buffer, e.g. an upload, with a display name
    Bytes { name: String, data: Vec<u8> },
}

impl DocumentSource {
    /// Name used in logs and errors
    pub fn name(&self) -> String {
        match self {
            DocumentSource::Path(path) => path.display().to_string(),
            DocumentSource::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Turns a document into plain text for matching.
///
/// Failures are reported as [`SearchError::Extraction`] (or an IO variant for
/// unreadable files); an extractor never returns partial text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, source: &DocumentSource) -> SearchResult<String>;
}

/// Extracts text from UTF-8 documents
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor {
    encoding_mode: EncodingMode,
}

impl PlainTextExtractor {
    pub fn new(encoding_mode: EncodingMode) -> Self {
        Self { encoding_mode }
    }

    pub fn encoding_mode(&self) -> EncodingMode {
        self.encoding_mode
    }

    /// Reads a small file in one call
    fn read_small_file(&self, path: &Path) -> SearchResult<String> {
        trace!("Reading small document: {}", path.display());
        let bytes = std::fs::read(path).map_err(|e| SearchError::from_io(path, e))?;
        decode_bytes(&bytes, &path.display().to_string(), self.encoding_mode)
    }

    /// Reads a mid-sized file through a buffer
    fn read_buffered(&self, path: &Path) -> SearchResult<String> {
        trace!("Reading buffered document: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(SearchError::IoError)?;
        decode_bytes(&bytes, &path.display().to_string(), self.encoding_mode)
    }

    /// Decodes a large file straight from a memory map
    fn read_mmap(&self, path: &Path) -> SearchResult<String> {
        trace!("Memory mapping document: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(SearchError::IoError)?;
        decode_bytes(&mmap, &path.display().to_string(), self.encoding_mode)
    }

    fn read_path(&self, path: &Path) -> SearchResult<String> {
        match path.metadata() {
            Ok(metadata) => {
                let size = metadata.len();
                if size < SMALL_FILE_THRESHOLD {
                    self.read_small_file(path)
                } else if size >= LARGE_FILE_THRESHOLD {
                    self.read_mmap(path)
                } else {
                    self.read_buffered(path)
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SearchError::file_not_found(path))
            }
            Err(e) => {
                warn!("Failed to get metadata for {}: {}", path.display(), e);
                self.read_buffered(path)
            }
        }
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, source: &DocumentSource) -> SearchResult<String> {
        match source {
            DocumentSource::Path(path) => self.read_path(path),
            DocumentSource::Bytes { name, data } => decode_bytes(data, name, self.encoding_mode),
        }
    }
}

/// Decodes document bytes according to the encoding mode.
///
/// Content with NUL bytes near the start is treated as an unsupported binary
/// format regardless of mode.
pub fn decode_bytes(bytes: &[u8], name: &str, encoding_mode: EncodingMode) -> SearchResult<String> {
    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Err(SearchError::extraction(
            name,
            "binary content is not a supported text format",
        ));
    }

    match encoding_mode {
        EncodingMode::FailFast => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| SearchError::extraction(name, format!("invalid UTF-8: {}", e))),
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            // If it's Owned, at least one invalid sequence was replaced.
            if let std::borrow::Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced in document: {}", name);
            }
            Ok(cow.into_owned())
        }
    }
}
