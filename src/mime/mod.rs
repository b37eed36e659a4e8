//! mime
//!
//! Pluggable MIME-type detection.
//!
//! # Architecture
//!
//! Detection goes through the [`MimeTypeDetector`] trait. Detectors are
//! collected in a [`MimeTypeDetectors`] registry that consults them in
//! registration order:
//!
//! - a detector returning `Ok(None)` passes to the next one
//! - the first `Ok(Some(_))` wins and later detectors are not consulted
//! - `Err(DetectError)` stops the chain and reaches the caller
//!
//! The registry reads at most [`SNIFF_LEN`] bytes from the content stream,
//! once, and gives every detector its own reader over that prefix. Failing
//! to read the stream is a [`DetectError::Io`], which is distinct from
//! "could not determine" (`Ok(None)`).
//!
//! Built-in detectors live in [`detectors`].
//!
//! # Example
//!
//! ```
//! use repofed::mime::MimeTypeDetectors;
//!
//! let detectors = MimeTypeDetectors::with_defaults(None);
//! let found = detectors.detect_bytes(Some("notes.txt"), b"hello").unwrap();
//! assert_eq!(found.as_deref(), Some("text/plain"));
//!
//! let found = detectors.detect_bytes(None, b"\x89PNG\r\n\x1a\n....").unwrap();
//! assert_eq!(found.as_deref(), Some("image/png"));
//! ```

pub mod detectors;

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::debug;

pub use detectors::{DefaultTypeDetector, ExtensionDetector, MagicBytesDetector};

/// Bytes of content made available to detectors.
pub const SNIFF_LEN: usize = 8 * 1024;

/// Errors from MIME detection.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The content stream could not be read.
    #[error("cannot read content: {0}")]
    Io(#[from] io::Error),

    /// A detector failed for a reason of its own.
    #[error("detector failed: {0}")]
    Detector(String),
}

/// A MIME-type detector.
///
/// `name` is the file or node name when known. `content` yields at most
/// [`SNIFF_LEN`] bytes when called through [`MimeTypeDetectors`].
///
/// Implementations must be thread-safe: one registry serves every
/// connection.
pub trait MimeTypeDetector: Send + Sync + fmt::Debug {
    /// Return `Ok(None)` when the type cannot be determined.
    fn detect(&self, name: Option<&str>, content: &mut dyn Read)
        -> Result<Option<String>, DetectError>;
}

/// Ordered, thread-safe detector chain.
#[derive(Debug, Default)]
pub struct MimeTypeDetectors {
    detectors: RwLock<Vec<Arc<dyn MimeTypeDetector>>>,
}

impl MimeTypeDetectors {
    /// An empty chain. Every detection yields `Ok(None)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extension lookup, then magic bytes, then `default_type` if given.
    pub fn with_defaults(default_type: Option<String>) -> Self {
        let chain = Self::new();
        chain.register(Arc::new(ExtensionDetector::new()));
        chain.register(Arc::new(MagicBytesDetector));
        if let Some(default_type) = default_type {
            chain.register(Arc::new(DefaultTypeDetector::new(default_type)));
        }
        chain
    }

    /// Append a detector to the end of the chain.
    pub fn register(&self, detector: Arc<dyn MimeTypeDetector>) {
        // A poisoned lock still holds a valid Vec.
        let mut detectors = self.detectors.write().unwrap_or_else(|e| e.into_inner());
        debug!(?detector, position = detectors.len(), "registering MIME detector");
        detectors.push(detector);
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn MimeTypeDetector>> {
        self.detectors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Run the chain over `content`.
    ///
    /// # Errors
    ///
    /// `DetectError::Io` when `content` cannot be read, or whatever error a
    /// detector reports.
    pub fn detect(
        &self,
        name: Option<&str>,
        content: &mut dyn Read,
    ) -> Result<Option<String>, DetectError> {
        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        content.take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;
        self.detect_bytes(name, &prefix)
    }

    /// Run the chain over an in-memory buffer.
    pub fn detect_bytes(&self, name: Option<&str>, content: &[u8]) -> Result<Option<String>, DetectError> {
        let prefix = &content[..content.len().min(SNIFF_LEN)];
        for detector in self.snapshot() {
            let mut reader = Cursor::new(prefix);
            if let Some(found) = detector.detect(name, &mut reader)? {
                debug!(?detector, mime = %found, "MIME type detected");
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Run the chain over a local file, using its file name as the hint.
    pub fn detect_file(&self, path: &std::path::Path) -> Result<Option<String>, DetectError> {
        let mut file = File::open(path)?;
        let name = path.file_name().and_then(|n| n.to_str());
        self.detect(name, &mut file)
    }
}
