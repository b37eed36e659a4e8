//! mime::detectors
//!
//! Built-in MIME detectors.

use std::collections::BTreeMap;
use std::io::Read;

use super::{DetectError, MimeTypeDetector};

const EXTENSIONS: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("js", "text/javascript"),
    ("rs", "text/x-rust"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("toml", "application/toml"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
];

/// Maps the name's extension to a type. Ignores content.
#[derive(Debug, Clone)]
pub struct ExtensionDetector {
    table: BTreeMap<String, String>,
}

impl ExtensionDetector {
    /// Detector with the built-in extension table.
    pub fn new() -> Self {
        Self {
            table: EXTENSIONS
                .iter()
                .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
                .collect(),
        }
    }

    /// Add or replace a mapping. Extensions match case-insensitively.
    pub fn with(mut self, extension: &str, mime: &str) -> Self {
        self.table
            .insert(extension.trim_start_matches('.').to_lowercase(), mime.to_string());
        self
    }

    fn lookup(&self, name: &str) -> Option<&String> {
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        self.table.get(&ext.to_lowercase())
    }
}

impl Default for ExtensionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeTypeDetector for ExtensionDetector {
    fn detect(&self, name: Option<&str>, _content: &mut dyn Read) -> Result<Option<String>, DetectError> {
        Ok(name.and_then(|n| self.lookup(n)).cloned())
    }
}

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"%PDF-", "application/pdf"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"PK\x03\x04", "application/zip"),
];

/// Recognizes well-known leading signatures. Ignores the name.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicBytesDetector;

impl MimeTypeDetector for MagicBytesDetector {
    fn detect(&self, _name: Option<&str>, content: &mut dyn Read) -> Result<Option<String>, DetectError> {
        let longest = SIGNATURES.iter().map(|(sig, _)| sig.len()).max().unwrap_or(0);
        let mut head = Vec::with_capacity(longest);
        content.take(longest as u64).read_to_end(&mut head)?;
        Ok(SIGNATURES
            .iter()
            .find(|(sig, _)| head.starts_with(sig))
            .map(|(_, mime)| mime.to_string()))
    }
}

/// Always answers with a fixed type. Register it last.
#[derive(Debug, Clone)]
pub struct DefaultTypeDetector {
    mime: String,
}

impl DefaultTypeDetector {
    pub fn new(mime: impl Into<String>) -> Self {
        Self { mime: mime.into() }
    }
}

impl MimeTypeDetector for DefaultTypeDetector {
    fn detect(&self, _name: Option<&str>, _content: &mut dyn Read) -> Result<Option<String>, DetectError> {
        Ok(Some(self.mime.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(detector: &dyn MimeTypeDetector, name: Option<&str>, bytes: &[u8]) -> Option<String> {
        detector.detect(name, &mut Cursor::new(bytes)).unwrap()
    }

    mod extension {
        use super::*;

        #[test]
        fn known_extensions() {
            let d = ExtensionDetector::new();
            assert_eq!(run(&d, Some("a.txt"), b"").as_deref(), Some("text/plain"));
            assert_eq!(run(&d, Some("PHOTO.JPG"), b"").as_deref(), Some("image/jpeg"));
            assert_eq!(run(&d, Some("archive.tar.zip"), b"").as_deref(), Some("application/zip"));
        }

        #[test]
        fn unknown_or_missing() {
            let d = ExtensionDetector::new();
            assert_eq!(run(&d, Some("README"), b""), None);
            assert_eq!(run(&d, Some(".txt"), b""), None);
            assert_eq!(run(&d, Some("a.unknownext"), b""), None);
            assert_eq!(run(&d, None, b"hello"), None);
        }

        #[test]
        fn custom_mapping() {
            let d = ExtensionDetector::new().with(".Cnd", "text/x-cnd");
            assert_eq!(run(&d, Some("types.cnd"), b"").as_deref(), Some("text/x-cnd"));
        }
    }

    mod magic {
        use super::*;

        #[test]
        fn signatures() {
            let d = MagicBytesDetector;
            assert_eq!(run(&d, None, b"%PDF-1.4").as_deref(), Some("application/pdf"));
            assert_eq!(run(&d, None, b"GIF89a...").as_deref(), Some("image/gif"));
            assert_eq!(run(&d, None, b"\xff\xd8\xff\xe0").as_deref(), Some("image/jpeg"));
            assert_eq!(run(&d, None, b"PK\x03\x04rest").as_deref(), Some("application/zip"));
        }

        #[test]
        fn short_or_plain_content() {
            let d = MagicBytesDetector;
            assert_eq!(run(&d, None, b""), None);
            assert_eq!(run(&d, None, b"%PD"), None);
            assert_eq!(run(&d, Some("a.png"), b"plain text"), None);
        }
    }

    #[test]
    fn default_always_answers() {
        let d = DefaultTypeDetector::new("application/octet-stream");
        assert_eq!(run(&d, None, b"").as_deref(), Some("application/octet-stream"));
    }
}
