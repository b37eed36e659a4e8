//! Integration tests for the MIME detector chain.

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use repofed::mime::{
    DefaultTypeDetector, DetectError, ExtensionDetector, MimeTypeDetector, MimeTypeDetectors,
};

#[derive(Debug)]
struct Fixed(Option<&'static str>);

impl MimeTypeDetector for Fixed {
    fn detect(&self, _name: Option<&str>, _content: &mut dyn Read) -> Result<Option<String>, DetectError> {
        Ok(self.0.map(str::to_string))
    }
}

#[derive(Debug, Default)]
struct Counting(AtomicUsize);

impl MimeTypeDetector for Counting {
    fn detect(&self, _name: Option<&str>, _content: &mut dyn Read) -> Result<Option<String>, DetectError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[test]
fn first_determined_type_stops_the_chain() {
    let counter = Arc::new(Counting::default());
    let chain = MimeTypeDetectors::new();
    chain.register(Arc::new(Fixed(None)));
    chain.register(Arc::new(Fixed(Some("text/plain"))));
    chain.register(counter.clone());

    let found = chain.detect(Some("x"), &mut &b"content"[..]).unwrap();
    assert_eq!(found.as_deref(), Some("text/plain"));
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}

#[test]
fn undetermined_is_not_an_error() {
    let chain = MimeTypeDetectors::with_defaults(None);
    let found = chain.detect(Some("README"), &mut &b"plain words"[..]).unwrap();
    assert_eq!(found, None);
}

#[test]
fn configured_default_type_catches_the_rest() {
    let chain = MimeTypeDetectors::with_defaults(Some("application/octet-stream".into()));
    let found = chain.detect(Some("README"), &mut &b"plain words"[..]).unwrap();
    assert_eq!(found.as_deref(), Some("application/octet-stream"));
}

#[test]
fn custom_extensions_take_priority_when_registered_first() {
    let chain = MimeTypeDetectors::new();
    chain.register(Arc::new(ExtensionDetector::new().with("md", "text/x-notes")));
    chain.register(Arc::new(DefaultTypeDetector::new("text/plain")));

    let found = chain.detect(Some("a.md"), &mut &b""[..]).unwrap();
    assert_eq!(found.as_deref(), Some("text/x-notes"));
}

#[test]
fn detect_file_uses_name_and_content() {
    let dir = TempDir::new().unwrap();
    let named = dir.path().join("data.json");
    let unnamed = dir.path().join("image");
    std::fs::write(&named, "{}").unwrap();
    std::fs::write(&unnamed, b"\x89PNG\r\n\x1a\nrest").unwrap();

    let chain = MimeTypeDetectors::with_defaults(None);
    assert_eq!(chain.detect_file(&named).unwrap().as_deref(), Some("application/json"));
    assert_eq!(chain.detect_file(&unnamed).unwrap().as_deref(), Some("image/png"));
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let chain = MimeTypeDetectors::with_defaults(None);

    let err = chain.detect_file(&dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, DetectError::Io(_)));
}

#[test]
fn chain_is_shared_across_threads() {
    let chain = Arc::new(MimeTypeDetectors::with_defaults(None));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let chain = Arc::clone(&chain);
            thread::spawn(move || {
                if i % 2 == 0 {
                    chain.detect(Some("a.pdf"), &mut &b""[..]).unwrap()
                } else {
                    chain.detect(None, &mut &b"GIF89a..."[..]).unwrap()
                }
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = if i % 2 == 0 { "application/pdf" } else { "image/gif" };
        assert_eq!(handle.join().unwrap().as_deref(), Some(expected));
    }
}
