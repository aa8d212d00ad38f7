//! Content resolution for config references.
//!
//! A reference is either a local path or an `http(s)://` URL. Both are fetched
//! synchronously with no timeout; a hung remote blocks the run.

use crate::error::{OpchainError, Result};
use std::collections::HashMap;

/// Fetches the raw text behind a config reference.
pub trait ContentResolver {
    fn fetch(&self, reference: &str) -> Result<String>;
}

/// Resolves local paths from the filesystem and URLs over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceResolver;

impl ContentResolver for SourceResolver {
    fn fetch(&self, reference: &str) -> Result<String> {
        if is_url(reference) {
            fetch_url(reference)
        } else {
            fetch_file(reference)
        }
    }
}

/// In-memory resolver keyed by reference. Unknown references fail.
impl ContentResolver for HashMap<String, String> {
    fn fetch(&self, reference: &str) -> Result<String> {
        self.get(reference)
            .cloned()
            .ok_or_else(|| OpchainError::resolve(reference, "no such config"))
    }
}

/// True for `http://` and `https://` references.
pub fn is_url(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn fetch_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| OpchainError::resolve(path, e.to_string()))
}

/// GET a URL. Non-200 responses are warned about but their body is still used;
/// transport failures are fatal.
fn fetch_url(url: &str) -> Result<String> {
    let response = match ureq::get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(e) => return Err(OpchainError::resolve(url, format!("can't fetch url: {}", e))),
    };

    if response.status() != 200 {
        tracing::warn!(
            "did not get an HTTP 200 back from {} (got {})",
            url,
            response.status()
        );
    }

    response
        .into_string()
        .map_err(|e| OpchainError::resolve(url, format!("failed to read response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    /// Serve exactly one HTTP response on a loopback port, returning the base URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).is_ok() {
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    line.clear();
                }
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("http://example.com/base.conf"));
        assert!(is_url("https://example.com/base.conf"));
        assert!(is_url("HTTPS://example.com/base.conf"));
        assert!(!is_url("/etc/opchain/base.conf"));
        assert!(!is_url("configs/http.conf"));
        assert!(!is_url("ftp://example.com/base.conf"));
    }

    #[test]
    fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.conf");
        std::fs::write(&path, "new-op a\n").unwrap();
        let content = SourceResolver.fetch(path.to_str().unwrap()).unwrap();
        assert_eq!(content, "new-op a\n");
    }

    #[test]
    fn test_fetch_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghost.conf");
        let err = SourceResolver.fetch(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, OpchainError::Resolve { .. }));
        assert!(err.to_string().contains("ghost.conf"));
    }

    #[test]
    fn test_fetch_url_ok() {
        let base = serve_once("200 OK", "new-op remote\n");
        let content = SourceResolver.fetch(&format!("{}/site.conf", base)).unwrap();
        assert_eq!(content, "new-op remote\n");
    }

    #[test]
    fn test_fetch_url_non_200_still_returns_body() {
        let base = serve_once("404 Not Found", "# not here\n");
        let content = SourceResolver.fetch(&format!("{}/missing.conf", base)).unwrap();
        assert_eq!(content, "# not here\n");
    }

    #[test]
    fn test_fetch_url_transport_failure() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = SourceResolver
            .fetch(&format!("http://127.0.0.1:{}/x.conf", port))
            .unwrap_err();
        assert!(err.to_string().contains("can't fetch url"));
    }

    #[test]
    fn test_memory_resolver() {
        let mut map = HashMap::new();
        map.insert("a.conf".to_string(), "new-op a\n".to_string());
        assert_eq!(map.fetch("a.conf").unwrap(), "new-op a\n");
        assert!(map.fetch("b.conf").is_err());
    }
}
