//! Request record, transfer status, and the callback contract.
//!
//! A fetch notifies its caller through two callbacks: a status callback that
//! may run several times (once per redirect hop) and can cancel the transfer
//! by returning `false`, and a transfer callback that runs at most once with
//! the final (possibly partial) data. The transfer callback is `FnOnce` so
//! the at-most-once contract is enforced by the type.

use thiserror::Error;

/// Lifecycle status of a fetch, as reported to the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// No response observed yet.
    #[default]
    Unknown,
    /// Resource exists (HTTP 200, or an accessible local file).
    Verified,
    /// Resource moved (HTTP 301); `Request::location` carries the target.
    Moved,
    /// Resource missing, unreachable, or the scheme is unsupported.
    NotFound,
    /// Transfer finished and the full contents are attached.
    Done,
    /// Transfer started but could not complete. Partial data may be attached.
    Failed,
}

/// One fetch in flight: the URI, what we know about it so far, and the bytes
/// received. Mutated only by the backend driving the fetch.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub uri: String,
    /// MIME type from `Content-Type`, if the server sent one.
    pub mime_type: Option<String>,
    pub status: Status,
    /// Response body, present once (and if) bytes arrived.
    pub data: Option<Vec<u8>>,
    /// Redirect target from `Location`, present alongside `Status::Moved`.
    pub location: Option<String>,
}

impl Request {
    pub(crate) fn new(uri: &str) -> Self {
        Request {
            uri: uri.to_string(),
            ..Default::default()
        }
    }

    /// Number of body bytes received so far.
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Status callback: runs as the status becomes known, possibly once per
/// redirect hop. Return `false` to cancel the fetch; no transfer callback
/// will run after that.
pub type StatusFn = Box<dyn FnMut(&Request) -> bool + Send + 'static>;

/// Transfer callback: terminal notification, runs at most once per fetch.
/// A failed transfer may still carry partial data.
pub type TransferFn = Box<dyn FnOnce(&Request) + Send + 'static>;

/// Error from a single fetch backend. Delivered to callers as `Status`
/// values through the callbacks; kept typed internally for logging and
/// classification.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// Final response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("image decode failed")]
    Decode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_starts_unknown() {
        let r = Request::new("http://example.com/");
        assert_eq!(r.status, Status::Unknown);
        assert!(r.data.is_none());
        assert!(r.mime_type.is_none());
        assert_eq!(r.len(), 0);
        assert!(r.is_empty());
    }

    #[test]
    fn len_tracks_data() {
        let mut r = Request::new("http://example.com/");
        r.data = Some(vec![1, 2, 3]);
        assert_eq!(r.len(), 3);
        assert!(!r.is_empty());
    }
}
