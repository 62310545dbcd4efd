//! Asynchronous URI loading with status/transfer callbacks.
//!
//! `Net::load_uri` classifies the URI by scheme and runs the matching
//! backend on a worker thread, so callbacks are never invoked synchronously
//! from the call itself. Remote fetches go through curl; `file://` URIs are
//! read from disk; anything else resolves to `NotFound`.

mod http;
mod local;

use crate::net::Net;
use crate::request::{FetchError, Request, Status, StatusFn, TransferFn};
use std::thread::JoinHandle;

/// Handle to one fetch's worker thread. Dropping it detaches the fetch;
/// `join` waits for the terminal callback to have run.
pub struct FetchHandle {
    join: Option<JoinHandle<()>>,
}

impl FetchHandle {
    fn inert() -> Self {
        FetchHandle { join: None }
    }

    /// True if a fetch was actually started.
    pub fn is_active(&self) -> bool {
        self.join.is_some()
    }

    /// Wait for the fetch to finish (all callbacks delivered and resources
    /// released). A no-op for inert handles.
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Net {
    /// Requests a transfer of `uri`.
    ///
    /// `status_cb` runs when the status of `uri` is verified and may run
    /// several times (once per redirect hop) unless it cancels by returning
    /// `false`. `transfer_cb` runs at most once, when the data has been
    /// transferred; even a failed transfer may carry data. With neither
    /// callback (or an empty URI) this is a no-op and returns an inert
    /// handle.
    pub fn load_uri(
        &self,
        uri: &str,
        status_cb: Option<StatusFn>,
        transfer_cb: Option<TransferFn>,
    ) -> FetchHandle {
        if uri.is_empty() || (status_cb.is_none() && transfer_cb.is_none()) {
            return FetchHandle::inert();
        }

        let request = Request::new(uri);
        let config = self.config().clone();
        let remote = uri.starts_with("http://") || uri.starts_with("https://");
        let local = uri.starts_with("file://");

        let join = std::thread::spawn(move || {
            let uri = request.uri.clone();
            let outcome = if remote {
                http::fetch(&config, request, status_cb, transfer_cb)
            } else if local {
                local::fetch(request, status_cb, transfer_cb)
            } else {
                unsupported(request, status_cb)
            };
            if let Err(e) = outcome {
                tracing::debug!(uri = %uri, error = %e, "fetch completed with error");
            }
        });
        FetchHandle { join: Some(join) }
    }
}

/// Unsupported scheme: report `NotFound` once, no transfer callback.
fn unsupported(mut request: Request, mut status_cb: Option<StatusFn>) -> Result<(), FetchError> {
    request.status = Status::NotFound;
    if let Some(cb) = status_cb.as_mut() {
        cb(&request);
    }
    Err(FetchError::UnsupportedScheme(request.uri))
}
