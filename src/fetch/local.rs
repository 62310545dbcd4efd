//! Local `file://` fetch backend.
//!
//! Status-only probes stop after the status callback; otherwise the file is
//! read whole on the worker thread. A read failure still fires the transfer
//! callback, with `Failed` and no data.

use crate::request::{FetchError, Request, Status, StatusFn, TransferFn};
use std::fs;
use std::path::PathBuf;
use url::Url;

pub(super) fn fetch(
    mut request: Request,
    mut status_cb: Option<StatusFn>,
    transfer_cb: Option<TransferFn>,
) -> Result<(), FetchError> {
    let path = file_path(&request.uri);
    let path = match path {
        Some(p) if p.exists() => p,
        _ => {
            request.status = Status::NotFound;
            if let Some(cb) = status_cb.as_mut() {
                cb(&request);
            }
            return Ok(());
        }
    };

    request.status = Status::Verified;
    if let Some(cb) = status_cb.as_mut() {
        if !cb(&request) {
            // Cancelled; stop silently.
            return Ok(());
        }
    }

    let transfer_cb = match transfer_cb {
        Some(cb) => cb,
        // Status-only call.
        None => return Ok(()),
    };

    match fs::read(&path) {
        Ok(contents) => {
            request.status = Status::Done;
            request.data = Some(contents);
            transfer_cb(&request);
            Ok(())
        }
        Err(e) => {
            request.status = Status::Failed;
            transfer_cb(&request);
            Err(FetchError::Io(e))
        }
    }
}

fn file_path(uri: &str) -> Option<PathBuf> {
    Url::parse(uri).ok()?.to_file_path().ok()
}
