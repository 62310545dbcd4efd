//! Remote HTTP(S) fetch backend over curl.
//!
//! One GET per fetch, redirects followed up to the configured limit. The
//! header callback maps each hop's status line to a `Status` and runs the
//! caller's status callback at the end of that hop's headers; returning
//! `false` from it aborts the transfer from inside curl, which is the
//! cancellation primitive. The body accumulates in memory and is handed to
//! the transfer callback exactly once, partial bytes included on failure.

use crate::config::NetConfig;
use crate::request::{FetchError, Request, Status, StatusFn, TransferFn};
use std::cell::{Cell, RefCell};
use std::str;
use std::time::Duration;

/// Per-hop response state collected from header lines.
#[derive(Default)]
struct Hop {
    code: u32,
    content_type: Option<String>,
    location: Option<String>,
}

pub(super) fn fetch(
    config: &NetConfig,
    request: Request,
    status_cb: Option<StatusFn>,
    transfer_cb: Option<TransferFn>,
) -> Result<(), FetchError> {
    let mut easy = curl::easy::Easy::new();
    if let Err(e) = configure(&mut easy, config, &request.uri) {
        return deliver_failure(request, status_cb, transfer_cb, e);
    }

    let request = RefCell::new(request);
    let status_cb = RefCell::new(status_cb);
    let hop = RefCell::new(Hop::default());
    let body: RefCell<Vec<u8>> = RefCell::new(Vec::new());
    let cancelled = Cell::new(false);
    let status_seen = Cell::new(false);

    let result: Result<(), curl::Error> = (|| {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            let text = match str::from_utf8(line) {
                Ok(t) => t.trim_end(),
                Err(_) => return true,
            };
            if text.starts_with("HTTP/") {
                // New hop: reset hop state, drop any redirect body bytes.
                let code = text
                    .split_whitespace()
                    .nth(1)
                    .and_then(|c| c.parse::<u32>().ok())
                    .unwrap_or(0);
                *hop.borrow_mut() = Hop {
                    code,
                    ..Hop::default()
                };
                body.borrow_mut().clear();
                return true;
            }
            if text.is_empty() {
                // End of this hop's headers.
                let code = hop.borrow().code;
                if code / 100 == 1 {
                    // Informational response, the real one follows.
                    return true;
                }
                {
                    let h = hop.borrow();
                    let mut req = request.borrow_mut();
                    req.status = match h.code {
                        200 => Status::Verified,
                        301 => Status::Moved,
                        _ => Status::NotFound,
                    };
                    req.mime_type = h.content_type.clone();
                    req.location = h.location.clone();
                }
                if let Some(cb) = status_cb.borrow_mut().as_mut() {
                    status_seen.set(true);
                    if !cb(&request.borrow()) {
                        cancelled.set(true);
                        return false;
                    }
                }
                return true;
            }
            if let Some((name, value)) = text.split_once(':') {
                let mut h = hop.borrow_mut();
                let value = value.trim();
                if name.eq_ignore_ascii_case("content-type") {
                    let mime = value.split(';').next().unwrap_or(value).trim();
                    h.content_type = Some(mime.to_string());
                } else if name.eq_ignore_ascii_case("location") {
                    h.location = Some(value.to_string());
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            body.borrow_mut().extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    })();

    let mut request = request.into_inner();
    let mut status_cb = status_cb.into_inner();
    let data = body.into_inner();
    if !data.is_empty() {
        request.data = Some(data);
    }

    match result {
        Ok(()) => {
            if cancelled.get() {
                return Ok(());
            }
            if let Some(cb) = transfer_cb {
                cb(&request);
            }
            let code = easy.response_code().unwrap_or(0);
            if (200..300).contains(&code) {
                Ok(())
            } else {
                Err(FetchError::Http(code))
            }
        }
        Err(_) if cancelled.get() => {
            tracing::debug!(uri = %request.uri, "fetch cancelled by status callback");
            Ok(())
        }
        Err(e) => {
            request.status = Status::Failed;
            let mut proceed = true;
            if !status_seen.get() {
                if let Some(cb) = status_cb.as_mut() {
                    proceed = cb(&request);
                }
            }
            if proceed {
                if let Some(cb) = transfer_cb {
                    // Partial data, if any arrived, is still exposed.
                    cb(&request);
                }
            }
            Err(FetchError::Curl(e))
        }
    }
}

fn configure(
    easy: &mut curl::easy::Easy,
    config: &NetConfig,
    uri: &str,
) -> Result<(), curl::Error> {
    easy.url(uri)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(config.max_redirects)?;
    easy.connect_timeout(Duration::from_secs(config.connect_timeout_secs))?;
    easy.timeout(Duration::from_secs(config.timeout_secs))?;
    Ok(())
}

/// Setup failed before any transfer started: report `Failed` through the
/// normal callback ladder rather than letting the error cross the façade.
fn deliver_failure(
    mut request: Request,
    mut status_cb: Option<StatusFn>,
    transfer_cb: Option<TransferFn>,
    e: curl::Error,
) -> Result<(), FetchError> {
    request.status = Status::Failed;
    let mut proceed = true;
    if let Some(cb) = status_cb.as_mut() {
        proceed = cb(&request);
    }
    if proceed {
        if let Some(cb) = transfer_cb {
            cb(&request);
        }
    }
    Err(FetchError::Curl(e))
}
