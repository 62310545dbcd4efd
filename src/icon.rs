//! Favicon loading on top of `load_uri`.
//!
//! Resolution order: learned redirect target, memory cache, on-disk cache,
//! then a background fetch with the caller's completion callback. The caller
//! always gets an immediate result (a cached icon, a theme-rendered generic
//! glyph, or nothing) and, when a fetch was started, exactly one later
//! completion with the real outcome.

use crate::config::NetConfig;
use crate::memory_cache::CacheLookup;
use crate::net::Net;
use crate::request::{FetchError, Status, StatusFn, TransferFn};
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use url::Url;

/// Completion callback for an icon load. Runs at most once; `None` means no
/// usable icon could be produced.
pub type IconFn = Box<dyn FnOnce(Option<DynamicImage>) + Send + 'static>;

/// UI seam: supplies the platform's small-icon size and a generic fallback
/// glyph. Implemented by the embedding toolkit layer; the façade itself has
/// no toolkit types.
pub trait IconTheme: Send + Sync {
    /// Designated small-icon size in pixels (width, height).
    fn icon_size(&self) -> (u32, u32);
    /// Generic file icon rendered at the given size.
    fn render_fallback(&self, width: u32, height: u32) -> DynamicImage;
}

/// Pending caller completion, shared between the status and transfer
/// handlers. Whichever path terminates the fetch takes the callback; the
/// other finds it gone.
type Completion = Arc<Mutex<Option<IconFn>>>;

fn complete(completion: &Completion, icon: Option<DynamicImage>) {
    if let Some(cb) = completion.lock().unwrap().take() {
        cb(icon);
    }
}

impl Net {
    /// Requests an icon for `uri`, typically the favicon of its origin.
    ///
    /// Returns an immediate icon: the cached one when available, else the
    /// theme's generic glyph (or `None` without a theme). On a cache miss
    /// with `icon_cb` supplied, a background fetch is started and `icon_cb`
    /// later receives the real icon or `None`; without `icon_cb` no fetch is
    /// started. Returned icons are scaled to the small-icon size and
    /// independently owned by the caller.
    pub fn load_icon(
        &self,
        uri: &str,
        icon_cb: Option<IconFn>,
        theme: Option<Arc<dyn IconTheme>>,
    ) -> Option<DynamicImage> {
        if uri.is_empty() {
            return None;
        }
        let (width, height) = icon_dimensions(self.config(), theme.as_deref());
        let mut resolved: Option<DynamicImage> = None;

        let learned = self.redirects().take(uri);
        let candidate = match learned {
            Some(target) => Some(target),
            None if uri.starts_with("http") => favicon_uri(uri),
            None => None,
        };

        if let Some(icon_uri) = candidate {
            let icon_file = self.cached_path(&icon_uri, Some("icons"));
            match self.memory().lookup(&icon_file) {
                CacheLookup::Present(img) => resolved = Some((*img).clone()),
                // A previous fetch resolved to "no icon here"; don't refetch.
                CacheLookup::KnownAbsent => {}
                CacheLookup::NotCached => {
                    if let Ok(img) = open_icon(&icon_file) {
                        resolved = Some(img);
                    } else if let Some(icon_cb) = icon_cb {
                        self.spawn_icon_fetch(uri, icon_uri, icon_file, icon_cb, theme.clone());
                    }
                }
            }
        }

        let base =
            resolved.or_else(|| theme.as_deref().map(|t| t.render_fallback(width, height)));
        base.map(|img| scale_icon(&img, width, height))
    }

    /// Starts the background fetch for `icon_uri` with the internal
    /// status/transfer handlers wired to the caller's completion.
    fn spawn_icon_fetch(
        &self,
        page_uri: &str,
        icon_uri: String,
        icon_file: PathBuf,
        icon_cb: IconFn,
        theme: Option<Arc<dyn IconTheme>>,
    ) {
        let completion: Completion = Arc::new(Mutex::new(Some(icon_cb)));
        let moved_target: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let status_completion = Arc::clone(&completion);
        let status_moved = Arc::clone(&moved_target);
        let status_net = self.clone();
        let page_uri = page_uri.to_string();
        let status_cb: StatusFn = Box::new(move |request| match request.status {
            Status::Verified => {
                if let Some(mime) = &request.mime_type {
                    if !mime.starts_with("image/") {
                        complete(&status_completion, None);
                        return false;
                    }
                }
                true
            }
            Status::Moved => {
                if let Some(target) = &request.location {
                    status_net
                        .redirects()
                        .record(page_uri.clone(), target.clone());
                    *status_moved.lock().unwrap() = Some(target.clone());
                }
                true
            }
            _ => {
                complete(&status_completion, None);
                false
            }
        });

        let net = self.clone();
        let transfer_cb: TransferFn = Box::new(move |request| {
            if request.status == Status::Moved {
                // Redirect chain ended without a real transfer.
                complete(&completion, None);
                return;
            }
            // The transfer follows redirects itself, so the bytes belong to
            // the last hop's URI. Cache them under that URI's path; the next
            // load consumes the learned target and looks up the same path.
            let icon_file = match moved_target.lock().unwrap().take() {
                Some(target) => net.cached_path(&target, Some("icons")),
                None => icon_file,
            };
            let mut decoded: Option<Arc<DynamicImage>> = None;
            if let Some(data) = request.data.as_deref() {
                decoded = persist_and_decode(&icon_file, data, request.mime_type.as_deref())
                    .map(Arc::new);
                net.memory().insert(icon_file.clone(), decoded.clone());
            }
            let cb = match completion.lock().unwrap().take() {
                Some(cb) => cb,
                None => return,
            };
            let (width, height) = icon_dimensions(net.config(), theme.as_deref());
            match decoded {
                Some(img) => cb(Some(scale_icon(&img, width, height))),
                None => match theme.as_deref() {
                    Some(t) => cb(Some(t.render_fallback(width, height))),
                    None => cb(None),
                },
            }
        });

        self.load_uri(&icon_uri, Some(status_cb), Some(transfer_cb));
    }
}

/// `<origin>/favicon.ico` for an HTTP(S) page URI; `None` when the URI has
/// no host to derive an origin from.
fn favicon_uri(page_uri: &str) -> Option<String> {
    let url = Url::parse(page_uri).ok()?;
    let origin = url.origin();
    if !matches!(origin, url::Origin::Tuple(..)) {
        return None;
    }
    Some(format!("{}/favicon.ico", origin.ascii_serialization()))
}

fn icon_dimensions(config: &NetConfig, theme: Option<&dyn IconTheme>) -> (u32, u32) {
    theme
        .map(|t| t.icon_size())
        .unwrap_or((config.icon_width, config.icon_height))
}

fn scale_icon(icon: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    icon.resize_exact(width, height, FilterType::Triangle)
}

/// Write fetched bytes to the cache file and decode from there; a write
/// failure is non-fatal and decoding falls back to the in-memory buffer.
/// Returns `None` when the bytes are not a decodable image.
fn persist_and_decode(path: &Path, data: &[u8], mime: Option<&str>) -> Option<DynamicImage> {
    match fs::write(path, data) {
        Ok(()) => match open_icon(path) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "fetched icon does not decode");
                None
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "icon cache write failed, decoding from memory");
            decode_icon(data, mime).ok()
        }
    }
}

/// Decode an icon file by sniffing the stored bytes. The cache file name
/// carries the URI's extension, which need not match the actual format: a
/// favicon.ico is very often PNG data.
fn open_icon(path: &Path) -> Result<DynamicImage, image::ImageError> {
    image::io::Reader::open(path)?.with_guessed_format()?.decode()
}

/// Decode an icon from a byte buffer, honoring the MIME hint when curl saw
/// one and falling back to format sniffing.
fn decode_icon(data: &[u8], mime: Option<&str>) -> Result<DynamicImage, FetchError> {
    if let Some(format) = mime.and_then(image::ImageFormat::from_mime_type) {
        if let Ok(img) = image::load_from_memory_with_format(data, format) {
            return Ok(img);
        }
    }
    image::load_from_memory(data).map_err(|_| FetchError::Decode)
}
