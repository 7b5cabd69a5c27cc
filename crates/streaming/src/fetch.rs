//! Fetch and decode path for cell content.
//!
//! `fetch_texture` is the single async entry point: it downloads through a
//! [`ContentFetcher`] raced against a [`CancelToken`], then decodes with the
//! `image` crate on the blocking pool so large images never stall the
//! caller's runtime thread. It always settles, so whoever spawned it can
//! rely on hearing back exactly once.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::debug;

use crate::protocol::UrlTemplate;
use crate::request::ContentId;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Transport failure (`status: None`) or non-2xx response.
    Fetch { status: Option<u16>, message: String },
    /// Bytes arrived but are not a decodable image.
    Decode { message: String },
    /// The load was cancelled; never surfaced to the user.
    Cancelled,
}

impl LoadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Fetch {
                status: Some(status),
                message,
            } => write!(f, "fetch failed with HTTP {status}: {message}"),
            LoadError::Fetch {
                status: None,
                message,
            } => write!(f, "fetch failed: {message}"),
            LoadError::Decode { message } => write!(f, "decode failed: {message}"),
            LoadError::Cancelled => write!(f, "load cancelled"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Cooperative cancellation signal shared between the scheduler and a fetch
/// task. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Decoded RGBA8 pixels, shared by every cell showing the same content.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

impl Texture {
    pub fn byte_len(&self) -> usize {
        self.rgba.len()
    }
}

pub fn decode_texture(bytes: &[u8]) -> Result<Texture, LoadError> {
    let decoded = image::load_from_memory(bytes).map_err(|err| LoadError::Decode {
        message: err.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Texture {
        width,
        height,
        rgba: Arc::from(rgba.into_raw()),
    })
}

/// Source of raw content bytes.
///
/// Methods return boxed futures for dyn-compatibility.
pub trait ContentFetcher: Send + Sync {
    fn fetch<'a>(&'a self, id: &'a ContentId) -> BoxFuture<'a, Result<Bytes, LoadError>>;
}

/// Fetches content over HTTP from a URL template.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    url: UrlTemplate,
}

impl HttpFetcher {
    pub fn new(url: UrlTemplate) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: UrlTemplate) -> Self {
        Self { client, url }
    }

    pub fn url_template(&self) -> &UrlTemplate {
        &self.url
    }
}

impl ContentFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, id: &'a ContentId) -> BoxFuture<'a, Result<Bytes, LoadError>> {
        Box::pin(async move {
            let url = self.url.render(id);
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|err| LoadError::Fetch {
                    status: None,
                    message: err.to_string(),
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(LoadError::Fetch {
                    status: Some(status.as_u16()),
                    message: format!("GET {url}"),
                });
            }

            resp.bytes().await.map_err(|err| LoadError::Fetch {
                status: None,
                message: err.to_string(),
            })
        })
    }
}

/// Downloads and decodes `id`, giving up as soon as `token` fires.
pub async fn fetch_texture(
    fetcher: &dyn ContentFetcher,
    id: &ContentId,
    token: &CancelToken,
) -> Result<Texture, LoadError> {
    if token.is_cancelled() {
        return Err(LoadError::Cancelled);
    }

    let bytes = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(content_id = %id, "fetch cancelled in flight");
            return Err(LoadError::Cancelled);
        }
        res = fetcher.fetch(id) => res?,
    };

    if token.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    tokio::task::spawn_blocking(move || decode_texture(&bytes))
        .await
        .unwrap_or_else(|err| {
            Err(LoadError::Decode {
                message: format!("decode task failed: {err}"),
            })
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    use super::{
        BoxFuture, CancelToken, ContentFetcher, LoadError, decode_texture, fetch_texture,
    };
    use crate::request::ContentId;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    enum Reply {
        Png,
        Status(u16),
        Garbage,
        Hang,
    }

    struct FakeFetcher {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ContentFetcher for FakeFetcher {
        fn fetch<'a>(&'a self, _id: &'a ContentId) -> BoxFuture<'a, Result<Bytes, LoadError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match self.reply {
                    Reply::Png => Ok(Bytes::from(png_bytes(2, 3))),
                    Reply::Status(code) => Err(LoadError::Fetch {
                        status: Some(code),
                        message: "GET test".to_string(),
                    }),
                    Reply::Garbage => Ok(Bytes::from_static(b"not an image")),
                    Reply::Hang => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(Bytes::new())
                    }
                }
            })
        }
    }

    #[test]
    fn decodes_png_into_rgba() {
        let tex = decode_texture(&png_bytes(4, 2)).unwrap();
        assert_eq!((tex.width, tex.height), (4, 2));
        assert_eq!(tex.byte_len(), 4 * 2 * 4);
        assert_eq!(&tex.rgba[..4], &[200, 10, 10, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_texture(b"nope").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn fetch_texture_success() {
        let fetcher = FakeFetcher::new(Reply::Png);
        let tex = fetch_texture(&*fetcher, &ContentId::from("a"), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!((tex.width, tex.height), (2, 3));
    }

    #[tokio::test]
    async fn http_status_surfaces_as_fetch_error() {
        let fetcher = FakeFetcher::new(Reply::Status(500));
        let err = fetch_texture(&*fetcher, &ContentId::from("xyz"), &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::Fetch {
                status: Some(500),
                message: "GET test".to_string()
            }
        );
        assert_eq!(err.to_string(), "fetch failed with HTTP 500: GET test");
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let fetcher = FakeFetcher::new(Reply::Garbage);
        let err = fetch_texture(&*fetcher, &ContentId::from("a"), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[tokio::test]
    async fn pre_cancelled_token_skips_fetch() {
        let fetcher = FakeFetcher::new(Reply::Png);
        let token = CancelToken::new();
        token.cancel();
        let err = fetch_texture(&*fetcher, &ContentId::from("a"), &token)
            .await
            .unwrap_err();
        assert_eq!(err, LoadError::Cancelled);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelling_in_flight_fetch_settles_promptly() {
        let fetcher = FakeFetcher::new(Reply::Hang);
        let token = CancelToken::new();
        let task = {
            let fetcher = fetcher.clone();
            let token = token.clone();
            tokio::spawn(async move {
                fetch_texture(&*fetcher, &ContentId::from("a"), &token).await
            })
        };

        tokio::task::yield_now().await;
        token.cancel();
        let res = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("settles")
            .expect("join");
        assert_eq!(res.unwrap_err(), LoadError::Cancelled);
    }

    #[test]
    fn token_clones_share_state() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }
}
