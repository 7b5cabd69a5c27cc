//! Tokio event loop around a [`Canvas`].
//!
//! The loop task is the only owner of the canvas. Fetches and identifier
//! requests run as spawned tasks and report back over an mpsc channel, so
//! every state change still happens one at a time, in arrival order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use foundation::math::Vec2;
use foundation::time::Millis;
use streaming::fetch::{BoxFuture, ContentFetcher, LoadError, Texture, fetch_texture};
use streaming::protocol::{IdentifierBatch, IdentifierRequest};
use streaming::request::Ticket;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::canvas::{Canvas, Effect};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identifier source error: {}", self.message)
    }
}

impl std::error::Error for SourceError {}

/// Collaborator that maps cell keys to content ids.
pub trait IdentifierSource: Send + Sync {
    fn identifiers<'a>(
        &'a self,
        request: &'a IdentifierRequest,
    ) -> BoxFuture<'a, Result<IdentifierBatch, SourceError>>;
}

/// POSTs the JSON request to a fixed URL and parses the batch from the body.
#[derive(Debug, Clone)]
pub struct HttpIdentifierSource {
    client: reqwest::Client,
    url: String,
}

impl HttpIdentifierSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl IdentifierSource for HttpIdentifierSource {
    fn identifiers<'a>(
        &'a self,
        request: &'a IdentifierRequest,
    ) -> BoxFuture<'a, Result<IdentifierBatch, SourceError>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(&self.url)
                .json(request)
                .send()
                .await
                .map_err(|err| SourceError::new(err.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SourceError::new(format!(
                    "POST {} returned HTTP {}",
                    self.url,
                    status.as_u16()
                )));
            }
            resp.json::<IdentifierBatch>()
                .await
                .map_err(|err| SourceError::new(err.to_string()))
        })
    }
}

/// User input delivered to the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// Screen-space drag delta.
    PanBy { dx: f64, dy: f64 },
    PanTo(Vec2),
    ZoomBy(f64),
    /// Pointer position in world coordinates.
    PointerMove(Vec2),
    PointerLeave,
}

enum Settled {
    Fetched {
        ticket: Ticket,
        result: Result<Texture, LoadError>,
        elapsed: Duration,
    },
    Identifiers(Result<IdentifierBatch, SourceError>),
}

pub struct CanvasDriver {
    canvas: Canvas,
    fetcher: Arc<dyn ContentFetcher>,
    source: Arc<dyn IdentifierSource>,
    navigation: Option<mpsc::UnboundedSender<String>>,
    started: Instant,
}

impl CanvasDriver {
    pub fn new(
        canvas: Canvas,
        fetcher: Arc<dyn ContentFetcher>,
        source: Arc<dyn IdentifierSource>,
    ) -> Self {
        Self {
            canvas,
            fetcher,
            source,
            navigation: None,
            started: Instant::now(),
        }
    }

    /// Forwards dwell navigations (detail URLs) to `tx`.
    pub fn with_navigation(mut self, tx: mpsc::UnboundedSender<String>) -> Self {
        self.navigation = Some(tx);
        self
    }

    fn now(&self) -> Millis {
        Millis(self.started.elapsed().as_millis() as u64)
    }

    /// Runs until `inputs` is closed and no spawned work is outstanding, then
    /// hands the canvas back.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) -> Canvas {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Settled>();
        let mut outstanding = 0usize;
        let mut inputs_open = true;
        let mut ticker = tokio::time::interval(Duration::from_millis(self.canvas.config().tick_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.dispatch(&done_tx, &mut outstanding);
        loop {
            if !inputs_open && outstanding == 0 && self.canvas.is_quiescent() {
                break;
            }
            tokio::select! {
                input = inputs.recv(), if inputs_open => match input {
                    Some(input) => self.apply(input),
                    None => {
                        debug!("input channel closed");
                        inputs_open = false;
                    }
                },
                Some(settled) = done_rx.recv() => {
                    outstanding = outstanding.saturating_sub(1);
                    let now = self.now();
                    match settled {
                        Settled::Fetched { ticket, result, elapsed } => {
                            self.canvas.record_fetch_time(elapsed);
                            self.canvas.fetch_settled(ticket, result, now);
                        }
                        Settled::Identifiers(Ok(batch)) => {
                            self.canvas.apply_identifiers(&batch, now);
                        }
                        Settled::Identifiers(Err(err)) => {
                            warn!(error = %err, "identifier request failed, cells stay placeholders");
                        }
                    }
                }
                _ = ticker.tick() => {
                    let now = self.now();
                    self.canvas.tick(now);
                }
            }
            self.dispatch(&done_tx, &mut outstanding);
        }

        info!(metrics = %self.canvas.metrics().snapshot(), "driver stopped");
        self.canvas
    }

    fn apply(&mut self, input: Input) {
        let now = self.now();
        match input {
            Input::PanBy { dx, dy } => self.canvas.pan_by(dx, dy, now),
            Input::PanTo(center) => self.canvas.pan_to(center, now),
            Input::ZoomBy(factor) => self.canvas.zoom_by(factor, now),
            Input::PointerMove(world) => self.canvas.pointer_move(world, now),
            Input::PointerLeave => self.canvas.pointer_leave(),
        }
    }

    fn dispatch(&mut self, done: &mpsc::UnboundedSender<Settled>, outstanding: &mut usize) {
        for effect in self.canvas.drain_effects() {
            match effect {
                Effect::RequestIdentifiers(request) => {
                    *outstanding += 1;
                    let source = Arc::clone(&self.source);
                    let done = done.clone();
                    tokio::spawn(async move {
                        let result = source.identifiers(&request).await;
                        let _ = done.send(Settled::Identifiers(result));
                    });
                }
                Effect::Fetch(order) => {
                    *outstanding += 1;
                    let fetcher = Arc::clone(&self.fetcher);
                    let done = done.clone();
                    tokio::spawn(async move {
                        let started = Instant::now();
                        let result =
                            fetch_texture(fetcher.as_ref(), &order.content_id, &order.token).await;
                        let _ = done.send(Settled::Fetched {
                            ticket: order.ticket,
                            result,
                            elapsed: started.elapsed(),
                        });
                    });
                }
                Effect::Navigate { content_id, url } => {
                    info!(content_id = %content_id, url = %url, "navigate");
                    if let Some(tx) = &self.navigation
                        && tx.send(url).is_err()
                    {
                        debug!("navigation receiver dropped");
                    }
                }
            }
        }
    }
}
