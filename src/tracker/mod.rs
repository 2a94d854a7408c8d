//! Progress streamer for long-running mutating requests.
//!
//! # Data Flow
//! ```text
//! POST / PUT entry
//!     → ProgressSession + tick task (interval_at start + interval)
//!     → ticks before head: pending X-Progress header
//!     → response head: header applied, body wrapped in ProgressBody
//!     → ticks after head: SSE frames or one inline marker injected
//!       into the body (streaming bodies only)
//! finish / error / drop
//!     → SessionGuard dropped → session Done, tick task aborted
//! ```
//!
//! # Design Decisions
//! - Percent is heuristic (elapsed time only), never claims the last 10%
//! - Every tick task is owned by exactly one SessionGuard; dropping the
//!   guard is the only way a session ends
//! - Injected writes happen under the session lock, so no write can land
//!   after the session is marked Done
//! - Bodies with an exact size never receive injected bytes

pub mod session;

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header::ACCEPT, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::TrackerConfig;
use crate::observability::metrics;

pub use session::{heuristic_percent, Emission, ProgressPhase, ProgressSession};

pub const X_PROGRESS: &str = "x-progress";
const EVENT_STREAM: &str = "text/event-stream";

/// Emits heuristic progress for slow POST/PUT requests.
pub struct Tracker {
    config: TrackerConfig,
    active: AtomicUsize,
    ticks: AtomicU64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            active: AtomicUsize::new(0),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Create/update semantics only.
    pub fn is_eligible(method: &Method) -> bool {
        *method == Method::POST || *method == Method::PUT
    }

    /// Progress timers currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Progress emissions delivered since startup: applied headers plus
    /// injected frames.
    pub fn ticks_emitted(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn record_emission(&self, emission: Emission) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        metrics::record_progress_emission(emission.channel());
    }

    fn start(
        self: &Arc<Self>,
        accepts_event_stream: bool,
    ) -> (SessionGuard, mpsc::UnboundedReceiver<Bytes>) {
        let now = Instant::now();
        let session = Arc::new(Mutex::new(ProgressSession::new(
            now,
            Duration::from_millis(self.config.threshold_ms),
            accepts_event_stream,
        )));
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let interval = Duration::from_millis(self.config.interval_ms.max(1));

        self.active.fetch_add(1, Ordering::Relaxed);
        let ticker = tokio::spawn(run_ticks(
            self.clone(),
            session.clone(),
            frames_tx,
            now + interval,
            interval,
        ));

        let guard = SessionGuard {
            session,
            ticker,
            tracker: self.clone(),
        };
        (guard, frames_rx)
    }
}

/// Sole owner of a session's tick task.
struct SessionGuard {
    session: Arc<Mutex<ProgressSession>>,
    ticker: JoinHandle<()>,
    tracker: Arc<Tracker>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.lock().finish();
        self.ticker.abort();
        self.tracker.active.fetch_sub(1, Ordering::Relaxed);
    }
}

async fn run_ticks(
    tracker: Arc<Tracker>,
    session: Arc<Mutex<ProgressSession>>,
    frames: mpsc::UnboundedSender<Bytes>,
    first_tick: Instant,
    interval: Duration,
) {
    let mut ticker = time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let mut state = session.lock();
        if state.is_done() {
            break;
        }
        let Some(emission) = state.tick(Instant::now()) else {
            continue;
        };

        let frame = match emission {
            // Only the value pending when the head leaves is counted.
            Emission::Header(_) => continue,
            Emission::Event(percent) => event_frame(percent),
            Emission::Inline(percent) => inline_frame(percent),
        };
        if frames.send(frame).is_ok() {
            tracker.record_emission(emission);
        } else {
            state.mark_closed();
        }
    }
}

fn event_frame(percent: u8) -> Bytes {
    Bytes::from(format!(
        "event: progress\ndata: {}\n\n",
        json!({ "percent": percent })
    ))
}

fn inline_frame(percent: u8) -> Bytes {
    Bytes::from(format!("progress: {percent}%\n"))
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(EVENT_STREAM))
}

/// Response body that interleaves injected progress frames with the
/// handler's own frames and ends the session when it finishes.
struct ProgressBody {
    inner: Body,
    frames: Option<mpsc::UnboundedReceiver<Bytes>>,
    guard: Option<SessionGuard>,
}

impl ProgressBody {
    fn close(&mut self) {
        self.frames = None;
        self.guard = None;
    }
}

impl HttpBody for ProgressBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if let Some(frames) = this.frames.as_mut() {
            match frames.poll_recv(cx) {
                Poll::Ready(Some(bytes)) => return Poll::Ready(Some(Ok(Frame::data(bytes)))),
                Poll::Ready(None) => this.frames = None,
                Poll::Pending => {}
            }
        }

        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => this.close(),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.close(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Axum middleware entry point for the tracker.
pub async fn tracker_middleware(
    State(tracker): State<Arc<Tracker>>,
    req: Request,
    next: Next,
) -> Response {
    if !Tracker::is_eligible(req.method()) {
        return next.run(req).await;
    }

    let (guard, frames) = tracker.start(accepts_event_stream(req.headers()));

    // Dropping this future before a response exists drops the guard too.
    let mut response = next.run(req).await;

    let writable = response.body().size_hint().exact().is_none();
    let header_percent = guard.session.lock().mark_headers_sent(writable);
    if let Some(percent) = header_percent {
        if let Ok(value) = HeaderValue::from_str(&format!("{percent}%")) {
            response.headers_mut().insert(X_PROGRESS, value);
            tracker.record_emission(Emission::Header(percent));
        }
    }

    response.map(move |inner| {
        let body = ProgressBody {
            inner,
            frames: Some(frames),
            guard: Some(guard),
        };
        if body.inner.is_end_stream() {
            // Nothing left to stream; end the session now.
            drop(body.guard);
            return body.inner;
        }
        Body::new(body)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_post_and_put_are_eligible() {
        assert!(Tracker::is_eligible(&Method::POST));
        assert!(Tracker::is_eligible(&Method::PUT));
        assert!(!Tracker::is_eligible(&Method::GET));
        assert!(!Tracker::is_eligible(&Method::DELETE));
        assert!(!Tracker::is_eligible(&Method::PATCH));
    }

    #[test]
    fn test_frame_formats() {
        assert_eq!(&event_frame(42)[..], b"event: progress\ndata: {\"percent\":42}\n\n");
        assert_eq!(&inline_frame(15)[..], b"progress: 15%\n");
    }

    #[test]
    fn test_accept_detection() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_event_stream(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/event-stream"));
        assert!(accepts_event_stream(&headers));
    }
}
