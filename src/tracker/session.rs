//! Progress channel state machine.
//!
//! ```text
//!             elapsed > threshold
//! NotStarted ─────────────────────▶ HeaderPhase ──(head sent)──┐
//!     │                                                         │
//!     └──────────(head sent before threshold)──────────────────┤
//!                                                               ▼
//!                               accepts SSE && writable ─▶ StreamPhase
//!                               writable && !inline_written ─▶ InlinePhase
//! any state ──(finish / error / drop)──▶ Done
//! ```
//!
//! Percent is a function of elapsed time only: one point per 100 ms,
//! capped at 90 until the response actually finishes.

use std::time::Duration;

use tokio::time::Instant;

/// Percent never reported before completion.
pub const MAX_HEURISTIC_PERCENT: u8 = 90;

/// Elapsed milliseconds per heuristic percent point.
pub const MS_PER_PERCENT: u128 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    NotStarted,
    HeaderPhase,
    StreamPhase,
    InlinePhase,
    Done,
}

/// What one tick asks the transport to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// Pending `X-Progress` header value.
    Header(u8),
    /// One server-sent `progress` event.
    Event(u8),
    /// The single inline progress marker.
    Inline(u8),
}

impl Emission {
    pub fn channel(&self) -> &'static str {
        match self {
            Emission::Header(_) => "header",
            Emission::Event(_) => "event_stream",
            Emission::Inline(_) => "inline",
        }
    }
}

/// `min(90, floor(elapsed_ms / 100))`.
pub fn heuristic_percent(elapsed: Duration) -> u8 {
    let points = elapsed.as_millis() / MS_PER_PERCENT;
    points.min(MAX_HEURISTIC_PERCENT as u128) as u8
}

#[derive(Debug)]
pub struct ProgressSession {
    started_at: Instant,
    threshold: Duration,
    phase: ProgressPhase,
    last_percent: Option<u8>,
    pending_header: Option<u8>,
    headers_sent: bool,
    accepts_event_stream: bool,
    writable: bool,
    inline_written: bool,
}

impl ProgressSession {
    pub fn new(started_at: Instant, threshold: Duration, accepts_event_stream: bool) -> Self {
        Self {
            started_at,
            threshold,
            phase: ProgressPhase::NotStarted,
            last_percent: None,
            pending_header: None,
            headers_sent: false,
            accepts_event_stream,
            writable: false,
            inline_written: false,
        }
    }

    pub fn phase(&self) -> ProgressPhase {
        self.phase
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }

    pub fn is_done(&self) -> bool {
        self.phase == ProgressPhase::Done
    }

    /// Evaluate one tick at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<Emission> {
        if self.is_done() {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed <= self.threshold {
            return None;
        }

        let percent = heuristic_percent(elapsed);
        self.last_percent = Some(percent);

        if !self.headers_sent {
            self.phase = ProgressPhase::HeaderPhase;
            self.pending_header = Some(percent);
            return Some(Emission::Header(percent));
        }

        if self.accepts_event_stream && self.writable {
            self.phase = ProgressPhase::StreamPhase;
            return Some(Emission::Event(percent));
        }

        if self.writable && !self.inline_written {
            self.phase = ProgressPhase::InlinePhase;
            self.inline_written = true;
            return Some(Emission::Inline(percent));
        }

        None
    }

    /// The response head is leaving. Returns the header percent to apply.
    pub fn mark_headers_sent(&mut self, writable: bool) -> Option<u8> {
        if self.is_done() {
            return None;
        }
        self.headers_sent = true;
        self.writable = writable;
        self.pending_header.take()
    }

    /// The body consumer went away; injected writes are no longer possible.
    pub fn mark_closed(&mut self) {
        self.writable = false;
    }

    pub fn finish(&mut self) {
        self.phase = ProgressPhase::Done;
        self.pending_header = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(1000);

    fn at(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn test_percent_heuristic() {
        assert_eq!(heuristic_percent(Duration::from_millis(0)), 0);
        assert_eq!(heuristic_percent(Duration::from_millis(1199)), 11);
        assert_eq!(heuristic_percent(Duration::from_millis(1200)), 12);
        assert_eq!(heuristic_percent(Duration::from_millis(9_000)), 90);
        assert_eq!(heuristic_percent(Duration::from_secs(3600)), 90);
    }

    #[test]
    fn test_quiet_until_threshold() {
        let start = Instant::now();
        let mut session = ProgressSession::new(start, THRESHOLD, false);
        assert_eq!(session.tick(at(start, 500)), None);
        assert_eq!(session.tick(at(start, 1000)), None);
        assert_eq!(session.phase(), ProgressPhase::NotStarted);
        assert_eq!(session.tick(at(start, 1100)), Some(Emission::Header(11)));
        assert_eq!(session.phase(), ProgressPhase::HeaderPhase);
    }

    #[test]
    fn test_header_phase_hands_over_latest_percent() {
        let start = Instant::now();
        let mut session = ProgressSession::new(start, THRESHOLD, false);
        session.tick(at(start, 1100));
        session.tick(at(start, 1300));
        assert_eq!(session.mark_headers_sent(false), Some(13));
        assert_eq!(session.tick(at(start, 1400)), None);
    }

    #[test]
    fn test_stream_phase_emits_every_tick() {
        let start = Instant::now();
        let mut session = ProgressSession::new(start, THRESHOLD, true);
        assert_eq!(session.mark_headers_sent(true), None);
        assert_eq!(session.tick(at(start, 1100)), Some(Emission::Event(11)));
        assert_eq!(session.tick(at(start, 1200)), Some(Emission::Event(12)));
        assert_eq!(session.phase(), ProgressPhase::StreamPhase);
    }

    #[test]
    fn test_inline_marker_written_at_most_once() {
        let start = Instant::now();
        let mut session = ProgressSession::new(start, THRESHOLD, false);
        session.mark_headers_sent(true);
        assert_eq!(session.tick(at(start, 1500)), Some(Emission::Inline(15)));
        assert_eq!(session.tick(at(start, 1600)), None);
        assert_eq!(session.tick(at(start, 5000)), None);
        assert_eq!(session.phase(), ProgressPhase::InlinePhase);
    }

    #[test]
    fn test_closed_transport_stops_streaming() {
        let start = Instant::now();
        let mut session = ProgressSession::new(start, THRESHOLD, true);
        session.mark_headers_sent(true);
        assert!(session.tick(at(start, 1100)).is_some());
        session.mark_closed();
        assert_eq!(session.tick(at(start, 1200)), None);
    }

    #[test]
    fn test_nothing_after_finish() {
        let start = Instant::now();
        let mut session = ProgressSession::new(start, THRESHOLD, true);
        session.tick(at(start, 1100));
        session.finish();
        assert!(session.is_done());
        assert_eq!(session.tick(at(start, 2000)), None);
        assert_eq!(session.mark_headers_sent(true), None);
    }
}
