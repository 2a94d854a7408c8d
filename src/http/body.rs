//! Response body wrapper that reports the terminal "finish" event.
//!
//! The callback fires exactly once: when the inner body yields its last
//! frame, when it errors, or when it is dropped before either happened.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use serde::Serialize;

/// How a response body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOutcome {
    /// Every frame was delivered.
    Completed,
    /// The body produced an error mid-stream.
    Errored,
    /// The body was dropped before completion (client went away).
    Aborted,
}

type FinishCallback = Box<dyn FnOnce(RequestOutcome) + Send + 'static>;

pub struct CompletionBody {
    inner: Body,
    on_finish: Option<FinishCallback>,
}

impl CompletionBody {
    pub fn new<F>(inner: Body, on_finish: F) -> Self
    where
        F: FnOnce(RequestOutcome) + Send + 'static,
    {
        Self {
            inner,
            on_finish: Some(Box::new(on_finish)),
        }
    }

    /// Wrap `inner` and return it as an axum body.
    pub fn wrap<F>(inner: Body, on_finish: F) -> Body
    where
        F: FnOnce(RequestOutcome) + Send + 'static,
    {
        Body::new(Self::new(inner, on_finish))
    }

    fn finish(&mut self, outcome: RequestOutcome) {
        if let Some(callback) = self.on_finish.take() {
            callback(outcome);
        }
    }
}

impl HttpBody for CompletionBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => this.finish(RequestOutcome::Completed),
            Poll::Ready(Some(Err(_))) => this.finish(RequestOutcome::Errored),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => {
                this.finish(RequestOutcome::Completed)
            }
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

impl Drop for CompletionBody {
    fn drop(&mut self) {
        // Servers skip polling bodies that report end-of-stream up front.
        let outcome = if self.inner.is_end_stream() {
            RequestOutcome::Completed
        } else {
            RequestOutcome::Aborted
        };
        self.finish(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<RequestOutcome>>>, impl FnOnce(RequestOutcome) + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |o| sink.lock().unwrap().push(o))
    }

    #[tokio::test]
    async fn test_fires_once_when_fully_read() {
        let (seen, cb) = recorder();
        let body = CompletionBody::wrap(Body::from("hello"), cb);
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
        assert_eq!(*seen.lock().unwrap(), vec![RequestOutcome::Completed]);
    }

    #[test]
    fn test_drop_before_read_is_aborted() {
        let (seen, cb) = recorder();
        drop(CompletionBody::wrap(Body::from("unread"), cb));
        assert_eq!(*seen.lock().unwrap(), vec![RequestOutcome::Aborted]);
    }

    #[test]
    fn test_empty_body_drop_counts_as_completed() {
        let (seen, cb) = recorder();
        drop(CompletionBody::wrap(Body::empty(), cb));
        assert_eq!(*seen.lock().unwrap(), vec![RequestOutcome::Completed]);
    }

    #[tokio::test]
    async fn test_stream_error_is_reported() {
        let (seen, cb) = recorder();
        let stream = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Err(std::io::Error::other("broken pipe")),
        ]);
        let body = CompletionBody::wrap(Body::from_stream(stream), cb);
        assert!(axum::body::to_bytes(body, usize::MAX).await.is_err());
        assert_eq!(*seen.lock().unwrap(), vec![RequestOutcome::Errored]);
    }
}
