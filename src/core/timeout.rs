//! Caller-side timeout signal raced against an execution.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`TimeoutSignal`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFired {
    /// The configured duration elapsed.
    Elapsed(Duration),
    /// The caller's stop token was cancelled.
    Stopped,
}

/// A future that resolves when an execution should stop being awaited.
///
/// The clock starts when the signal is constructed, not when it is first
/// polled, so the caller decides exactly when the attempt's budget begins.
/// The runner only consumes signals; it never creates or cancels them.
pub struct TimeoutSignal {
    duration: Option<Duration>,
    fired: BoxFuture<'static, SignalFired>,
}

impl TimeoutSignal {
    /// Fires once `duration` has elapsed from now.
    pub fn after(duration: Duration) -> Self {
        Self::build(Some(duration), None)
    }

    /// Fires after `duration`, or earlier if `stop` is cancelled.
    pub fn after_or_stop(duration: Duration, stop: CancellationToken) -> Self {
        Self::build(Some(duration), Some(stop))
    }

    /// Fires only when `stop` is cancelled.
    pub fn on_stop(stop: CancellationToken) -> Self {
        Self::build(None, Some(stop))
    }

    /// Never fires.
    pub fn never() -> Self {
        Self {
            duration: None,
            fired: futures::future::pending().boxed(),
        }
    }

    /// Wrap an arbitrary future as a signal.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = SignalFired> + Send + 'static,
    {
        Self {
            duration: None,
            fired: future.boxed(),
        }
    }

    fn build(duration: Option<Duration>, stop: Option<CancellationToken>) -> Self {
        let deadline = duration.map(|d| (Instant::now() + d, d));
        let fired = async move {
            let elapsed = async {
                match deadline {
                    Some((at, d)) => {
                        tokio::time::sleep_until(at).await;
                        SignalFired::Elapsed(d)
                    }
                    None => futures::future::pending().await,
                }
            };
            match stop {
                Some(token) => tokio::select! {
                    fired = elapsed => fired,
                    _ = token.cancelled() => SignalFired::Stopped,
                },
                None => elapsed.await,
            }
        }
        .boxed();
        Self { duration, fired }
    }

    /// The configured duration, if this signal has one.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

impl Future for TimeoutSignal {
    type Output = SignalFired;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.fired.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for TimeoutSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutSignal")
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}
