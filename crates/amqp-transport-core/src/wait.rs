//! Readiness waiting with cooperative interruption.
//!
//! The transport never blocks inside a read call in cooperative mode. When a
//! read attempt comes back empty it parks here instead, until the socket is
//! readable, a deadline passes, or the host asks for control back through a
//! [`WaitInterrupt`]. An interrupt is a normal early return, not an error.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::trace;

use crate::transport::AmqpStream;

/// Why a wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The socket has data (or end-of-stream) to read.
    Ready,
    /// The deadline elapsed first.
    TimedOut,
    /// The host interrupted the wait, or the readiness poll was transiently interrupted.
    Interrupted,
}

/// Host-side handle used to break a transport out of an idle wait.
///
/// Clones share the same underlying notification. An interrupt raised while
/// no wait is in progress stays pending and is delivered at the next wait.
#[derive(Debug, Clone, Default)]
pub struct WaitInterrupt {
    notify: Arc<Notify>,
}

impl WaitInterrupt {
    /// Create a new interrupt handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the current (or next) wait.
    pub fn interrupt(&self) {
        self.notify.notify_one();
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Forward every delivery of an OS signal to this handle.
    ///
    /// The returned task runs until it is aborted.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler cannot be registered.
    #[cfg(unix)]
    pub fn forward_signal(
        &self,
        kind: tokio::signal::unix::SignalKind,
    ) -> io::Result<tokio::task::JoinHandle<()>> {
        let mut signal = tokio::signal::unix::signal(kind)?;
        let handle = self.clone();
        Ok(tokio::spawn(async move {
            while signal.recv().await.is_some() {
                trace!("signal received, interrupting wait");
                handle.interrupt();
            }
        }))
    }
}

/// Waits on a stream's readiness, honouring a deadline and an interrupt handle.
#[derive(Debug, Clone, Default)]
pub struct WaitMultiplexer {
    interrupt: WaitInterrupt,
}

impl WaitMultiplexer {
    /// Create a multiplexer driven by the given interrupt handle.
    #[must_use]
    pub fn new(interrupt: WaitInterrupt) -> Self {
        Self { interrupt }
    }

    /// The interrupt handle this multiplexer listens to.
    #[must_use]
    pub fn interrupt_handle(&self) -> WaitInterrupt {
        self.interrupt.clone()
    }

    /// Block until `stream` is readable, `deadline` elapses, or an interrupt arrives.
    ///
    /// `None` waits indefinitely. `WouldBlock` and `Interrupted` errors from the
    /// readiness poll are reported as [`WaitOutcome::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns any other I/O error raised while polling readiness.
    pub async fn wait(
        &self,
        stream: &AmqpStream,
        deadline: Option<Duration>,
    ) -> io::Result<WaitOutcome> {
        let select = async {
            tokio::select! {
                biased;
                () = self.interrupt.notified() => Ok(WaitOutcome::Interrupted),
                ready = stream.readable() => match ready {
                    Ok(()) => Ok(WaitOutcome::Ready),
                    Err(e) if is_transient(&e) => {
                        trace!(error = %e, "suppressed transient readiness error");
                        Ok(WaitOutcome::Interrupted)
                    }
                    Err(e) => Err(e),
                },
            }
        };

        match deadline {
            None => select.await,
            Some(deadline) => timeout(deadline, select)
                .await
                .unwrap_or(Ok(WaitOutcome::TimedOut)),
        }
    }

    /// Like [`wait`](Self::wait) with the deadline given as whole seconds plus microseconds.
    ///
    /// # Errors
    ///
    /// Returns any non-transient I/O error raised while polling readiness.
    pub async fn wait_parts(
        &self,
        stream: &AmqpStream,
        seconds: Option<u64>,
        micros: u32,
    ) -> io::Result<WaitOutcome> {
        let deadline =
            seconds.map(|s| Duration::from_secs(s) + Duration::from_micros(u64::from(micros)));
        self.wait(stream, deadline).await
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
