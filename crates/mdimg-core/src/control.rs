//! User interruption: a shared abort flag set from Ctrl-C.
//!
//! The flag is polled by curl's progress callback (aborting an in-flight
//! transfer), by backoff and pacing sleeps, and by the rewrite loop between
//! images. Nothing is killed mid-write; each layer notices the flag, cleans up
//! its partial file and returns [`Interrupted`].

use std::future::{poll_fn, Future};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::task::Poll;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned when work is stopped by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted by user")]
pub struct Interrupted;

/// Cloneable handle to an abort flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort; every clone observes it.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Interrupted)` once the flag is set.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_set() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration` in short slices, returning early on interrupt.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        const SLICE: Duration = Duration::from_millis(100);
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }
}

static CTRL_C_FLAG: OnceLock<InterruptFlag> = OnceLock::new();

/// Installs a Ctrl-C listener and returns the flag it sets.
///
/// Idempotent: later calls return the same flag. The first Ctrl-C sets the
/// flag so the run can save partial progress; a second one exits with 130.
/// The listener is registered before this returns.
pub fn install_interrupt_handler() -> InterruptFlag {
    CTRL_C_FLAG
        .get_or_init(|| {
            let flag = InterruptFlag::new();
            let (ready_tx, ready_rx) = mpsc::channel();
            let listener = flag.clone();
            let spawned = std::thread::Builder::new()
                .name("mdimg-ctrl-c".into())
                .spawn(move || listen_for_ctrl_c(listener, ready_tx));
            match spawned {
                Ok(_) => {
                    let _ = ready_rx.recv();
                }
                Err(e) => {
                    tracing::warn!(
                        "failed to start Ctrl-C listener: {}; Ctrl-C will not save progress",
                        e
                    );
                }
            }
            flag
        })
        .clone()
}

fn listen_for_ctrl_c(flag: InterruptFlag, ready: mpsc::Sender<()>) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!(
                "failed to build Ctrl-C runtime: {}; Ctrl-C will not save progress",
                e
            );
            let _ = ready.send(());
            return;
        }
    };
    rt.block_on(async move {
        let mut first = pin!(tokio::signal::ctrl_c());
        // The handler is registered on the first poll.
        let registered = poll_fn(|cx| Poll::Ready(first.as_mut().poll(cx))).await;
        let _ = ready.send(());
        let result = match registered {
            Poll::Ready(result) => result,
            Poll::Pending => first.await,
        };
        if let Err(e) = result {
            tracing::warn!(
                "failed to listen for Ctrl-C: {}; Ctrl-C will not save progress",
                e
            );
            return;
        }
        tracing::info!("Ctrl-C received, stopping after the current image");
        flag.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("second Ctrl-C, exiting");
            std::process::exit(130);
        }
    });
}
