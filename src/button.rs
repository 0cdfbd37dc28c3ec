//! Mark button input and debouncing.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use eyre::Context;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::{broadcast, mpsc, Mutex},
};

use crate::{task::run_retry_log_errors, time};

/// A press of the mark button.
#[derive(Debug, Clone, Copy)]
pub struct Press {
    /// When the press was observed.
    pub at: Instant,
}

/// Interface for accessing the mark button.
/// See [`StdinGateway`] for implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Port: Send {
    /// Wait for the next button press.
    async fn next_press(&mut self) -> eyre::Result<()>;
}

/// Implementation of [`Port`] which treats each line read from stdin as one
/// button press.
pub struct StdinGateway {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinGateway {
    /// Construct a new [`StdinGateway`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Port for StdinGateway {
    async fn next_press(&mut self) -> eyre::Result<()> {
        match self
            .lines
            .next_line()
            .await
            .wrap_err("Error reading button press from stdin")?
        {
            Some(_) => Ok(()),
            // stdin has closed, no further presses are coming.
            None => futures::future::pending().await,
        }
    }
}

/// Suppresses presses which arrive within `window` of the last accepted press.
#[derive(Debug)]
pub struct Debounce {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debounce {
    /// Construct a new [`Debounce`] with the given refractory `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Whether a press observed at `at` should be acted on. Accepting a press
    /// starts a new refractory window.
    pub fn accept(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if at.duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(at);
        true
    }
}

async fn watch_presses_impl(
    button: &mut dyn Port,
    press_tx: &mpsc::Sender<Press>,
    time: &dyn time::Port,
) -> eyre::Result<()> {
    loop {
        button.next_press().await?;
        let press = Press { at: time.now() };
        match press_tx.try_send(press) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Dropping button press, a previous press is still pending");
            }
            Err(error @ mpsc::error::TrySendError::Closed(_)) => {
                return Err(error).wrap_err("Button press channel is closed");
            }
        }
    }
}

/// This function spawns a task to watch the mark button, and submit presses for
/// processing. Presses which arrive while a previous press is still pending are
/// dropped.
#[tracing::instrument(skip(button, press_tx, shutdown_rx, time))]
pub async fn watch_presses<B>(
    button: B,
    press_tx: mpsc::Sender<Press>,
    shutdown_rx: broadcast::Receiver<()>,
    time: &dyn time::Port,
) where
    B: Port + 'static,
{
    let button = Arc::new(Mutex::new(button));
    run_retry_log_errors(
        move || {
            let button = button.clone();
            let press_tx = press_tx.clone();
            async move {
                let mut button = button.lock().await;
                watch_presses_impl(&mut *button, &press_tx, time).await
            }
        },
        shutdown_rx,
        time,
    )
    .await;
}
