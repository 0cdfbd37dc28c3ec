//! See [`process_marks_and_ticks()`].

use std::{sync::Arc, time::Duration};

use eyre::Context;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::{
    button::{Debounce, Press},
    display::{self, Readout},
    distance::distance_to_line,
    fix::Fix,
    gis::LocalScale,
    line::{DefinedLine, MarkOutcome},
    options::Options,
    session::SharedSession,
    task::run_retry_log_errors,
    time,
    velocity::VelocityEstimator,
};

/// How long a transient notice stays on the display before the next refresh
/// overwrites it.
const NOTICE_HOLD: Duration = Duration::from_secs(1);

struct ProcessState {
    press_rx: mpsc::Receiver<Press>,
    estimator: VelocityEstimator,
    debounce: Debounce,
}

/// Pick what the display should show for the current session state, updating
/// the velocity estimate when the line is defined.
fn current_readout(
    fix: Option<Fix>,
    line: Option<DefinedLine>,
    estimator: &mut VelocityEstimator,
    scale: &LocalScale,
) -> Readout {
    match (fix, line) {
        (Some(fix), Some(line)) => {
            let meters = distance_to_line(&line, fix.position, scale);
            let velocity = estimator.update(fix.time, meters);
            Readout::Line { meters, velocity }
        }
        (Some(fix), None) => Readout::Position(fix.position),
        (None, _) => Readout::Notice("Waiting for fix".to_string()),
    }
}

async fn show(display: &dyn display::Port, readout: &Readout, width: usize) -> eyre::Result<()> {
    let [top, bottom] = display::render(readout, width);
    display.display_line(&top, 1).await?;
    display.display_line(&bottom, 2).await?;
    Ok(())
}

async fn handle_press(
    press: Press,
    session: &SharedSession,
    debounce: &mut Debounce,
    display: &dyn display::Port,
    options: &Options,
    time: &dyn time::Port,
) -> eyre::Result<()> {
    if !debounce.accept(press.at) {
        tracing::trace!("Ignoring button press within the debounce window");
        return Ok(());
    }

    let outcome = session.lock().await.mark_latest(&options.scale);
    let notice = match outcome {
        Some(MarkOutcome::Set(mark)) => {
            let mark_json = serde_json::to_string(&mark).wrap_err("Error serializing line mark")?;
            tracing::info!("Line mark recorded: {}", mark_json);
            "Point set."
        }
        Some(MarkOutcome::AlreadySet) => {
            tracing::debug!("Button pressed again with no new position");
            "Already set."
        }
        None => {
            tracing::debug!("Button pressed before the first fix arrived");
            "No fix yet."
        }
    };

    show(
        display,
        &Readout::Notice(notice.to_string()),
        options.display_width,
    )
    .await?;
    time.async_sleep(NOTICE_HOLD).await;
    Ok(())
}

async fn process_marks_and_ticks_impl(
    session: &SharedSession,
    state: &mut ProcessState,
    display: &dyn display::Port,
    options: &Options,
    time: &dyn time::Port,
) -> eyre::Result<()> {
    let ProcessState {
        press_rx,
        estimator,
        debounce,
    } = state;
    loop {
        let (fix, line) = session.lock().await.snapshot();
        let readout = current_readout(fix, line, estimator, &options.scale);
        show(display, &readout, options.display_width).await?;

        // Refresh faster once there is a line to measure against.
        let tick = if line.is_some() {
            Duration::from_millis(options.active_tick_ms)
        } else {
            Duration::from_millis(options.idle_tick_ms)
        };

        tokio::select! {
            press = press_rx.recv() => {
                let press = press.ok_or_else(|| eyre::eyre!("Button press channel is closed"))?;
                handle_press(press, session, debounce, display, options, time).await?;
            }
            _ = time.async_sleep(tick) => {}
        }
    }
}

/// This function spawns a task which owns the display, refreshing the readout on a
/// timer and recording a line mark whenever the button is pressed.
#[tracing::instrument(skip(session, press_rx, display, shutdown_rx, options, time))]
pub async fn process_marks_and_ticks(
    session: SharedSession,
    press_rx: mpsc::Receiver<Press>,
    display: &dyn display::Port,
    shutdown_rx: broadcast::Receiver<()>,
    options: &Options,
    time: &dyn time::Port,
) {
    tracing::debug!("Starting compute and display job");
    let state = Arc::new(Mutex::new(ProcessState {
        press_rx,
        estimator: VelocityEstimator::new(options.distance_window, options.rate_window),
        debounce: Debounce::new(Duration::from_millis(options.debounce_ms)),
    }));
    run_retry_log_errors(
        move || {
            let state = state.clone();
            let session = session.clone();
            async move {
                let mut state = state.lock().await;
                process_marks_and_ticks_impl(&session, &mut state, display, options, time).await
            }
        },
        shutdown_rx,
        time,
    )
    .await;
}
