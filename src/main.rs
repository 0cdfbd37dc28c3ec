use eyre::Context;
use start_line::{
    button::{self, watch_presses, StdinGateway},
    display::{self, Port as _},
    fs,
    options::{self, Options},
    process::process_marks_and_ticks,
    receive::receive_fixes,
    reporting, session, time,
};
use tokio::{
    signal::unix::SignalKind,
    sync::{broadcast, mpsc},
};
use tracing_appender::rolling::Rotation;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    reporting::setup_error_hooks()?;
    let options: &'static Options = Box::leak(Box::new(options::Options::initialize().await?));

    fs::create_dir_if_not_exists(&options.data_dir)
        .wrap_err_with(|| format!("Unable to create data directory {:?}", options.data_dir))?;

    let reporting_options: &'static reporting::Options = Box::leak(Box::new(reporting::Options {
        data_dir: options.data_dir.clone(),
        log_rotation: Rotation::DAILY,
    }));

    let _reporting_guard = reporting::setup_logging(reporting_options)?;

    let time: &'static time::Gateway = Box::leak(Box::new(time::Gateway));
    let display: &'static display::ConsoleGateway =
        Box::leak(Box::new(display::ConsoleGateway::new()));

    let session = session::shared();

    let (shutdown_tx, receive_fixes_shutdown_rx) = broadcast::channel::<()>(1);
    let watch_presses_shutdown_rx = shutdown_tx.subscribe();
    let process_shutdown_rx = shutdown_tx.subscribe();

    let (press_tx, press_rx) = mpsc::channel::<button::Press>(1);

    let ctrl_c_shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen to ctrl-c or SIGINT event");
        tracing::warn!("ctrl-c or SIGINT event detected, broadcasting shutdown");
        ctrl_c_shutdown_tx
            .send(())
            .expect("failed to send shutdown broadcast");
    });

    let sigterm_shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::unix::signal(SignalKind::terminate())
            .expect("failed to create SIGTERM signal listener")
            .recv()
            .await
            .expect("failed to listen to SIGTERM signal");
        tracing::warn!("SIGTERM signal detected, broadcasting shutdown");
        sigterm_shutdown_tx
            .send(())
            .expect("failed to send shutdown broadcast");
    });

    let receive_join = tokio::spawn(receive_fixes(
        session.clone(),
        &options.gpsd_address,
        receive_fixes_shutdown_rx,
        time,
    ));
    let presses_join = tokio::spawn(watch_presses(
        StdinGateway::new(),
        press_tx,
        watch_presses_shutdown_rx,
        time,
    ));
    let process_join = tokio::spawn(process_marks_and_ticks(
        session,
        press_rx,
        display,
        process_shutdown_rx,
        options,
        time,
    ));

    let receive_result = receive_join.await;
    let presses_result = presses_join.await;
    let process_result = process_join.await;

    // Every task which writes to the display has stopped by now.
    if let Err(error) = display.clear().await {
        tracing::error!("Error clearing the display: {:?}", error);
    }

    receive_result?;
    presses_result?;
    process_result?;

    Ok(())
}
