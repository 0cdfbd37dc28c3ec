//! See [`receive_fixes()`].

use std::{borrow::Cow, time::Duration};

use gpsd_client::{Gpsd, Report};
use tokio::sync::broadcast;

use crate::{
    retry::ExponentialBackoff, session::SharedSession, task::run_retry_log_errors, time,
};

#[derive(Debug)]
enum PollFixesError {
    Connection {
        error: gpsd_client::Error,
        message: Cow<'static, str>,
    },
    Unexpected(eyre::Error),
}

impl PollFixesError {
    /// Convert this error into an [`eyre::Error`].
    fn into_eyre(self) -> eyre::Error {
        match self {
            PollFixesError::Connection { .. } => self.into(),
            PollFixesError::Unexpected(error) => error,
        }
    }
}

impl std::error::Error for PollFixesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollFixesError::Connection { error, .. } => Some(error),
            PollFixesError::Unexpected(_) => None,
        }
    }
}

impl std::fmt::Display for PollFixesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollFixesError::Connection { message, .. } => {
                write!(f, "A gpsd connection error occurred: {}", message)
            }
            PollFixesError::Unexpected(error) => error.fmt(f),
        }
    }
}

impl From<eyre::Error> for PollFixesError {
    fn from(error: eyre::Error) -> Self {
        Self::Unexpected(error)
    }
}

fn map_gpsd_connection_error(
    error: gpsd_client::Error,
    message: impl Into<Cow<'static, str>>,
) -> PollFixesError {
    let message = message.into();
    match error {
        gpsd_client::Error::Connect { .. }
        | gpsd_client::Error::Io(_)
        | gpsd_client::Error::ConnectionClosed => PollFixesError::Connection { error, message },
        _ => PollFixesError::Unexpected(
            eyre::Error::from(error).wrap_err(format!("Unexpected gpsd error occurred: {}", message)),
        ),
    }
}

async fn receive_fixes_poll_reports(
    session: &SharedSession,
    gpsd: &mut Gpsd,
) -> Result<(), PollFixesError> {
    loop {
        let report = gpsd
            .next_report()
            .await
            .map_err(|error| map_gpsd_connection_error(error, "Error while reading gpsd report"))?;

        match report {
            Report::Tpv(tpv) => {
                let mut session = session.lock().await;
                if let Some(fix) = session.ingest(&tpv) {
                    tracing::trace!("Accepted fix: {:?}", fix);
                }
            }
            Report::Sky(sky) => {
                tracing::trace!("Satellite report: {:?}", sky);
            }
            Report::Devices(devices) => {
                tracing::debug!("Devices report: {:?}", devices);
            }
            Report::Watch(watch) => {
                tracing::debug!("Watch report: {:?}", watch);
            }
            Report::Version(version) => {
                tracing::debug!("Version report: {:?}", version);
            }
        }
    }
}

async fn receive_fixes_impl(
    session: &SharedSession,
    gpsd_address: &str,
    time: &dyn time::Port,
) -> eyre::Result<()> {
    let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60))
        .expect("Invalid backoff");
    loop {
        tracing::debug!("Starting receiving fixes job");
        let mut gpsd = match Gpsd::connect(gpsd_address).await {
            Ok(gpsd) => gpsd,
            Err(error) => {
                let error = map_gpsd_connection_error(
                    error,
                    format!("Error while connecting to gpsd at {}", gpsd_address),
                );
                match error {
                    PollFixesError::Connection { .. } => {
                        tracing::debug!(
                            "Retrying gpsd connection after anticipated connection error: {:?}",
                            error
                        );
                        backoff.sleep(time).await;
                        continue;
                    }
                    PollFixesError::Unexpected(_) => {
                        return Err(error.into_eyre().wrap_err("Error connecting to gpsd"));
                    }
                }
            }
        };
        backoff.reset();

        if let Some(version) = &gpsd.version {
            tracing::info!(
                "Connected to gpsd {} (protocol {}.{})",
                version.release,
                version.proto_major,
                version.proto_minor
            );
        }

        match receive_fixes_poll_reports(session, &mut gpsd).await {
            Ok(_) => {}
            Err(error) => match error {
                PollFixesError::Connection { .. } => {
                    tracing::debug!(
                        "Restarting gpsd session after anticipated connection error: {:?}",
                        error
                    );
                    backoff.sleep(time).await;
                    continue;
                }
                PollFixesError::Unexpected(_) => {
                    return Err(error
                        .into_eyre()
                        .wrap_err("Unexpected error while polling gpsd reports"))
                }
            },
        };

        break;
    }

    Ok(())
}

/// This function spawns a task to receive fixes from `gpsd`, and accumulate them into
/// the shared session.
#[tracing::instrument(skip(session, shutdown_rx, time))]
pub async fn receive_fixes(
    session: SharedSession,
    gpsd_address: &str,
    shutdown_rx: broadcast::Receiver<()>,
    time: &dyn time::Port,
) {
    run_retry_log_errors(
        move || {
            let session = session.clone();
            async move { receive_fixes_impl(&session, gpsd_address, time).await }
        },
        shutdown_rx,
        time,
    )
    .await;
}
