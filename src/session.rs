//! Session state shared between the receiving and processing tasks.

use std::sync::Arc;

use gpsd_client::Tpv;
use tokio::sync::Mutex;

use crate::fix::{Fix, FixLog};
use crate::gis::LocalScale;
use crate::line::{DefinedLine, MarkOutcome, StartLine};

/// Fixes and line state accumulated over one outing.
#[derive(Debug, Default)]
pub struct Session {
    fixes: FixLog,
    line: StartLine,
}

/// Handle to [`Session`] state shared between tasks.
pub type SharedSession = Arc<Mutex<Session>>;

/// Construct a new empty [`SharedSession`].
#[must_use]
pub fn shared() -> SharedSession {
    Arc::new(Mutex::new(Session::default()))
}

impl Session {
    /// Accept a fix out of `report` into the log. See [`FixLog::ingest()`].
    pub fn ingest(&mut self, report: &Tpv) -> Option<Fix> {
        self.fixes.ingest(report)
    }

    /// Mark the latest fix as a line point. Returns `None` when no fix has been
    /// received yet.
    pub fn mark_latest(&mut self, scale: &LocalScale) -> Option<MarkOutcome> {
        let fix = *self.fixes.latest()?;
        Some(self.line.mark(fix, scale))
    }

    /// The latest fix and the currently defined line, for one display refresh.
    pub fn snapshot(&self) -> (Option<Fix>, Option<DefinedLine>) {
        (self.fixes.latest().copied(), self.line.defined())
    }
}
