//! Position fixes decoded from the `gpsd` report stream.

use chrono::{DateTime, Utc};
use gpsd_client::Tpv;
use serde::{Deserialize, Serialize};

use crate::gis::Position;

/// A timestamped position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Receiver time for this fix.
    pub time: DateTime<Utc>,
    /// Position of the receiver at `time`.
    pub position: Position,
}

/// Log of accepted fixes, in the order they were received.
#[derive(Debug, Default)]
pub struct FixLog {
    fixes: Vec<Fix>,
}

impl FixLog {
    /// Accept a fix out of a `TPV` report.
    ///
    /// Reports without a complete time and position are skipped, as are
    /// reports whose time does not advance past the previously accepted fix.
    /// Returns the accepted fix, if there was one.
    pub fn ingest(&mut self, report: &Tpv) -> Option<Fix> {
        let (time, latitude, longitude) = match (report.time, report.lat, report.lon) {
            (Some(time), Some(latitude), Some(longitude)) => (time, latitude, longitude),
            _ => {
                tracing::trace!("Skipping TPV report without a complete fix: {:?}", report);
                return None;
            }
        };

        if let Some(last) = self.fixes.last() {
            if time <= last.time {
                tracing::trace!(
                    "Skipping TPV report which does not advance past {}: {:?}",
                    last.time,
                    report
                );
                return None;
            }
        }

        let fix = Fix {
            time,
            position: Position::new(latitude, longitude),
        };
        self.fixes.push(fix);
        Some(fix)
    }

    /// The most recently accepted fix.
    pub fn latest(&self) -> Option<&Fix> {
        self.fixes.last()
    }

    /// All accepted fixes, oldest first.
    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }
}
