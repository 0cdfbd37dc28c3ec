//! Rendering readouts onto a two line character display.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::gis::Position;

/// What the display should currently show.
#[derive(Debug, Clone, PartialEq)]
pub enum Readout {
    /// The current position, shown while the line is undefined.
    Position(Position),
    /// Distance to the line and closing velocity.
    Line {
        /// Perpendicular distance to the line in metres.
        meters: f64,
        /// Closing velocity in metres per second, positive when approaching.
        velocity: f64,
    },
    /// A transient message, shown on the top line.
    Notice(String),
}

/// Render `readout` into two lines, each padded or truncated to exactly
/// `width` characters.
#[must_use]
pub fn render(readout: &Readout, width: usize) -> [String; 2] {
    let [top, bottom] = match readout {
        Readout::Position(position) => [
            format!("lat: {:.6}", position.latitude),
            format!("lon: {:.6}", position.longitude),
        ],
        Readout::Line { meters, velocity } => [
            format!(
                "{} m {} cm",
                *meters as i64,
                (meters.fract() * 100.0) as i64
            ),
            format!("{velocity:.3} m/s"),
        ],
        Readout::Notice(text) => [text.clone(), String::new()],
    };
    [fit(&top, width), fit(&bottom, width)]
}

/// Pad with spaces, or truncate, to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    format!("{truncated:<width$}")
}

/// Interface for accessing the display device.
/// See [`ConsoleGateway`] for implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Port: Send + Sync {
    /// Show `text` on the given display `line` (`1` is the top line).
    async fn display_line(&self, text: &str, line: u8) -> eyre::Result<()>;
    /// Blank the display.
    async fn clear(&self) -> eyre::Result<()>;
}

/// A display device which repaints both lines onto a single terminal row.
pub struct ConsoleGateway {
    lines: tokio::sync::Mutex<[String; 2]>,
}

impl ConsoleGateway {
    /// Construct a new [`ConsoleGateway`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: tokio::sync::Mutex::new([String::new(), String::new()]),
        }
    }
}

impl Default for ConsoleGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Port for ConsoleGateway {
    async fn display_line(&self, text: &str, line: u8) -> eyre::Result<()> {
        let mut lines = self.lines.lock().await;
        let index = usize::from(line.saturating_sub(1)).min(1);
        lines[index] = text.to_string();

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("\r{}  {}", lines[0], lines[1]).as_bytes())
            .await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn clear(&self) -> eyre::Result<()> {
        let mut lines = self.lines.lock().await;
        *lines = [String::new(), String::new()];

        let mut stdout = tokio::io::stdout();
        stdout.write_all(b"\r\x1b[K").await?;
        stdout.flush().await?;
        Ok(())
    }
}
