use std::path::{Path, PathBuf};

use color_eyre::Help;
use eyre::Context;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::gis::LocalScale;

/// Global options for the application.
#[derive(Debug, Serialize, Deserialize)]
pub struct Options {
    /// Address of the `gpsd` daemon to read fixes from.
    ///
    /// Default is `localhost:2947`.
    #[serde(default = "default_gpsd_address")]
    pub gpsd_address: String,
    /// Metres per degree of latitude/longitude used to project positions into
    /// the local frame.
    #[serde(default)]
    pub scale: LocalScale,
    /// Width of one display line in characters.
    ///
    /// Default is `16`.
    #[serde(default = "default_display_width")]
    pub display_width: usize,
    /// How many distance samples are kept for estimating velocity.
    ///
    /// Default is `2`.
    #[serde(default = "default_distance_window")]
    pub distance_window: usize,
    /// How many rates of change are averaged into the velocity estimate.
    ///
    /// Default is `3`.
    #[serde(default = "default_rate_window")]
    pub rate_window: usize,
    /// Minimum number of milliseconds between two accepted button presses.
    ///
    /// Default is `2000`.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Display refresh interval in milliseconds while no line is defined.
    ///
    /// Default is `1000`.
    #[serde(default = "default_idle_tick_ms")]
    pub idle_tick_ms: u64,
    /// Display refresh interval in milliseconds once the line is defined.
    ///
    /// Default is `500`.
    #[serde(default = "default_active_tick_ms")]
    pub active_tick_ms: u64,
    /// Directory where application data is stored (including logs).
    ///
    /// Default is `data`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_gpsd_address() -> String {
    "localhost:2947".to_string()
}

fn default_display_width() -> usize {
    16
}

fn default_distance_window() -> usize {
    2
}

fn default_rate_window() -> usize {
    3
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_idle_tick_ms() -> u64 {
    1000
}

fn default_active_tick_ms() -> u64 {
    500
}

fn default_data_dir() -> PathBuf {
    "data".into()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            gpsd_address: default_gpsd_address(),
            scale: LocalScale::default(),
            display_width: default_display_width(),
            distance_window: default_distance_window(),
            rate_window: default_rate_window(),
            debounce_ms: default_debounce_ms(),
            idle_tick_ms: default_idle_tick_ms(),
            active_tick_ms: default_active_tick_ms(),
            data_dir: default_data_dir(),
        }
    }
}

impl Options {
    /// Initialize the options using the `OPTIONS` environment variable, otherwise load from file
    /// `options.ron` by default. If `OPTIONS` contains a file path, it will load the options from
    /// that path, if `OPTIONS` contains a RON file definition then it will load the options from
    /// the string contained in the variable. Falls back to the default options when neither is
    /// present.
    pub async fn initialize() -> eyre::Result<Self> {
        let options_result = match std::env::var("OPTIONS") {
            Ok(options) => match ron::from_str(&options) {
                Ok(options) => {
                    println!("Options loaded from `OPTIONS` environment variable");
                    Ok(options)
                }
                Err(error) => {
                    let path = PathBuf::from(options);
                    if path.is_file() {
                        let options_str = tokio::fs::read_to_string(&path).await?;
                        let options: Options = ron::from_str(&options_str).wrap_err_with(|| {
                            format!("Error deserializing options file: {:?}", path)
                        })?;
                        println!("Options loaded from file specified in `OPTIONS` environment variable: {:?}", path);
                        Ok(options)
                    } else {
                        Err(error)
                            .wrap_err(
                                "Error deserializing options from `OPTIONS` environment variable \
                                string, or you have specified a file path which does not exist",
                            )
                            .suggestion(
                                "Specify options in RON format, or as a path to an options file.",
                            )
                    }
                }
            },
            Err(std::env::VarError::NotPresent) => {
                let path = Path::new("options.ron");
                if path.is_file() {
                    let options_str = tokio::fs::read_to_string(&path).await?;
                    let options = ron::from_str(&options_str)
                        .wrap_err_with(|| format!("Error deserializing options file: {:?}", path));
                    println!("Options loaded from default file: {:?}", path);
                    options
                } else {
                    println!(
                        "No `OPTIONS` environment variable or `options.ron` file found, \
                        using the default options"
                    );
                    Ok(Options::default())
                }
            }
            Err(error) => {
                return Err(error).wrap_err("Error reading `OPTIONS` environment variable")
            }
        };

        if let Ok(options) = &options_result {
            let options_str = ron::ser::to_string_pretty(options, PrettyConfig::default())?;
            println!("Options{}", options_str)
        }

        options_result
    }
}
