//! start-line library crate

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod button;
pub mod display;
pub mod distance;
pub mod fix;
pub mod fs;
pub mod gis;
pub mod line;
pub mod options;
pub mod process;
pub mod receive;
pub mod reporting;
pub mod retry;
pub mod session;
pub mod task;
pub mod time;
pub mod velocity;
