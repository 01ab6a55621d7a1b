pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

pub use crate::core::{DownloadRequest, Mode, Outcome, Reporter, SystemRunner, ToolRunner};
