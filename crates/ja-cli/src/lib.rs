//! CLI library components for `ja-prep`.

pub mod cli;
pub mod config;
pub mod logging;
