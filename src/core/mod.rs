//! Process-wide infrastructure.

pub mod logging;
