//! Utils module - logging setup and shared helpers

pub mod logging;
