//! Statusboard - single-process operational dashboard
//!
//! Live status, a small ring of recent log entries and an editable runtime
//! configuration, all owned by one state controller task and served over
//! HTTP.

pub mod app;
pub mod config;
pub mod controller;
pub mod logging;
pub mod server;
pub mod severity;
pub mod state;
pub mod timers;
