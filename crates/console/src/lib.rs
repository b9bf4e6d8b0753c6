//! Monitoring console: wires the local store, the REST client and the
//! live sync channel together.

pub mod app;
pub mod config;
