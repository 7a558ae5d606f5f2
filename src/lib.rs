#![deny(missing_docs)]
//! Home Guard bot library.
//!
//! Routes Telegram commands and menu callbacks to a small set of actions,
//! and runs the periodic PIR motion check that photographs intruders.

/// Telegram transport adapter.
pub mod bot;
/// Single capture-and-send routine shared by commands and detection.
pub mod capture;
/// Configuration management.
pub mod config;
/// Application context built once at startup.
pub mod context;
/// Periodic motion detection job.
pub mod detection;
/// Command and callback routing with the owner gate.
pub mod dispatch;
/// Action failures.
pub mod error;
/// Motion sensor and camera collaborators.
pub mod hardware;
/// Log filter and secret redaction.
pub mod logging;
/// Outbound messaging interface.
pub mod transport;

#[cfg(test)]
pub mod testing;
