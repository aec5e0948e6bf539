//! autosleepd - suspend the system after a period of user inactivity.
//!
//! The [`monitor::IdleMonitor`] loop is platform independent; idle detection
//! and suspend requests are injected through [`idle::IdleSource`] and
//! [`power::SuspendAction`].

pub mod config;
pub mod domain;
pub mod idle;
pub mod monitor;
pub mod power;
pub mod status;
