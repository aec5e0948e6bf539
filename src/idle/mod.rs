//! Idle time detection.
//!
//! Each backend reports the time elapsed since the last keyboard or pointer
//! input. Backends are constructed once at startup; construction failing with
//! [`IdleError::Unavailable`] means this host cannot be monitored at all.

#[cfg(target_os = "linux")]
pub mod logind;
#[cfg(windows)]
pub mod windows;
#[cfg(target_os = "linux")]
pub mod x11;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
#[cfg(target_os = "linux")]
use tracing::info;

use crate::config::IdleBackend;

/// Trait for idle time sources.
///
/// `idle_time` must not block the runtime thread. Backends with synchronous
/// round trips run them through `tokio::task::spawn_blocking` so the caller's
/// timeout and cancellation stay effective.
#[async_trait]
pub trait IdleSource: Send {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Time elapsed since the last user input.
    async fn idle_time(&mut self) -> Result<Duration, IdleError>;
}

/// Errors that can occur in idle detection.
#[derive(Error, Debug)]
pub enum IdleError {
    /// The backend cannot work on this host.
    #[error("Idle detection unavailable: {0}")]
    Unavailable(String),

    /// A single query failed; later queries may succeed.
    #[error("Idle query failed: {0}")]
    QueryFailed(String),
}

/// Open the requested idle backend.
pub async fn open(backend: IdleBackend) -> Result<Box<dyn IdleSource>, IdleError> {
    debug!("Opening idle backend: {:?}", backend);

    match backend {
        IdleBackend::Auto => open_auto().await,
        IdleBackend::Logind => open_logind().await,
        IdleBackend::X11 => open_x11(),
        IdleBackend::Windows => open_windows(),
    }
}

#[cfg(target_os = "linux")]
async fn open_auto() -> Result<Box<dyn IdleSource>, IdleError> {
    let display = std::env::var_os("DISPLAY").is_some();
    let wayland_display = std::env::var_os("WAYLAND_DISPLAY").is_some();
    let session_type = std::env::var("XDG_SESSION_TYPE").ok();

    if prefer_x11(display, wayland_display, session_type.as_deref()) {
        match open_x11() {
            Ok(source) => return Ok(source),
            Err(e) => info!("X11 idle backend not usable ({}), trying logind", e),
        }
    } else if display {
        // XWayland only sees input delivered to X clients.
        info!(
            "Wayland session detected (WAYLAND_DISPLAY set: {}, XDG_SESSION_TYPE={}); skipping X11 idle backend",
            wayland_display,
            session_type.as_deref().unwrap_or("unset")
        );
    }
    open_logind().await
}

/// Whether `auto` should try the X11 backend.
///
/// Under Wayland, `DISPLAY` points at XWayland, whose idle counter ignores
/// input to native Wayland clients and would keep growing while the user works.
#[cfg(target_os = "linux")]
fn prefer_x11(display: bool, wayland_display: bool, session_type: Option<&str>) -> bool {
    if !display || wayland_display {
        return false;
    }
    !session_type.is_some_and(|t| t.eq_ignore_ascii_case("wayland"))
}

#[cfg(windows)]
async fn open_auto() -> Result<Box<dyn IdleSource>, IdleError> {
    open_windows()
}

#[cfg(not(any(target_os = "linux", windows)))]
async fn open_auto() -> Result<Box<dyn IdleSource>, IdleError> {
    Err(unsupported("any idle backend"))
}

#[cfg(target_os = "linux")]
async fn open_logind() -> Result<Box<dyn IdleSource>, IdleError> {
    Ok(Box::new(logind::LogindIdle::connect().await?))
}

#[cfg(not(target_os = "linux"))]
async fn open_logind() -> Result<Box<dyn IdleSource>, IdleError> {
    Err(unsupported("logind"))
}

#[cfg(target_os = "linux")]
fn open_x11() -> Result<Box<dyn IdleSource>, IdleError> {
    Ok(Box::new(x11::X11Idle::connect()?))
}

#[cfg(not(target_os = "linux"))]
fn open_x11() -> Result<Box<dyn IdleSource>, IdleError> {
    Err(unsupported("x11"))
}

#[cfg(windows)]
fn open_windows() -> Result<Box<dyn IdleSource>, IdleError> {
    Ok(Box::new(windows::WindowsIdle::new()?))
}

#[cfg(not(windows))]
fn open_windows() -> Result<Box<dyn IdleSource>, IdleError> {
    Err(unsupported("windows"))
}

fn unsupported(backend: &str) -> IdleError {
    IdleError::Unavailable(format!(
        "{backend} idle detection is not supported on {}",
        std::env::consts::OS
    ))
}
