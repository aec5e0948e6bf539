//! Idle detection via the X11 MIT-SCREEN-SAVER extension.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use x11rb::connection::Connection;
use x11rb::protocol::screensaver::ConnectionExt as _;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use super::IdleError;
use super::IdleSource;

/// Idle source backed by `ScreenSaverQueryInfo` on the default root window.
pub struct X11Idle {
    conn: Arc<RustConnection>,
    root: Window,
}

impl X11Idle {
    /// Connect to `$DISPLAY` and check that the screensaver extension answers.
    pub fn connect() -> Result<Self, IdleError> {
        let (conn, screen_num) = x11rb::connect(None)
            .map_err(|e| IdleError::Unavailable(format!("Failed to connect to X server: {e}")))?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| IdleError::Unavailable(format!("X screen {screen_num} not found")))?;

        let version = conn
            .screensaver_query_version(1, 1)
            .map_err(|e| IdleError::Unavailable(format!("MIT-SCREEN-SAVER request failed: {e}")))?
            .reply()
            .map_err(|e| IdleError::Unavailable(format!("MIT-SCREEN-SAVER not available: {e}")))?;

        info!(
            "Using X11 MIT-SCREEN-SAVER {}.{}",
            version.server_major_version, version.server_minor_version
        );

        Ok(Self {
            conn: Arc::new(conn),
            root,
        })
    }
}

#[async_trait]
impl IdleSource for X11Idle {
    fn name(&self) -> &'static str {
        "x11"
    }

    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        let conn = Arc::clone(&self.conn);
        let root = self.root;

        // x11rb replies block the calling thread until the server answers.
        tokio::task::spawn_blocking(move || query_idle(&conn, root))
            .await
            .map_err(|e| IdleError::QueryFailed(format!("X11 query task failed: {e}")))?
    }
}

fn query_idle(conn: &RustConnection, root: Window) -> Result<Duration, IdleError> {
    let info = conn
        .screensaver_query_info(root)
        .map_err(|e| IdleError::QueryFailed(format!("ScreenSaverQueryInfo failed: {e}")))?
        .reply()
        .map_err(|e| IdleError::QueryFailed(format!("ScreenSaverQueryInfo reply: {e}")))?;

    Ok(Duration::from_millis(u64::from(info.ms_since_user_input)))
}
