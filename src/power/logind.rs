//! Suspend via systemd-logind `Manager.Suspend`.

use async_trait::async_trait;
use tracing::debug;
use tracing::info;
use zbus::Connection;

use super::SuspendAction;
use super::SuspendError;
use crate::idle::logind::LOGIND_PATH;
use crate::idle::logind::LOGIND_SERVICE;
use crate::idle::logind::MANAGER_INTERFACE;

/// Suspend through the logind manager on the system bus.
pub struct LogindSuspend {
    conn: Connection,
}

impl LogindSuspend {
    /// Connect and check `CanSuspend`.
    pub async fn connect() -> Result<Self, SuspendError> {
        let conn = Connection::system()
            .await
            .map_err(|e| SuspendError::Unavailable(format!("Failed to connect to system DBus: {e}")))?;

        let proxy = manager_proxy(&conn)
            .await
            .map_err(|e| SuspendError::Unavailable(e.to_string()))?;

        let answer: String = proxy
            .call("CanSuspend", &())
            .await
            .map_err(|e| SuspendError::Unavailable(format!("CanSuspend call failed: {e}")))?;

        debug!("logind CanSuspend: {}", answer);
        if !can_suspend(&answer) {
            return Err(SuspendError::Unavailable(format!(
                "logind reports CanSuspend={answer}"
            )));
        }

        Ok(Self { conn })
    }
}

#[async_trait]
impl SuspendAction for LogindSuspend {
    fn name(&self) -> &'static str {
        "logind"
    }

    async fn suspend(&mut self) -> Result<(), SuspendError> {
        info!("Requesting suspend via logind");

        let proxy = manager_proxy(&self.conn)
            .await
            .map_err(|e| SuspendError::RequestFailed(e.to_string()))?;

        // interactive=false: never block on a polkit prompt.
        proxy
            .call_method("Suspend", &(false,))
            .await
            .map_err(|e| SuspendError::RequestFailed(format!("Suspend call failed: {e}")))?;

        Ok(())
    }
}

async fn manager_proxy(conn: &Connection) -> Result<zbus::Proxy<'static>, String> {
    zbus::Proxy::new(conn, LOGIND_SERVICE, LOGIND_PATH, MANAGER_INTERFACE)
        .await
        .map_err(|e| format!("Failed to create Manager proxy: {e}"))
}

/// `yes` and `challenge` mean the request can be made; `no` and `na` mean it cannot.
fn can_suspend(answer: &str) -> bool {
    matches!(answer, "yes" | "challenge")
}
