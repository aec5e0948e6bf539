//! Idle detection via systemd-logind `DBus` interface.
//!
//! Reads `IdleHint` and `IdleSinceHint` from the current session.
//!
//! logind computes these itself only for tty sessions. Graphical sessions
//! depend on an idle agent (gnome-session, ksmserver, swayidle with
//! `idlehint`, ...) calling `SetIdleHint`, and the agent flips the hint only
//! after its own idle delay. The measured time therefore lags real idleness
//! by that delay.

use std::env;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;
use zbus::Connection;

use super::IdleError;
use super::IdleSource;

/// `DBus` service and path for login1.
pub(crate) const LOGIND_SERVICE: &str = "org.freedesktop.login1";
pub(crate) const LOGIND_PATH: &str = "/org/freedesktop/login1";
pub(crate) const MANAGER_INTERFACE: &str = "org.freedesktop.login1.Manager";
const SESSION_INTERFACE: &str = "org.freedesktop.login1.Session";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Idle source backed by the logind session idle hint.
pub struct LogindIdle {
    conn: Connection,

    /// Session object path in `DBus`.
    session_path: String,
}

impl LogindIdle {
    /// Connect to the system bus and resolve the current session.
    pub async fn connect() -> Result<Self, IdleError> {
        let conn = Connection::system()
            .await
            .map_err(|e| IdleError::Unavailable(format!("Failed to connect to system DBus: {e}")))?;

        let session_path = resolve_session_path(&conn).await?;
        info!("Resolved logind session path: {}", session_path);

        let session_type = get_string_property(&conn, &session_path, "Type")
            .await
            .map_err(|e| IdleError::Unavailable(e.to_string()))?;
        let idle_hint = get_bool_property(&conn, &session_path, "IdleHint")
            .await
            .map_err(|e| IdleError::Unavailable(e.to_string()))?;
        let since_usec = get_u64_property(&conn, &session_path, "IdleSinceHint")
            .await
            .map_err(|e| IdleError::Unavailable(e.to_string()))?;

        check_idle_agent(&session_type, idle_hint, since_usec)?;

        if session_type != "tty" {
            warn!(
                "logind idle time for this {} session depends on the desktop's idle agent and starts counting only after its idle delay",
                session_type
            );
        }

        Ok(Self { conn, session_path })
    }
}

#[async_trait]
impl IdleSource for LogindIdle {
    fn name(&self) -> &'static str {
        "logind"
    }

    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        let idle = get_bool_property(&self.conn, &self.session_path, "IdleHint").await?;
        if !idle {
            trace!("IdleHint: false");
            return Ok(Duration::ZERO);
        }

        let since_usec = get_u64_property(&self.conn, &self.session_path, "IdleSinceHint").await?;
        idle_since(since_usec, SystemTime::now())
    }
}

/// Fail when nothing maintains the idle hint for this session.
///
/// tty sessions are tracked by logind from terminal activity. For any other
/// session an `IdleSinceHint` of zero with `IdleHint` unset means no agent has
/// ever reported, and the hint would read "active" forever.
fn check_idle_agent(session_type: &str, idle_hint: bool, since_usec: u64) -> Result<(), IdleError> {
    if session_type == "tty" || idle_hint || since_usec != 0 {
        return Ok(());
    }

    Err(IdleError::Unavailable(format!(
        "no idle agent has reported to logind for this {session_type} session; \
         run one that calls SetIdleHint or pick another idle backend"
    )))
}

/// Elapsed time since `IdleSinceHint` (microseconds since the Unix epoch).
///
/// A zero hint while idle carries no timestamp and is treated as a failed
/// measurement rather than "idle forever".
fn idle_since(since_usec: u64, now: SystemTime) -> Result<Duration, IdleError> {
    if since_usec == 0 {
        return Err(IdleError::QueryFailed(
            "IdleHint set but IdleSinceHint is zero".to_string(),
        ));
    }

    let now = now
        .duration_since(UNIX_EPOCH)
        .map_err(|e| IdleError::QueryFailed(format!("System clock before Unix epoch: {e}")))?;

    Ok(now.saturating_sub(Duration::from_micros(since_usec)))
}

/// Resolve the session object path for the current session.
async fn resolve_session_path(conn: &Connection) -> Result<String, IdleError> {
    // First try XDG_SESSION_ID if available
    if let Ok(session_id) = env::var("XDG_SESSION_ID") {
        debug!("Using XDG_SESSION_ID: {}", session_id);

        let proxy = zbus::Proxy::new(conn, LOGIND_SERVICE, LOGIND_PATH, MANAGER_INTERFACE)
            .await
            .map_err(|e| IdleError::Unavailable(format!("Failed to create Manager proxy: {e}")))?;

        let path: zbus::zvariant::OwnedObjectPath = proxy
            .call("GetSession", &(&session_id,))
            .await
            .map_err(|e| IdleError::Unavailable(format!("GetSession call failed: {e}")))?;

        return Ok(path.to_string());
    }

    debug!("XDG_SESSION_ID not set, trying to find current session");

    for alias in ["self", "auto"] {
        let path = format!("{LOGIND_PATH}/session/{alias}");
        if get_bool_property(conn, &path, "IdleHint").await.is_ok() {
            return Ok(path);
        }
    }

    Err(IdleError::Unavailable(
        "Could not resolve logind session. Set XDG_SESSION_ID or ensure a logind session is available."
            .to_string(),
    ))
}

/// Read a session property through `org.freedesktop.DBus.Properties.Get`.
async fn get_property(
    conn: &Connection,
    session_path: &str,
    name: &str,
) -> Result<zbus::zvariant::OwnedValue, IdleError> {
    let proxy = zbus::Proxy::new(conn, LOGIND_SERVICE, session_path, PROPERTIES_INTERFACE)
        .await
        .map_err(|e| IdleError::QueryFailed(format!("Failed to create Properties proxy: {e}")))?;

    proxy
        .call("Get", &(SESSION_INTERFACE, name))
        .await
        .map_err(|e| IdleError::QueryFailed(format!("Failed to get {name} property: {e}")))
}

async fn get_bool_property(conn: &Connection, session_path: &str, name: &str) -> Result<bool, IdleError> {
    let value = get_property(conn, session_path, name).await?;
    value
        .downcast_ref::<bool>()
        .map_err(|_| IdleError::QueryFailed(format!("{name} is not a boolean")))
}

async fn get_string_property(conn: &Connection, session_path: &str, name: &str) -> Result<String, IdleError> {
    let value = get_property(conn, session_path, name).await?;
    String::try_from(value).map_err(|_| IdleError::QueryFailed(format!("{name} is not a string")))
}

async fn get_u64_property(conn: &Connection, session_path: &str, name: &str) -> Result<u64, IdleError> {
    let value = get_property(conn, session_path, name).await?;
    value
        .downcast_ref::<u64>()
        .map_err(|_| IdleError::QueryFailed(format!("{name} is not a uint64")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_idle_since_elapsed() {
        let since = 1_000 * 1_000_000;
        let idle = idle_since(since, at(1_600)).unwrap();
        assert_eq!(idle, Duration::from_secs(600));
    }

    #[test]
    fn test_idle_since_future_hint_saturates() {
        let since = 2_000 * 1_000_000;
        let idle = idle_since(since, at(1_000)).unwrap();
        assert_eq!(idle, Duration::ZERO);
    }

    #[test]
    fn test_idle_since_zero_hint_is_failure() {
        let result = idle_since(0, at(1_000));
        assert!(matches!(result, Err(IdleError::QueryFailed(_))));
    }

    #[test]
    fn test_agent_missing_on_graphical_session() {
        for session_type in ["x11", "wayland", "unspecified"] {
            let result = check_idle_agent(session_type, false, 0);
            assert!(
                matches!(result, Err(IdleError::Unavailable(_))),
                "{session_type}"
            );
        }
    }

    #[test]
    fn test_agent_present() {
        assert!(check_idle_agent("wayland", false, 1_700_000_000_000_000).is_ok());
        assert!(check_idle_agent("x11", true, 1_700_000_000_000_000).is_ok());
        assert!(check_idle_agent("x11", true, 0).is_ok());
    }

    #[test]
    fn test_tty_session_needs_no_agent() {
        assert!(check_idle_agent("tty", false, 0).is_ok());
    }
}
