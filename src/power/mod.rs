//! Power state transitions.
//!
//! A [`SuspendAction`] asks the host to enter sleep. The request only has to be
//! accepted; the caller does not observe the transition itself.

pub mod command;
#[cfg(target_os = "linux")]
pub mod logind;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::config::Config;
use crate::config::SuspendMethod;
pub use command::CommandSuspend;

/// Trait for suspend requests.
#[async_trait]
pub trait SuspendAction: Send {
    /// Short method name for logs.
    fn name(&self) -> &'static str;

    /// Ask the OS to suspend.
    async fn suspend(&mut self) -> Result<(), SuspendError>;
}

/// Errors that can occur when requesting suspend.
#[derive(Error, Debug)]
pub enum SuspendError {
    /// The method cannot work on this host.
    #[error("Suspend unavailable: {0}")]
    Unavailable(String),

    /// The OS refused or the request could not be delivered.
    #[error("Suspend request failed: {0}")]
    RequestFailed(String),
}

/// Logs the request instead of performing it.
pub struct DryRunSuspend {
    inner: Box<dyn SuspendAction>,
}

impl DryRunSuspend {
    pub fn new(inner: Box<dyn SuspendAction>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SuspendAction for DryRunSuspend {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn suspend(&mut self) -> Result<(), SuspendError> {
        info!("[DRY RUN] Would suspend via {}", self.inner.name());
        Ok(())
    }
}

/// Build the suspend action described by the configuration.
pub async fn open(config: &Config) -> Result<Box<dyn SuspendAction>, SuspendError> {
    debug!("Opening suspend method: {:?}", config.suspend_method);

    let action: Box<dyn SuspendAction> = match config.suspend_method {
        SuspendMethod::Auto => open_auto(config).await?,
        SuspendMethod::Logind => open_logind().await?,
        SuspendMethod::Command => Box::new(command_for(config)?),
    };

    if config.dry_run {
        return Ok(Box::new(DryRunSuspend::new(action)));
    }
    Ok(action)
}

fn command_for(config: &Config) -> Result<CommandSuspend, SuspendError> {
    match config.suspend_command {
        Some(ref argv) => CommandSuspend::from_argv(argv),
        None => CommandSuspend::platform_default(),
    }
}

#[cfg(target_os = "linux")]
async fn open_auto(config: &Config) -> Result<Box<dyn SuspendAction>, SuspendError> {
    if config.suspend_command.is_some() {
        return Ok(Box::new(command_for(config)?));
    }
    match logind::LogindSuspend::connect().await {
        Ok(action) => Ok(Box::new(action)),
        Err(e) => {
            info!("logind suspend not usable ({}), falling back to command", e);
            Ok(Box::new(command_for(config)?))
        }
    }
}

#[cfg(not(target_os = "linux"))]
async fn open_auto(config: &Config) -> Result<Box<dyn SuspendAction>, SuspendError> {
    Ok(Box::new(command_for(config)?))
}

#[cfg(target_os = "linux")]
async fn open_logind() -> Result<Box<dyn SuspendAction>, SuspendError> {
    Ok(Box::new(logind::LogindSuspend::connect().await?))
}

#[cfg(not(target_os = "linux"))]
async fn open_logind() -> Result<Box<dyn SuspendAction>, SuspendError> {
    Err(SuspendError::Unavailable(format!(
        "logind suspend is not supported on {}",
        std::env::consts::OS
    )))
}
