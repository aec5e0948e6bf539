//! Idle detection via Win32 `GetLastInputInfo`.

use std::time::Duration;

use async_trait::async_trait;
use windows_sys::Win32::System::SystemInformation::GetTickCount;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::GetLastInputInfo;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::LASTINPUTINFO;

use super::IdleError;
use super::IdleSource;

/// Idle source backed by the session's last input tick.
pub struct WindowsIdle;

impl WindowsIdle {
    /// Probe `GetLastInputInfo` once so an unusable session fails at startup.
    pub fn new() -> Result<Self, IdleError> {
        last_input_tick().map_err(|e| IdleError::Unavailable(e.to_string()))?;
        Ok(Self)
    }
}

#[async_trait]
impl IdleSource for WindowsIdle {
    fn name(&self) -> &'static str {
        "windows"
    }

    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        let last_input = last_input_tick()?;
        // SAFETY: GetTickCount has no preconditions.
        let now = unsafe { GetTickCount() };
        Ok(elapsed_ticks(now, last_input))
    }
}

fn last_input_tick() -> Result<u32, IdleError> {
    let mut lii = LASTINPUTINFO {
        cbSize: u32::try_from(std::mem::size_of::<LASTINPUTINFO>()).unwrap_or(8),
        dwTime: 0,
    };

    // SAFETY: lii is a valid, initialised LASTINPUTINFO with cbSize set.
    if unsafe { GetLastInputInfo(&mut lii) } == 0 {
        return Err(IdleError::QueryFailed(format!(
            "GetLastInputInfo failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    Ok(lii.dwTime)
}

/// Both ticks are 32-bit millisecond counters that wrap every ~49.7 days.
fn elapsed_ticks(now: u32, last_input: u32) -> Duration {
    Duration::from_millis(u64::from(now.wrapping_sub(last_input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_ticks() {
        assert_eq!(elapsed_ticks(10_000, 4_000), Duration::from_secs(6));
    }

    #[test]
    fn test_elapsed_ticks_wraps() {
        assert_eq!(elapsed_ticks(500, u32::MAX - 499), Duration::from_millis(1_000));
    }
}
