use crate::config::ShutdownSettings;
use crate::shutdown::ShutdownRequest;

use std::fmt;

/// Everything that can end the application's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    WindowClose,
    AppQuit,
    /// OS signal number (SIGINT, SIGTERM, SIGHUP)
    Signal(i32),
    UnhandledPanic,
    /// The UI stopped responding or crashed
    RendererUnresponsive,
}

impl ShutdownTrigger {
    /// Shutdown request this trigger issues.
    ///
    /// A panic skips the HTTP request and kills immediately; the caller
    /// bounds the whole stop with the panic budget.
    pub fn request(&self, settings: &ShutdownSettings) -> ShutdownRequest {
        match self {
            Self::UnhandledPanic => ShutdownRequest::immediate(),
            Self::WindowClose | Self::AppQuit | Self::Signal(_) | Self::RendererUnresponsive => {
                ShutdownRequest::graceful(settings.grace_timeout())
            }
        }
    }

    /// Process exit code once the shutdown triggered here has finished.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WindowClose | Self::AppQuit | Self::Signal(_) => 0,
            Self::UnhandledPanic | Self::RendererUnresponsive => 1,
        }
    }
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowClose => f.write_str("window close"),
            Self::AppQuit => f.write_str("app quit"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
            Self::UnhandledPanic => f.write_str("unhandled panic"),
            Self::RendererUnresponsive => f.write_str("unresponsive renderer"),
        }
    }
}
