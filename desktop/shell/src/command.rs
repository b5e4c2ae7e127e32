use std::fmt;
use std::str::FromStr;

/// A line read from the host's stdin, standing in for UI interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// Window close button
    Close,
    /// Quit from the app menu
    Quit,
    Health,
    Status,
    /// The renderer stopped responding
    Unresponsive,
    /// Crash the host to exercise the panic hook
    Panic,
}

/// Input reaching the host loop from its reader threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Line(String),
    /// Stdin reached EOF
    Eof,
    /// OS signal number
    Signal(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown command '{}' (expected close, quit, health, status, unresponsive or panic)",
            self.0
        )
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for ShellCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "close" => Ok(Self::Close),
            "quit" | "exit" => Ok(Self::Quit),
            "health" => Ok(Self::Health),
            "status" => Ok(Self::Status),
            "unresponsive" => Ok(Self::Unresponsive),
            "panic" => Ok(Self::Panic),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}
