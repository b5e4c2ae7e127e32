use crate::error::{Result as StubResult, StubError};

use std::io::IsTerminal;
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::{LevelFilter, info};

/// Initialize the stdout logger.
///
/// The supervisor captures stdout line by line, so colors are only used
/// when attached to a terminal.
pub fn initialize(level: LevelFilter) -> StubResult<()> {
    let colored = std::io::stdout().is_terminal();

    let dispatch = if colored {
        let colors = ColoredLevelConfig::new()
            .trace(Color::Magenta)
            .debug(Color::Blue)
            .info(Color::Green)
            .warn(Color::Yellow)
            .error(Color::Red);

        Dispatch::new().format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message}",
                date = humantime::format_rfc3339(SystemTime::now()),
                level = colors.color(record.level()),
            ))
        })
    } else {
        Dispatch::new().format(|out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message}",
                date = humantime::format_rfc3339(SystemTime::now()),
                level = record.level(),
            ))
        })
    };

    Dispatch::new()
        .level(level)
        .chain(dispatch.chain(std::io::stdout()))
        .apply()
        .map_err(|e| StubError::Logger {
            message: format!("Failed to initialize logger: {e}"),
        })?;

    info!("Logger initialized: level={level:?}");
    Ok(())
}
