use thiserror::Error;

#[derive(Error, Debug)]
pub enum StubError {
    #[error("Environment variable error: {message}")]
    EnvVar { message: String },

    #[error("Logger error: {message}")]
    Logger { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StubError>;
