use std::path::PathBuf;

use clap::Parser;

pub const APP_DIR_NAME: &str = "sidecar-shell";

#[derive(Debug, Parser)]
#[command(name = "sidecar-shell")]
#[command(about = "Headless desktop host supervising a sidecar HTTP backend")]
#[command(version)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,

    /// Backend executable, overriding `backend.executable` from config.toml
    #[arg(long)]
    pub(crate) backend: Option<PathBuf>,
}

impl Cli {
    /// Explicit `--data-dir`, else `<platform data dir>/sidecar-shell`.
    pub fn resolve_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME)))
    }
}
