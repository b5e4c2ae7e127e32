mod cli;
mod logging;
