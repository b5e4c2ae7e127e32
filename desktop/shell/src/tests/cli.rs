use crate::cli::{APP_DIR_NAME, Cli};

use std::path::PathBuf;

use clap::Parser;
use googletest::prelude::*;

#[test]
fn given_no_arguments_when_parsed_then_options_are_empty() {
    let cli = Cli::try_parse_from(["sidecar-shell"]).unwrap();

    assert_that!(cli.data_dir, none());
    assert_that!(cli.backend, none());
}

#[test]
fn given_data_dir_flag_when_resolved_then_used_verbatim() {
    let cli =
        Cli::try_parse_from(["sidecar-shell", "--data-dir", "/tmp/shell-data"]).unwrap();

    assert_that!(
        cli.resolve_data_dir(),
        some(eq(&PathBuf::from("/tmp/shell-data")))
    );
}

#[test]
fn given_no_data_dir_when_resolved_then_falls_back_to_platform_dir() {
    let cli = Cli::try_parse_from(["sidecar-shell"]).unwrap();

    let expected = dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME));
    assert_that!(cli.resolve_data_dir(), eq(&expected));
}

#[test]
fn given_backend_flag_when_parsed_then_path_is_kept() {
    let cli = Cli::try_parse_from(["sidecar-shell", "--backend", "/opt/app/backend"]).unwrap();

    assert_that!(cli.backend, some(eq(&PathBuf::from("/opt/app/backend"))));
}

#[test]
fn given_unknown_flag_when_parsed_then_rejected() {
    let result = Cli::try_parse_from(["sidecar-shell", "--port", "8000"]);

    assert_that!(result.is_err(), eq(true));
}
