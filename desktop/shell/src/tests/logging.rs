use crate::logging::{current_log_path, default_directives, logs_dir};

use sidecar::config::LoggingSettings;

use std::path::Path;

use googletest::prelude::*;

#[test]
fn given_default_settings_when_resolving_logs_dir_then_under_data_dir() {
    let settings = LoggingSettings::default();

    assert_that!(
        logs_dir(Path::new("/data"), &settings),
        eq(Path::new("/data/logs"))
    );
}

#[test]
fn given_settings_when_current_log_path_then_dated_file_with_prefix() {
    let settings = LoggingSettings::default();
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    let path = current_log_path(Path::new("/data"), &settings);

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert_that!(name, eq(&format!("sidecar-shell.{today}.log")));
}

#[test]
fn given_debug_level_when_building_filter_then_all_targets_use_it() {
    let settings = LoggingSettings {
        level: "debug".into(),
        ..LoggingSettings::default()
    };

    let directives = default_directives(&settings);

    assert_that!(directives, eq("debug,sidecar=debug,sidecar_shell=debug"));
}
