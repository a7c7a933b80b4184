// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub const LOG_ENV: &str = "MIKAPI_LOG";

/// Routes `tracing` events to `path` through a background writer. The
/// terminal belongs to the TUI, so nothing is written to stdout or stderr.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(path: &Path, configured_level: &str) -> Result<WorkerGuard> {
    let directives = filter_directives(env::var(LOG_ENV).ok(), configured_level);
    let filter = EnvFilter::try_new(&directives).with_context(|| {
        format!("invalid log filter {directives:?} -- check {LOG_ENV} or [log] level")
    })?;

    let (dir, file_name) = split_log_path(path)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("install log subscriber")?;

    Ok(guard)
}

/// `MIKAPI_LOG` wins when set to something non-blank.
fn filter_directives(from_env: Option<String>, configured_level: &str) -> String {
    from_env
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| configured_level.trim().to_owned())
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log path {} has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir, file_name))
}
