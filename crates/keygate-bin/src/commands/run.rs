// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::info;

use crate::cli::{Cli, LogFormat, RunArgs};
use crate::error::BinResult;
use crate::logging::init_logging;
use crate::runtime::RuntimeBuilder;

/// Loads configuration, initializes logging and serves until shutdown.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let runtime = RuntimeBuilder::new()
        .config_path(&cli.config)
        .port(args.port)
        .seed_file(args.seed)
        .build()?;

    let logging = &runtime.config().logging;
    let level = cli
        .forced_log_level()
        .unwrap_or_else(|| logging.level.as_str())
        .to_string();
    let format = cli.log_format.unwrap_or_else(|| LogFormat::from(logging.format));
    init_logging(&level, format, logging.with_target)?;

    info!(config = %cli.config.display(), "Configuration loaded");

    runtime.run().await
}
