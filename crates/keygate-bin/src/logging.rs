// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;
use crate::error::{BinError, BinResult};

/// Noisy dependencies are capped regardless of the requested level.
const DEPENDENCY_DIRECTIVES: &str = "hyper=warn,tower=warn,tower_http=info,axum=info";

/// Initializes the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// ```ignore
/// use keygate_bin::logging::init_logging;
/// use keygate_bin::cli::LogFormat;
///
/// init_logging("info", LogFormat::Text, true)?;
/// ```
pub fn init_logging(level: &str, format: LogFormat, with_target: bool) -> BinResult<()> {
    let filter = build_filter(level)?;

    let result = match format {
        LogFormat::Text => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(with_target)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(is_terminal),
                )
                .try_init()
        }
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(with_target)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).with_ansi(false))
            .try_init(),
    };

    result.map_err(|e| BinError::init(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(level: &str) -> BinResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let level = normalize_level(level)
        .ok_or_else(|| BinError::invalid_input(format!("Unknown log level '{}'", level)))?;
    EnvFilter::try_new(format!("{},{}", level, DEPENDENCY_DIRECTIVES))
        .map_err(|e| BinError::init(format!("Invalid log filter: {}", e)))
}

/// Maps a user-supplied level to a filter directive.
pub fn normalize_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}
