// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use keygate_config::{KeygateConfig, SecretValue};
use keygate_core::crypto::KeySourceMode;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Loads and validates the configuration, then prints a summary.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = keygate_config::load_config(config_path)
        .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;

    let warnings = collect_warnings(&config);
    let printable = redacted(&config);

    match args.format {
        OutputFormat::Text => {
            println!("Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Service:        {}", config.service.name);
            println!("  Key source:     {}", config.keys.source);
            println!("  Direct key:     {} bytes", config.keys.direct_key_length);
            println!("  Static records: {}", config.keys.static_records.len());
            println!(
                "  Seed file:      {}",
                config
                    .store
                    .seed_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!(
                "  API:            {}",
                if config.api.enabled {
                    config.api.socket_addr().to_string()
                } else {
                    "disabled".to_string()
                }
            );

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", serde_json::to_string_pretty(&printable).map_err(|e| {
                    BinError::runtime(format!("Failed to serialize configuration: {}", e))
                })?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "service": config.service.name,
                    "key_source": config.keys.source,
                    "direct_key_length": config.keys.direct_key_length,
                    "static_records": config.keys.static_records.len(),
                    "seed_file": config.store.seed_file,
                    "api_enabled": config.api.enabled,
                    "api_address": config.api.socket_addr().to_string(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&printable) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output).map_err(|e| {
                BinError::runtime(format!("Failed to serialize output: {}", e))
            })?);
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

/// Returns a copy safe to print, with key material masked.
fn redacted(config: &KeygateConfig) -> KeygateConfig {
    let mut copy = config.clone();
    for record in &mut copy.keys.static_records {
        record.material = SecretValue::new(record.material.to_string());
    }
    copy
}

/// Returns non-fatal findings about a valid configuration.
pub fn collect_warnings(config: &KeygateConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match &config.store.seed_file {
        None => warnings.push("No seed file configured; the store starts empty".to_string()),
        Some(path) if !path.exists() => {
            warnings.push(format!("Seed file does not exist: {}", path.display()))
        }
        Some(_) => {}
    }

    if config.keys.source == KeySourceMode::Direct && !config.keys.static_records.is_empty() {
        warnings.push(
            "Static key records are ignored while keys.source is 'direct'".to_string(),
        );
    }

    if config
        .keys
        .static_records
        .iter()
        .any(|record| record.material.is_encrypted())
    {
        warnings.push(format!(
            "Some key records are still encrypted; set {} before starting",
            config.keys.master_key_env
        ));
    }

    if config.api.cors.allowed_origins.iter().any(|o| o == "*") {
        warnings.push("CORS allows any origin".to_string());
    }

    if !config.api.enabled {
        warnings.push("API is disabled; `run` will refuse to start".to_string());
    }

    warnings
}
