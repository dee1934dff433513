// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints crate versions and build information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("keygate - personal access token service");
    println!();
    println!("Version Information:");
    println!("  keygate-bin:    {}", crate::VERSION);
    println!("  keygate-core:   {}", keygate_core::VERSION);
    println!("  keygate-api:    {}", keygate_api::VERSION);
    println!("  keygate-config: {}", keygate_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target: {}", std::env::consts::ARCH);
    println!("  OS:     {}", std::env::consts::OS);
    println!();
    println!("Token formats: v1 (random IV), v2 (fixed IV)");
    println!("Key sizes:     AES-128, AES-192, AES-256");
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
