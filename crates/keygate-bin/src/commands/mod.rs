// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: start the HTTP service
//! - `validate`: validate the configuration file
//! - `version`: show version information
//! - `gen-key`, `encrypt`, `decrypt`: configuration secrets
//! - `gen-key-record`: fresh key record material
//! - `seal`, `open`: offline token and password handling

mod keys;
mod run;
mod token;
mod validate;
mod version;

pub use keys::{decrypt, encrypt, gen_key, gen_key_record};
pub use run::run;
pub use token::{open, seal};
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands, LogFormat};
use crate::error::BinResult;
use crate::logging::init_logging;

/// Log level for one-shot commands when no flag is given.
const TOOL_LOG_LEVEL: &str = "warn";

/// Executes the appropriate command based on CLI arguments.
///
/// `run` configures logging from the config file; every other command logs
/// at `warn` unless a flag says otherwise.
pub async fn execute(cli: Cli) -> BinResult<()> {
    let command = cli.effective_command();

    if !matches!(command, Commands::Run(_)) {
        init_logging(
            cli.forced_log_level().unwrap_or(TOOL_LOG_LEVEL),
            cli.log_format.unwrap_or(LogFormat::Text),
            false,
        )?;
    }

    match command {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
        Commands::GenKey(args) => keys::gen_key(&cli, args),
        Commands::Encrypt(args) => keys::encrypt(&cli, args),
        Commands::Decrypt(args) => keys::decrypt(&cli, args),
        Commands::GenKeyRecord(args) => keys::gen_key_record(&cli, args),
        Commands::Seal(args) => token::seal(&cli, args),
        Commands::Open(args) => token::open(&cli, args),
    }
}
