// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: start the HTTP service (default)
//! - `validate`: check a configuration file
//! - `version`: show version information
//! - `gen-key` / `encrypt` / `decrypt`: manage `ENC:` configuration secrets
//! - `gen-key-record`: create `"<base64 iv>,<base64 key>"` key material
//! - `seal` / `open`: encrypt or decrypt a token payload or password

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// keygate - personal access token service
#[derive(Parser, Debug)]
#[command(
    name = "keygate",
    author = "Sylvex <contact@sylvex.io>",
    version = keygate_core::VERSION,
    about = "Issues and verifies encrypted personal access tokens",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "keygate.yaml",
        env = "KEYGATE_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(short, long, env = "KEYGATE_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); defaults to the config file
    #[arg(long, env = "KEYGATE_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP service
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,

    /// Generate a master key for ENC: configuration values
    #[command(name = "gen-key")]
    GenKey(GenKeyArgs),

    /// Encrypt a configuration value with the master key
    Encrypt(SecretArgs),

    /// Decrypt a configuration value with the master key
    Decrypt(SecretArgs),

    /// Generate key record material for a user's salt to reference
    #[command(name = "gen-key-record")]
    GenKeyRecord(GenKeyRecordArgs),

    /// Encrypt a token payload or password under key material
    Seal(SealArgs),

    /// Decrypt a token or password under key material
    Open(OpenArgs),
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Override the API port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the store seed file
    #[arg(long)]
    pub seed: Option<PathBuf>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Print the parsed configuration (secrets masked)
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `gen-key` command.
#[derive(Args, Debug, Default, Clone)]
pub struct GenKeyArgs {
    /// Write the key to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `encrypt` and `decrypt`.
#[derive(Args, Debug, Clone)]
pub struct SecretArgs {
    /// Value to process
    #[arg(required_unless_present = "stdin")]
    pub value: Option<String>,

    /// Read the value from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Master key (base64)
    #[arg(short, long, env = "KEYGATE_MASTER_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// File containing the base64 master key
    #[arg(long, conflicts_with = "key")]
    pub key_file: Option<PathBuf>,
}

/// Arguments for the `gen-key-record` command.
#[derive(Args, Debug, Clone)]
pub struct GenKeyRecordArgs {
    /// AES key size in bytes
    #[arg(short = 's', long, default_value = "16", value_parser = clap::builder::PossibleValuesParser::new(["16", "24", "32"]))]
    pub key_size: String,

    /// Record id; prints a ready-to-paste config entry when set
    #[arg(long)]
    pub id: Option<String>,

    /// Seal the material with this master key (base64)
    #[arg(long, env = "KEYGATE_MASTER_KEY", hide_env_values = true)]
    pub master_key: Option<String>,
}

/// Where `seal` and `open` get their key from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct KeyArgs {
    /// Key record material, `"<base64 iv>,<base64 key>"`
    #[arg(short, long, env = "KEYGATE_KEY_MATERIAL", hide_env_values = true)]
    pub material: Option<String>,

    /// A raw salt used as a direct key (random IV)
    #[arg(long)]
    pub direct_key: Option<String>,
}

/// Arguments for the `seal` command.
#[derive(Args, Debug, Clone)]
pub struct SealArgs {
    /// `user,application,role`, or the password with `--secret`
    pub value: String,

    /// Treat the value as an opaque secret instead of a token payload
    #[arg(long)]
    pub secret: bool,

    /// Embed the current time as `issued_at`
    #[arg(long, conflicts_with = "secret")]
    pub issued_at: bool,

    /// Key source
    #[command(flatten)]
    pub key: KeyArgs,
}

/// Arguments for the `open` command.
#[derive(Args, Debug, Clone)]
pub struct OpenArgs {
    /// Encoded token, `v1:...` or `v2:...`
    pub token: String,

    /// Print the decrypted secret instead of parsing a payload
    #[arg(long)]
    pub secret: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Key source
    #[command(flatten)]
    pub key: KeyArgs,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<keygate_config::LogFormat> for LogFormat {
    fn from(format: keygate_config::LogFormat) -> Self {
        match format {
            keygate_config::LogFormat::Text => LogFormat::Text,
            keygate_config::LogFormat::Json => LogFormat::Json,
            keygate_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parses CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the command to run, defaulting to `Run`.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Returns the log level forced by flags, if any.
    ///
    /// `--quiet` and `--verbose` win over `--log-level`.
    pub fn forced_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}
