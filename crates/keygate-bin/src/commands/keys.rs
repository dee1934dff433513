// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of key and configuration secret commands.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use keygate_config::SecretCipher;
use keygate_core::crypto::{KeyMaterial, KeySize};

use crate::cli::{Cli, GenKeyArgs, GenKeyRecordArgs, SecretArgs};
use crate::error::{BinError, BinResult};

/// Executes `gen-key`: prints or writes a fresh base64 master key.
pub fn gen_key(_cli: &Cli, args: GenKeyArgs) -> BinResult<()> {
    let key = keygate_config::generate_master_key();

    if let Some(path) = &args.output {
        std::fs::write(path, &key)
            .with_context(|| format!("Failed to write key file {}", path.display()))?;
        eprintln!("Key written to: {}", path.display());
    } else {
        println!("{}", key);
    }

    eprintln!();
    eprintln!("Store this key securely! You will need it to:");
    eprintln!("  - Encrypt secrets: keygate encrypt <value> -k <key>");
    eprintln!("  - Start the service: export KEYGATE_MASTER_KEY=<key>");

    Ok(())
}

/// Executes `encrypt`: prints an `ENC:` value for the config file.
pub fn encrypt(_cli: &Cli, args: SecretArgs) -> BinResult<()> {
    let value = read_value(&args)?;
    let cipher = master_cipher(&args.key, &args.key_file)?;
    let sealed = cipher.seal(&value)?;

    println!("{}", sealed);
    eprintln!();
    eprintln!("Use this value in your configuration file:");
    eprintln!("  material: \"{}\"", sealed);

    Ok(())
}

/// Executes `decrypt`: prints the plaintext of an `ENC:` value.
pub fn decrypt(_cli: &Cli, args: SecretArgs) -> BinResult<()> {
    let value = read_value(&args)?;
    let cipher = master_cipher(&args.key, &args.key_file)?;
    let plaintext = cipher.open(&value)?;

    println!("{}", plaintext);
    Ok(())
}

/// Executes `gen-key-record`: prints fresh `"<base64 iv>,<base64 key>"`
/// material, optionally sealed and wrapped in a config entry.
pub fn gen_key_record(_cli: &Cli, args: GenKeyRecordArgs) -> BinResult<()> {
    let length: usize = args
        .key_size
        .parse()
        .map_err(|_| BinError::invalid_input(format!("Invalid key size '{}'", args.key_size)))?;
    let size = KeySize::from_len(length)?;
    let material = KeyMaterial::generate(size);
    let encoded = material.encode();

    let output = match &args.master_key {
        Some(key) => SecretCipher::from_base64(key)?.seal(&encoded)?,
        None => encoded.as_str().to_string(),
    };

    match &args.id {
        Some(id) => {
            println!("keys:");
            println!("  static_records:");
            println!("    - id: \"{}\"", id);
            println!("      material: \"{}\"", output);
        }
        None => println!("{}", output),
    }

    eprintln!();
    eprintln!("Generated {} key material.", size);
    if args.master_key.is_none() {
        eprintln!("The material is plaintext; seal it with `keygate encrypt` before committing it.");
    }

    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn read_value(args: &SecretArgs) -> BinResult<String> {
    if args.stdin {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read from stdin")?;
        return Ok(input.trim().to_string());
    }
    args.value
        .clone()
        .ok_or_else(|| BinError::invalid_input("No value provided. Use --stdin or provide a value"))
}

/// Builds the master key cipher from `--key`, `--key-file` or the
/// environment, in that order.
fn master_cipher(key: &Option<String>, key_file: &Option<PathBuf>) -> BinResult<SecretCipher> {
    if let Some(key) = key {
        return Ok(SecretCipher::from_base64(key)?);
    }

    if let Some(path) = key_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?;
        return Ok(SecretCipher::from_base64(content.trim())?);
    }

    SecretCipher::from_env_optional(keygate_config::schema::DEFAULT_MASTER_KEY_ENV)?.ok_or_else(
        || {
            BinError::invalid_input(
                "No master key provided. Use --key, --key-file or set KEYGATE_MASTER_KEY",
            )
        },
    )
}
