// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Offline `seal` and `open` commands.
//!
//! Useful for preparing seed passwords and for inspecting tokens without a
//! running service.

use chrono::Utc;
use keygate_core::crypto::{
    CipherKey, IvMode, KeyMaterial, KeySize, ResolvedKey, TokenCodec, TokenPayload,
};

use crate::cli::{Cli, KeyArgs, OpenArgs, OutputFormat, SealArgs};
use crate::error::{BinError, BinResult};

/// Executes `seal`.
pub fn seal(_cli: &Cli, args: SealArgs) -> BinResult<()> {
    let key = resolve_key(&args.key)?;

    let token = if args.secret {
        TokenCodec::seal_secret(&args.value, &key)?
    } else {
        let mut payload = TokenPayload::parse(&args.value)?;
        if args.issued_at {
            payload = payload.with_issued_at(Utc::now());
        }
        TokenCodec::seal(&payload, &key)?
    };

    println!("{}", token.encode());
    Ok(())
}

/// Executes `open`.
pub fn open(_cli: &Cli, args: OpenArgs) -> BinResult<()> {
    let key = resolve_key(&args.key)?;

    if args.secret {
        let secret = TokenCodec::open_secret(&args.token, &key)?;
        match args.format {
            OutputFormat::Text => println!("{}", secret.as_str()),
            OutputFormat::Json => print_json(&serde_json::json!({ "secret": secret.as_str() }))?,
        }
        return Ok(());
    }

    let payload = TokenCodec::open(&args.token, &key)?;
    match args.format {
        OutputFormat::Text => {
            println!("user_id:        {}", payload.user_id);
            println!("application_id: {}", payload.application_id);
            println!("role_id:        {}", payload.role_id);
            if let Some(issued_at) = payload.issued_at {
                println!("issued_at:      {}", issued_at.to_rfc3339());
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "user_id": payload.user_id.as_str(),
            "application_id": payload.application_id.as_str(),
            "role_id": payload.role_id.as_str(),
            "issued_at": payload.issued_at,
        }))?,
    }
    Ok(())
}

/// Turns `--material` or `--direct-key` into a resolved key.
///
/// Direct keys are fitted to 16 bytes and use a random IV, matching the
/// default `direct` key source.
pub fn resolve_key(args: &KeyArgs) -> BinResult<ResolvedKey> {
    match (&args.material, &args.direct_key) {
        (Some(material), None) => Ok(KeyMaterial::parse(material)?.into_resolved()),
        (None, Some(salt)) => Ok(ResolvedKey::new(
            CipherKey::fit_to(salt, KeySize::Aes128),
            IvMode::Random,
        )),
        _ => Err(BinError::invalid_input(
            "Exactly one of --material or --direct-key is required",
        )),
    }
}

fn print_json(value: &serde_json::Value) -> BinResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("Failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
