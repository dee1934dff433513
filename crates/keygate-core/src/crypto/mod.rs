// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Key resolution and token encryption.
//!
//! ```text
//! KeyResolver ──(CipherKey, IvMode)──▶ TokenCodec ──▶ "v1:..." / "v2:..."
//! ```

pub mod cipher;
pub mod codec;
pub mod resolver;

pub use cipher::{cbc_decrypt, cbc_encrypt, constant_time_eq, CipherKey, Iv, KeySize, BLOCK_SIZE, IV_LENGTH};
pub use codec::{EncryptedToken, TokenCodec, TokenPayload, WireVersion, PAYLOAD_SEPARATOR};
pub use resolver::{
    IvMode, KeyMaterial, KeyResolver, KeyResolverConfig, KeySource, KeySourceMode, ResolvedKey,
    KEY_MATERIAL_SEPARATOR,
};
