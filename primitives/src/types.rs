//! Core type aliases, constants, and byte helpers shared by every deploykit crate.

use crate::error::PrimitiveError;

/// 32-byte hash used for code hashes, block hashes, and transaction hashes.
pub type Hash = [u8; 32];

/// 32-byte address identifying an account (its ed25519 verifying key).
pub type Address = [u8; 32];

/// Hash of the contract code a blueprint instantiates.
pub type CodeHash = Hash;

/// Hash of a submitted transaction envelope.
pub type TxHash = Hash;

/// Amount in the smallest currency unit. Never represented as floating point.
pub type Balance = u128;

/// Computation units ("ref time") reported by the cluster's dry run.
pub type ComputationUnits = u64;

/// Number of fractional digits in one whole currency unit.
pub const DECIMALS: u32 = 12;

/// One whole currency unit in the smallest denomination.
pub const UNIT: Balance = 1_000_000_000_000;

/// Convert a 32-byte value to a `0x`-prefixed hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("0x");
    s.push_str(&hex::encode(bytes));
    s
}

/// Parse arbitrary `0x`-prefixed (or bare) hex into bytes.
pub fn bytes_from_hex(s: &str) -> Result<Vec<u8>, PrimitiveError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(trimmed).map_err(|e| PrimitiveError::InvalidHex(format!("{}: {}", s, e)))
}

/// Parse a 32-byte hash or address from hex.
pub fn hash_from_hex(s: &str) -> Result<Hash, PrimitiveError> {
    let bytes = bytes_from_hex(s)?;
    if bytes.len() != 32 {
        return Err(PrimitiveError::InvalidLength {
            what: "hash",
            expected: 32,
            got: bytes.len(),
        });
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Render a balance as whole units with all fractional digits, e.g.
/// `32_000_000_000_000` -> `"32.000000000000"`. Integer-only, no rounding.
pub fn format_balance(amount: Balance) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    format!("{}.{:0width$}", whole, frac, width = DECIMALS as usize)
}
