//! Capability witness: the Permit2 deployment.
//!
//! An endpoint that returns the expected runtime bytecode for the Permit2
//! address demonstrates both archive-quality state access and that it
//! serves the chain it claims to. The expected bytecode ships as a hex
//! asset embedded at compile time and is compared by prefix, so appended
//! metadata differences on exotic deployments do not fail the check.

use std::sync::LazyLock;

/// Canonical Permit2 deployment address, identical on every EVM chain.
pub const WITNESS_ADDRESS: &str = "0x000000000022D473030F116dDEE9F6B43aC78BA3";

static WITNESS_BYTECODE_HEX: LazyLock<&'static str> =
    LazyLock::new(|| include_str!("permit2_runtime.hex").trim());

/// Expected runtime bytecode as a `0x`-less lowercase hex string.
#[must_use]
pub fn witness_bytecode_hex() -> &'static str {
    *WITNESS_BYTECODE_HEX
}

/// Whether an `eth_getCode` result starts with the witness bytecode.
///
/// Hex-string prefix comparison is equivalent to comparing the decoded
/// bytes, since both sides have even length and a fixed alphabet.
#[must_use]
pub fn matches_witness(code: &str) -> bool {
    let code = code.strip_prefix("0x").unwrap_or(code);
    let expected = witness_bytecode_hex();
    code.len() >= expected.len() && code[..expected.len()].eq_ignore_ascii_case(expected)
}
