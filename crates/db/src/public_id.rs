//! Short external references for cash-ledger entries.

use sha2::{Digest, Sha256};
use storeledger_shared::types::LedgerEntryId;

/// Number of digest bytes kept; encodes to 12 base64url characters.
const PUBLIC_ID_BYTES: usize = 9;

/// Derives the public reference of a ledger entry.
///
/// Base64url of the first nine bytes of SHA-256 over the entry id. Stable
/// for a given id, so it is recomputed rather than looked up.
#[must_use]
pub fn public_id(id: LedgerEntryId) -> String {
    let digest = Sha256::digest(id.into_inner().as_bytes());
    base64_url::encode(&digest[..PUBLIC_ID_BYTES])
}
