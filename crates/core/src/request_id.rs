//! Stable request-id synthesis for pipeline records.
//!
//! The id is the identity clients poll against, so a retried run must
//! reuse the existing record's id. Fresh runs derive one from the tail
//! of the payment transaction hash plus the current time.

use crate::types::Timestamp;

/// Placeholder tail when no transaction hash is available.
const ANON_TAIL: &str = "anon";

/// Number of trailing transaction-hash characters folded into the id.
const TX_TAIL_LEN: usize = 6;

/// Build a fresh request id of the form `pipe-{tx tail}-{unix millis}`.
pub fn synthesize(tx_hash: Option<&str>, now: Timestamp) -> String {
    let tail: String = match tx_hash.filter(|h| !h.is_empty()) {
        Some(hash) => {
            let chars: Vec<char> = hash.chars().collect();
            let start = chars.len().saturating_sub(TX_TAIL_LEN);
            chars[start..].iter().collect()
        }
        None => ANON_TAIL.to_string(),
    };
    format!("pipe-{tail}-{}", now.timestamp_millis())
}
