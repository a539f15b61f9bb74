//! Top-N queries
//!
//! Ranks identities under a key prefix by their numeric value.
//! Linear in the number of keys under the prefix; no index is kept.

use crate::store::Store;
use crate::value::Number;

/// One row of a ranking
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    /// Key with the prefix stripped ("bal.Steve" under "bal." → "Steve")
    pub identity: String,

    pub value: Number,
}

/// The `n` highest numeric values under `prefix`, descending
///
/// Ties keep enumeration (key) order, so repeated calls against an
/// unchanged store return the same rows. Non-numeric values are skipped.
pub fn top_n(store: &Store, prefix: &str, n: usize) -> Vec<Ranked> {
    let mut rows: Vec<Ranked> = store
        .entries(prefix)
        .into_iter()
        .filter_map(|(key, value)| match value.as_number() {
            Some(value) => Some(Ranked {
                identity: key[prefix.len()..].to_string(),
                value,
            }),
            None => {
                tracing::debug!("top_n: skipping non-numeric key '{}'", key);
                None
            }
        })
        .collect();

    // sort_by is stable
    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    rows.truncate(n);
    rows
}
