//! Small string helpers shared by both planes.

use rand::Rng;

/// Unambiguous alphanumeric charset for generated claim ids.
const CLAIM_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated claim ids.
pub const CLAIM_ID_LENGTH: usize = 32;

/// Generate a random claim id (32 alphanumeric characters).
pub fn random_claim_id() -> String {
    let mut rng = rand::rng();

    (0..CLAIM_ID_LENGTH)
        .map(|_| CLAIM_ID_CHARSET[rng.random_range(0..CLAIM_ID_CHARSET.len())] as char)
        .collect()
}

/// Split a comma-separated channel list, dropping empty entries and
/// duplicates while keeping first-seen order.
pub fn split_channels(raw: &str) -> Vec<String> {
    let mut channels = Vec::new();

    for channel in raw.split(',') {
        if channel.is_empty() {
            continue;
        }
        if !channels.iter().any(|existing| existing == channel) {
            channels.push(channel.to_string());
        }
    }

    channels
}

/// Deduplicate while keeping first-seen order.
pub fn unique_strings(values: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(values.len());

    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }

    unique
}

/// Remove the first occurrence of `value` from `values`.
pub fn remove_string(values: &mut Vec<String>, value: &str) {
    if let Some(index) = values.iter().position(|existing| existing == value) {
        values.remove(index);
    }
}
