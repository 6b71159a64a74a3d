//! ID generation utilities

use rand::Rng;

/// Characters used for the random part of an ID
const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random lowercase base36 string of the specified length
pub fn random_suffix(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..ID_CHARS.len());
            ID_CHARS[idx] as char
        })
        .collect()
}

/// Generate an entity ID: `<epoch-ms>-<random base36>`
///
/// The time prefix keeps IDs roughly ordered by creation, the random
/// suffix separates IDs generated within the same millisecond.
pub fn generate_id() -> String {
    format!(
        "{}-{}",
        super::common::now_millis(),
        random_suffix(crate::ID_RANDOM_LENGTH)
    )
}

/// Check that a string has the `<digits>-<base36>` ID shape
pub fn is_valid_id(id: &str) -> bool {
    let Some((time, random)) = id.split_once('-') else {
        return false;
    };
    !time.is_empty()
        && time.bytes().all(|b| b.is_ascii_digit())
        && !random.is_empty()
        && random.bytes().all(|b| ID_CHARS.contains(&b))
}
