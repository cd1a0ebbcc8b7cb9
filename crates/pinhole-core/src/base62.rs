//! Base-62 encoding for numeric ids.

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encodes `value` using digits, then uppercase, then lowercase letters.
/// No padding is applied; zero encodes as `"0"`.
pub fn encode(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    // u64::MAX needs 11 base-62 digits
    let mut buf = [0u8; 11];
    let mut pos = buf.len();
    while value > 0 {
        pos -= 1;
        buf[pos] = ALPHABET[(value % 62) as usize];
        value /= 62;
    }

    buf[pos..].iter().map(|&b| b as char).collect()
}
