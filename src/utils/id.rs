//! Random opaque identifiers for new measurement records.
//!
//! Characters are drawn independently and uniformly from a 62-symbol alphabet.
//! Not cryptographically secure; collisions are negligible at this scale.

use rand::Rng;

pub const DEFAULT_ID_LEN: usize = 21;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn generate_id() -> String {
    generate_id_with_len(DEFAULT_ID_LEN)
}

pub fn generate_id_with_len(len: usize) -> String {
    generate_id_with_rng(&mut rand::thread_rng(), len)
}

pub fn generate_id_with_rng<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
