use rand::rngs::OsRng;
use rand::RngCore;

pub const NONCE_LENGTH: usize = 16;
pub const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

// Largest multiple of the alphabet size that fits in a byte. Bytes at or
// above it are rejected so every letter is equally likely.
const ACCEPT_BELOW: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// Generates a request nonce from the operating system's CSPRNG.
pub fn generate_nonce() -> Result<String, rand::Error> {
    generate_nonce_with(&mut OsRng)
}

pub fn generate_nonce_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<String, rand::Error> {
    let mut nonce = String::with_capacity(NONCE_LENGTH);
    let mut buf = [0u8; NONCE_LENGTH * 2];

    while nonce.len() < NONCE_LENGTH {
        rng.try_fill_bytes(&mut buf)?;
        for &byte in buf.iter().filter(|&&b| b < ACCEPT_BELOW) {
            if nonce.len() == NONCE_LENGTH {
                break;
            }
            nonce.push(ALPHABET[usize::from(byte) % ALPHABET.len()] as char);
        }
    }

    Ok(nonce)
}
