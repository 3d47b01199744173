//! Symmetric encryption of a ballot choice under a key unlocked by a VDF solution.

use crate::*;
use aes_gcm::aead::{generic_array::GenericArray, Aead, NewAead, Payload};
use aes_gcm::Aes256Gcm;
use hkdf::Hkdf;
use rand::Rng;
use sha2::Sha256;
use std::convert::TryInto;

const AES_IV_LENGTH: usize = 12;
const AES_TAG_LENGTH: usize = 16;
const CHOICE_LENGTH: usize = 4;
const KEY_INFO: &[u8] = b"pebble.timelock.v1";

/// Length of a time-locked choice ciphertext
pub const TIMELOCK_CIPHERTEXT_LENGTH: usize = AES_IV_LENGTH + CHOICE_LENGTH + AES_TAG_LENGTH;

/// Symmetric key recovered by solving a ballot's VDF puzzle
#[derive(Clone, PartialEq, Eq)]
pub struct TimeLockKey([u8; 32]);

impl TimeLockKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for TimeLockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "TimeLockKey(..)")
    }
}

/// Derive the time-lock key for `puzzle` from the encoded VDF output
pub fn derive_key(puzzle: &VdfPuzzle, output: &[u8]) -> TimeLockKey {
    let mut info = Vec::with_capacity(KEY_INFO.len() + 8);
    info.extend_from_slice(KEY_INFO);
    info.extend_from_slice(&puzzle.difficulty.to_be_bytes());

    let h = Hkdf::<Sha256>::new(Some(&puzzle.input), output);
    let mut key = [0u8; 32];
    h.expand(&info, &mut key)
        .expect("pebble: 32 bytes is a valid HKDF-SHA256 output length");

    TimeLockKey(key)
}

/// Encrypt a choice index. `aad` is authenticated but not encrypted.
pub fn encrypt_choice(key: &TimeLockKey, choice: u32, aad: &[u8]) -> Vec<u8> {
    let aead = Aes256Gcm::new(GenericArray::from_slice(&key.0));

    let mut nonce = [0u8; AES_IV_LENGTH];
    rand::thread_rng().fill(&mut nonce);
    let nonce = GenericArray::from_slice(&nonce);

    let plaintext = choice.to_le_bytes();
    let payload = Payload {
        msg: &plaintext,
        aad,
    };
    let ciphertext = aead
        .encrypt(nonce, payload)
        .expect("pebble: timelock: encryption failure!");

    let mut output = Vec::with_capacity(TIMELOCK_CIPHERTEXT_LENGTH);
    output.extend_from_slice(nonce);
    output.extend(ciphertext);

    output
}

/// Decrypt a choice index encrypted with [`encrypt_choice`]
pub fn decrypt_choice(
    key: &TimeLockKey,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<u32, DecryptionError> {
    if ciphertext.len() != TIMELOCK_CIPHERTEXT_LENGTH {
        return Err(DecryptionError);
    }

    let aead = Aes256Gcm::new(GenericArray::from_slice(&key.0));
    let nonce = GenericArray::from_slice(&ciphertext[..AES_IV_LENGTH]);
    let payload = Payload {
        msg: &ciphertext[AES_IV_LENGTH..],
        aad,
    };

    let plaintext = aead.decrypt(nonce, payload).map_err(|_| DecryptionError)?;
    let bytes: [u8; CHOICE_LENGTH] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| DecryptionError)?;

    Ok(u32::from_le_bytes(bytes))
}
