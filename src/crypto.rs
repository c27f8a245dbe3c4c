// crypto.rs — AES-128 challenge-response keep-alive.
//
// The URU4000Bg2 hands out a 16-byte challenge during power-up and
// expects it back encrypted under a fixed vendor key; without a valid
// response the device refuses to wake. This is presence proof, not a
// secure channel: the key is the same on every unit.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;

/// Fixed vendor key shared by all Bg2 devices.
const CR_KEY: [u8; 16] = [
    0x79, 0xac, 0x91, 0x79, 0x5c, 0xa1, 0x47, 0x8e, //
    0x98, 0xe0, 0x0f, 0x3c, 0x59, 0x8f, 0x5f, 0x4b,
];

/// Length of the auth challenge and response payloads.
pub const AUTH_CR_LENGTH: usize = 16;

/// Immutable key schedule for the keep-alive. Built once per device
/// handle; read-only thereafter.
pub struct KeepAlive {
    cipher: Aes128,
}

impl KeepAlive {
    pub fn new() -> Self {
        KeepAlive {
            cipher: Aes128::new(GenericArray::from_slice(&CR_KEY)),
        }
    }

    /// Encrypt one challenge block in ECB mode.
    pub fn respond(&self, challenge: &[u8; AUTH_CR_LENGTH]) -> [u8; AUTH_CR_LENGTH] {
        let mut block = GenericArray::clone_from_slice(challenge);
        self.cipher.encrypt_block(&mut block);
        block.into()
    }
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_challenge_reference_ciphertext() {
        // Recorded from a reference AES-128 implementation.
        let expected = [
            0xa9, 0xd4, 0x2a, 0x98, 0xc2, 0x0c, 0xea, 0x8f, //
            0x0e, 0xb6, 0x1f, 0x17, 0xf8, 0xf6, 0xc0, 0x01,
        ];
        assert_eq!(KeepAlive::new().respond(&[0u8; 16]), expected);
    }

    #[test]
    fn response_is_deterministic() {
        let ka = KeepAlive::new();
        let challenge = [0x42u8; 16];
        assert_eq!(ka.respond(&challenge), ka.respond(&challenge));
    }
}
