use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN};
use crate::error::EncryptorError;

/// Encrypt plaintext under a fresh random nonce
pub fn encrypt(
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), EncryptorError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce = [0u8; NONCE_LEN];
    fill(&mut nonce).map_err(|_| EncryptorError::Encryption)?;

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| EncryptorError::Encryption)?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext
pub fn decrypt(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, EncryptorError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| EncryptorError::Decryption)?;
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_fresh() {
        let key = [9u8; KEY_LEN];
        let (c1, n1) = encrypt(&key, b"same").unwrap();
        let (c2, n2) = encrypt(&key, b"same").unwrap();

        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = [9u8; KEY_LEN];
        let (mut ciphertext, nonce) = encrypt(&key, b"secret data").unwrap();
        ciphertext[0] ^= 0x01;

        assert!(matches!(
            decrypt(&key, &nonce, &ciphertext),
            Err(EncryptorError::Decryption)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let (ciphertext, nonce) = encrypt(&[1u8; KEY_LEN], b"secret data").unwrap();
        assert!(decrypt(&[2u8; KEY_LEN], &nonce, &ciphertext).is_err());
    }
}
