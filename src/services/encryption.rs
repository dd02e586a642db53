//! Deterministic path cipher.
//!
//! Hides on-disk file names from anyone who can only read the database.
//! AES-128 in ECB mode with PKCS#7 padding, no IV: the same plaintext always
//! produces the same handle, so equal names leak as equal ciphertexts. This is
//! obscurity for storage layout, not authenticated confidentiality; do not use
//! it to protect data.

use aes::Aes128;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};

type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;

const KEY_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption secret is empty")]
    EmptySecret,
    #[error("Ciphertext is not valid base64")]
    Malformed,
    #[error("Ciphertext length is not a multiple of the block size")]
    BlockSize,
    #[error("Ciphertext padding is invalid")]
    Padding,
    #[error("Decrypted value is not valid UTF-8")]
    Utf8,
}

#[derive(Clone)]
pub struct PathCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for PathCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCipher").finish_non_exhaustive()
    }
}

impl PathCipher {
    /// Build a cipher from a configured secret.
    ///
    /// The secret's UTF-8 bytes are truncated or zero-padded to 16 bytes. They
    /// are not hashed.
    pub fn new(secret: &str) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::EmptySecret);
        }
        Ok(Self {
            key: derive_key(secret),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let buf = Aes128EcbEnc::new(&self.key.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        URL_SAFE_NO_PAD.encode(buf)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let buf = URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|_| CipherError::Malformed)?;
        if buf.is_empty() || buf.len() % BLOCK_LEN != 0 {
            return Err(CipherError::BlockSize);
        }
        let plain = Aes128EcbDec::new(&self.key.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&buf)
            .map_err(|_| CipherError::Padding)?;
        String::from_utf8(plain).map_err(|_| CipherError::Utf8)
    }
}

fn derive_key(secret: &str) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    let bytes = secret.as_bytes();
    let n = bytes.len().min(KEY_LEN);
    key[..n].copy_from_slice(&bytes[..n]);
    key
}
