use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::error::GatewayError;

/// Envelope produced by [`KeyService::encrypt`]. Carries the key version
/// so a later rotation can still decrypt material sealed under an older
/// key (spec §6 "key rotation must not break decryption of
/// previously-sealed data").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlob {
    pub ciphertext: Vec<u8>,
    pub key_version: u32,
}

/// Boundary to the HSM/key-management service (spec §6). Actual
/// cryptographic primitives and HSM wire protocols are out of scope
/// (spec §1 Non-goals) — this only carries the contract the rest of the
/// system depends on: encrypt-with-current-key, decrypt-with-whatever-
/// version-sealed-it.
#[async_trait]
pub trait KeyService: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<SealedBlob, GatewayError>;
    async fn decrypt(&self, blob: &SealedBlob) -> Result<Vec<u8>, GatewayError>;
    fn current_key_version(&self) -> u32;
}

/// Reference implementation: reversible XOR keyed by version, retaining
/// every version ever issued so rotation never breaks old ciphertext.
/// Not a real cipher — the HSM's actual crypto is explicitly out of
/// scope (spec §1 Non-goals); this only has to round-trip correctly and
/// respect key versioning.
pub struct InMemoryKeyService {
    keys: Mutex<HashMap<u32, [u8; 16]>>,
    current: Mutex<u32>,
}

impl InMemoryKeyService {
    pub fn new() -> Self {
        let mut keys = HashMap::new();
        keys.insert(1, derive_key(1));
        Self { keys: Mutex::new(keys), current: Mutex::new(1) }
    }

    /// Rotates to a fresh key version; existing ciphertext sealed under
    /// older versions remains decryptable.
    pub fn rotate(&self) -> u32 {
        let mut current = self.current.lock().unwrap();
        let next = *current + 1;
        self.keys.lock().unwrap().insert(next, derive_key(next));
        *current = next;
        next
    }
}

impl Default for InMemoryKeyService {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_key(version: u32) -> [u8; 16] {
    let mut key = [0u8; 16];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = (version as u8).wrapping_mul(31).wrapping_add(i as u8);
    }
    key
}

fn xor_with(data: &[u8], key: &[u8; 16]) -> Vec<u8> {
    data.iter().enumerate().map(|(i, b)| b ^ key[i % key.len()]).collect()
}

#[async_trait]
impl KeyService for InMemoryKeyService {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<SealedBlob, GatewayError> {
        let current = *self.current.lock().unwrap();
        let keys = self.keys.lock().unwrap();
        let key = keys.get(&current).expect("current key always present");
        Ok(SealedBlob { ciphertext: xor_with(plaintext, key), key_version: current })
    }

    async fn decrypt(&self, blob: &SealedBlob) -> Result<Vec<u8>, GatewayError> {
        let keys = self.keys.lock().unwrap();
        let key = keys.get(&blob.key_version).ok_or_else(|| {
            GatewayError::Integrity(format!("unknown key version: {}", blob.key_version))
        })?;
        Ok(xor_with(&blob.ciphertext, key))
    }

    fn current_key_version(&self) -> u32 {
        *self.current.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_plaintext() {
        let svc = InMemoryKeyService::new();
        let sealed = svc.encrypt(b"hello").await.unwrap();
        let plain = svc.decrypt(&sealed).await.unwrap();
        assert_eq!(plain, b"hello");
    }

    #[tokio::test]
    async fn rotation_preserves_old_ciphertext_decryption() {
        let svc = InMemoryKeyService::new();
        let sealed = svc.encrypt(b"hello").await.unwrap();
        svc.rotate();
        assert_eq!(svc.current_key_version(), 2);
        let plain = svc.decrypt(&sealed).await.unwrap();
        assert_eq!(plain, b"hello");
    }

    #[tokio::test]
    async fn post_rotation_encrypt_uses_new_version() {
        let svc = InMemoryKeyService::new();
        svc.rotate();
        let sealed = svc.encrypt(b"hi").await.unwrap();
        assert_eq!(sealed.key_version, 2);
    }
}
