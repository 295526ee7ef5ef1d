use crate::identity::Address;
use secp256k1::rand::rngs::OsRng;
use secp256k1::{PublicKey as SecpPublicKey, Secp256k1, SecretKey as SecpSecretKey};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeypairError {
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid key bytes: {0}")]
    InvalidBytes(String),
}

/// secp256k1 public key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(SecpPublicKey);

impl PublicKey {
    /// Compressed SEC1 encoding (33 bytes)
    pub fn to_compressed(&self) -> [u8; 33] {
        self.0.serialize()
    }

    /// Uncompressed SEC1 encoding (65 bytes, leading 0x04)
    pub fn to_uncompressed(&self) -> [u8; 65] {
        self.0.serialize_uncompressed()
    }

    /// Create a public key from a compressed or uncompressed SEC1 encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        if bytes.len() != 33 && bytes.len() != 65 {
            return Err(KeypairError::InvalidLength {
                expected: 33,
                got: bytes.len(),
            });
        }

        SecpPublicKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| KeypairError::InvalidBytes(e.to_string()))
    }

    /// The wallet address controlled by this key
    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }

    pub(crate) fn from_inner(inner: SecpPublicKey) -> Self {
        Self(inner)
    }
}

/// secp256k1 keypair: the signing side of a wallet
#[derive(Clone)]
pub struct Keypair {
    secret: SecpSecretKey,
    public: SecpPublicKey,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let secp = Secp256k1::signing_only();
        let secret = SecpSecretKey::new(&mut OsRng);
        let public = SecpPublicKey::from_secret_key(&secp, &secret);
        Self { secret, public }
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.public)
    }

    /// Get the wallet address of this keypair
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Serialize the keypair to bytes (secret key bytes)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.secret.secret_bytes().to_vec()
    }

    /// Deserialize a keypair from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        if bytes.len() != 32 {
            return Err(KeypairError::InvalidLength {
                expected: 32,
                got: bytes.len(),
            });
        }

        let secret = SecpSecretKey::from_slice(bytes)
            .map_err(|e| KeypairError::InvalidBytes(e.to_string()))?;
        let public = SecpPublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(Self { secret, public })
    }

    /// Parse a hex-encoded secret key, with or without a 0x prefix
    pub fn from_hex(s: &str) -> Result<Self, KeypairError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| KeypairError::InvalidBytes(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn secret_key(&self) -> &SecpSecretKey {
        &self.secret
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
