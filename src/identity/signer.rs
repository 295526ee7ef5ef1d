use crate::identity::{Address, Keypair, PublicKey};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Prefix wallets put in front of a message before signing it
const SIGNED_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid signature length: expected 65, got {0}")]
    InvalidLength(usize),

    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("Invalid signature bytes: {0}")]
    InvalidBytes(String),

    #[error("Public key recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Recoverable ECDSA signature in wallet layout: r (32) || s (32) || v (1), v = 27 + recovery id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; 65],
}

impl Signature {
    /// Get the raw bytes of the signature
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Create a signature from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 65 {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }

        let mut array = [0u8; 65];
        array.copy_from_slice(bytes);

        // Accept both raw (0/1) and offset (27/28) recovery ids
        let v = array[64];
        let recid = if v >= 27 { v - 27 } else { v };
        if recid > 3 {
            return Err(SignatureError::InvalidRecoveryId(v));
        }
        array[64] = recid + 27;

        Ok(Self { bytes: array })
    }

    /// Hex encoding with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parse a hex encoded signature, with or without 0x prefix
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| SignatureError::InvalidBytes(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    fn to_recoverable(&self) -> Result<RecoverableSignature, SignatureError> {
        let recid = RecoveryId::from_i32(i32::from(self.bytes[64] - 27))
            .map_err(|_| SignatureError::InvalidRecoveryId(self.bytes[64]))?;
        RecoverableSignature::from_compact(&self.bytes[..64], recid)
            .map_err(|e| SignatureError::InvalidBytes(e.to_string()))
    }

    fn from_recoverable(sig: &RecoverableSignature) -> Self {
        let (recid, compact) = sig.serialize_compact();
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&compact);
        bytes[64] = 27 + recid.to_i32() as u8;
        Self { bytes }
    }
}

/// Signing and address recovery for wallet messages
pub struct Signer;

impl Signer {
    /// Digest of a message wrapped in the signed-message envelope
    pub fn message_digest(message: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(SIGNED_MESSAGE_PREFIX.as_bytes());
        hasher.update(message.len().to_string().as_bytes());
        hasher.update(message);
        hasher.finalize().into()
    }

    /// Sign a message with a keypair
    pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
        let secp = Secp256k1::signing_only();
        let digest = Message::from_digest(Self::message_digest(message));
        let sig = secp.sign_ecdsa_recoverable(&digest, keypair.secret_key());
        Signature::from_recoverable(&sig)
    }

    /// Recover the public key that produced a signature over a message
    pub fn recover(message: &[u8], signature: &Signature) -> Result<PublicKey, SignatureError> {
        let secp = Secp256k1::verification_only();
        let digest = Message::from_digest(Self::message_digest(message));
        let recoverable = signature.to_recoverable()?;
        secp.recover_ecdsa(&digest, &recoverable)
            .map(PublicKey::from_inner)
            .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))
    }

    /// Recover the signing wallet address
    pub fn recover_address(message: &[u8], signature: &Signature) -> Result<Address, SignatureError> {
        Ok(Self::recover(message, signature)?.address())
    }

    /// Check that a signature over a message was produced by `address`
    pub fn verify(address: &Address, message: &[u8], signature: &Signature) -> bool {
        matches!(Self::recover_address(message, signature), Ok(recovered) if recovered == *address)
    }
}
