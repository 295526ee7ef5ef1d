// Wallet sign-in: the front-end signs a one-time challenge and the signer's
// address becomes the caller identity handed to the ledger.

use crate::identity::{Address, Signature, SignatureError, Signer};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoginError {
    #[error("Challenge expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("Signature was produced by {recovered}, expected {expected}")]
    AddressMismatch { expected: Address, recovered: Address },

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// One-time message a wallet signs to prove control of an address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginChallenge {
    domain: String,
    nonce: [u8; 16],
    issued_at: DateTime<Utc>,
    ttl_secs: u32,
}

impl LoginChallenge {
    /// Issue a fresh challenge for a domain, valid for `ttl_secs`
    pub fn issue(domain: &str, ttl_secs: u32) -> Self {
        Self::issue_at(domain, ttl_secs, Utc::now())
    }

    /// Issue a challenge with an explicit issue time
    pub fn issue_at(domain: &str, ttl_secs: u32, issued_at: DateTime<Utc>) -> Self {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self {
            domain: domain.to_string(),
            nonce,
            issued_at,
            ttl_secs,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// End of validity; saturates at the latest representable time
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at
            .checked_add_signed(Duration::seconds(i64::from(self.ttl_secs)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// The exact text the wallet is asked to sign
    pub fn message(&self) -> String {
        format!(
            "{} wants you to sign in with your wallet.\nNonce: {}\nIssued At: {}",
            self.domain,
            hex::encode(self.nonce),
            self.issued_at.to_rfc3339()
        )
    }

    /// Verify a signature over this challenge and return the signing address.
    ///
    /// When `claimed` is given, the recovered address must match it.
    pub fn verify(
        &self,
        signature: &Signature,
        claimed: Option<&Address>,
        now: DateTime<Utc>,
    ) -> Result<Address, LoginError> {
        if now > self.expires_at() {
            return Err(LoginError::Expired(self.expires_at()));
        }

        let recovered = Signer::recover_address(self.message().as_bytes(), signature)?;
        if let Some(expected) = claimed {
            if *expected != recovered {
                return Err(LoginError::AddressMismatch {
                    expected: *expected,
                    recovered,
                });
            }
        }

        Ok(recovered)
    }
}
