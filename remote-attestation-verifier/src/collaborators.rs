//! Cryptographic services the verifier relies on but does not implement.
//!
//! Implementations are supplied by the caller, typically backed by an HSM or
//! a crypto library of their choice.

use crate::errors::Result;

/// Verifies the device's asymmetric signature.
pub trait SignatureVerifier {
    /// Returns whether `signature` (raw `r || s`) over `data` is valid for the
    /// DER encoded `public_key`.
    fn verify_signature(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool>;
}

/// Computes the session MAC.
pub trait MacProvider {
    fn compute_mac(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Decrypts SIGMA_ENC payloads with the session key.
pub trait Decryptor {
    fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Decides whether a device certificate chain ends in a trusted root.
pub trait ChainTrustVerifier {
    /// `chain` holds DER certificates, leaf first.
    fn is_trusted(&self, chain: &[Vec<u8>]) -> bool;
}
