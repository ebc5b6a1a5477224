use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use std::fmt;

/// Modulus size of every generated key
pub const KEY_BITS: usize = 2048;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Failed to generate keypair: {0}")]
    KeypairGenerationError(String),

    #[error("Failed to sign message: {0}")]
    SigningError(String),

    #[error("Failed to encode public key: {0}")]
    EncodingError(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// A public key in PEM (SubjectPublicKeyInfo) text form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKeyPem(pub String);

impl PublicKeyPem {
    /// Encodes a public key as PEM
    pub fn from_public_key(public_key: &RsaPublicKey) -> Result<Self, CryptoError> {
        public_key
            .to_public_key_pem(LineEnding::LF)
            .map(PublicKeyPem)
            .map_err(|e| CryptoError::EncodingError(e.to_string()))
    }

    /// Parses the PEM text back into a public key
    pub fn to_public_key(&self) -> Result<RsaPublicKey, CryptoError> {
        RsaPublicKey::from_public_key_pem(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Display for PublicKeyPem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A detached signature, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    /// Creates a new digital signature from a signature
    pub fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(hex::encode(signature.to_vec()))
    }

    /// Decodes the raw signature bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        hex::decode(&self.0).map_err(|e| CryptoError::DecodingError(e.to_string()))
    }
}

impl fmt::Display for DigitalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account's RSA key pair. The private half never leaves this type.
///
/// Signatures use RSASSA-PSS over SHA-256 with a fresh random salt, so
/// signing the same message twice gives two different signatures.
pub struct KeyPair {
    signing_key: BlindedSigningKey<Sha256>,
    public_key: RsaPublicKey,
}

impl KeyPair {
    /// Generates a fresh key pair from the OS random number generator
    pub fn generate() -> Result<Self, CryptoError> {
        let mut csprng = OsRng;
        let private_key = RsaPrivateKey::new(&mut csprng, KEY_BITS)
            .map_err(|e| CryptoError::KeypairGenerationError(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(KeyPair {
            signing_key: BlindedSigningKey::new(private_key),
            public_key,
        })
    }

    /// Gets the public half of the pair
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Exports the public key as PEM
    pub fn public_key_pem(&self) -> Result<PublicKeyPem, CryptoError> {
        PublicKeyPem::from_public_key(&self.public_key)
    }

    /// Signs a message with the private key
    pub fn sign(&self, message: &[u8]) -> Result<DigitalSignature, CryptoError> {
        let signature = self
            .signing_key
            .try_sign_with_rng(&mut OsRng, message)
            .map_err(|e| CryptoError::SigningError(e.to_string()))?;

        Ok(DigitalSignature::from_signature(&signature))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("modulus_bits", &(self.public_key.size() * 8))
            .finish_non_exhaustive()
    }
}

/// Verifies raw signature bytes against a message and public key.
///
/// Malformed signatures are an ordinary rejection, never an error.
pub fn verify(public_key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> bool {
    let signature = match Signature::try_from(signature) {
        Ok(signature) => signature,
        Err(_) => return false,
    };

    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(message, &signature)
        .is_ok()
}

/// Verifies a textual signature against a message and a PEM public key
pub fn verify_signature(message: &[u8], signature: &DigitalSignature, public_key: &PublicKeyPem) -> bool {
    let public_key = match public_key.to_public_key() {
        Ok(key) => key,
        Err(_) => return false,
    };

    match signature.to_bytes() {
        Ok(bytes) => verify(&public_key, message, &bytes),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_and_verification() {
        let keys = KeyPair::generate().unwrap();
        let message = b"Hello, world!";

        let signature = keys.sign(message).unwrap();
        let bytes = signature.to_bytes().unwrap();
        assert!(verify(keys.public_key(), message, &bytes));

        // Verify with wrong message
        assert!(!verify(keys.public_key(), b"Wrong message", &bytes));
    }

    #[test]
    fn test_signatures_are_randomized() {
        let keys = KeyPair::generate().unwrap();
        let pem = keys.public_key_pem().unwrap();

        let first = keys.sign(b"same message").unwrap();
        let second = keys.sign(b"same message").unwrap();

        assert_ne!(first, second);
        assert!(verify_signature(b"same message", &first, &pem));
        assert!(verify_signature(b"same message", &second, &pem));
    }

    #[test]
    fn test_flipped_bytes_are_rejected() {
        let keys = KeyPair::generate().unwrap();
        let message = b"alice pays bob".to_vec();
        let signature = keys.sign(&message).unwrap().to_bytes().unwrap();

        for i in 0..message.len() {
            let mut tampered = message.clone();
            tampered[i] ^= 0x01;
            assert!(!verify(keys.public_key(), &tampered, &signature));
        }

        for i in 0..signature.len() {
            let mut tampered = signature.clone();
            tampered[i] ^= 0x01;
            assert!(!verify(keys.public_key(), &message, &tampered));
        }
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let signer = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let signature = signer.sign(b"payload").unwrap().to_bytes().unwrap();

        assert!(!verify(other.public_key(), b"payload", &signature));
    }

    #[test]
    fn test_malformed_signature_is_false() {
        let keys = KeyPair::generate().unwrap();
        assert!(!verify(keys.public_key(), b"payload", &[]));
        assert!(!verify(keys.public_key(), b"payload", &[0u8; 12]));

        let pem = keys.public_key_pem().unwrap();
        let garbage = DigitalSignature("not hex at all".to_string());
        assert!(garbage.to_bytes().is_err());
        assert!(!verify_signature(b"payload", &garbage, &pem));
    }

    #[test]
    fn test_pem_round_trip() {
        let keys = KeyPair::generate().unwrap();
        let pem = keys.public_key_pem().unwrap();

        assert!(pem.0.starts_with("-----BEGIN PUBLIC KEY-----"));

        let parsed = pem.to_public_key().unwrap();
        assert_eq!(&parsed, keys.public_key());
        assert_eq!(parsed.size() * 8, KEY_BITS);

        let signature = keys.sign(b"payload").unwrap();
        assert!(verify_signature(b"payload", &signature, &pem));

        let broken = PublicKeyPem("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n".to_string());
        assert!(broken.to_public_key().is_err());
        assert!(!verify_signature(b"payload", &signature, &broken));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let keys = KeyPair::generate().unwrap();
        let rendered = format!("{:?}", keys);

        assert!(rendered.contains("modulus_bits: 2048"));
        assert!(!rendered.contains("signing_key"));
    }
}
