use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("public key is not valid hex ed25519: {0}")]
    InvalidPublicKey(String),
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("signature header is not a 64-byte hex value")]
    MalformedSignature,
    #[error("signature does not match request body")]
    BadSignature,
}

/// Checks `signature(timestamp ‖ body)` against the application's public key.
#[derive(Clone, Debug)]
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, VerifyError> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|error| VerifyError::InvalidPublicKey(error.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VerifyError::InvalidPublicKey("expected 32 bytes".to_owned()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|error| VerifyError::InvalidPublicKey(error.to_string()))?;
        Ok(Self { key })
    }

    pub fn verify(
        &self,
        signature_hex: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> Result<(), VerifyError> {
        let signature_hex = signature_hex.ok_or(VerifyError::MissingHeader(SIGNATURE_HEADER))?;
        let timestamp = timestamp.ok_or(VerifyError::MissingHeader(TIMESTAMP_HEADER))?;

        let signature_bytes: [u8; 64] = hex::decode(signature_hex.trim())
            .map_err(|_| VerifyError::MalformedSignature)?
            .try_into()
            .map_err(|_| VerifyError::MalformedSignature)?;
        let signature = Signature::from_bytes(&signature_bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).map_err(|_| VerifyError::BadSignature)
    }
}
