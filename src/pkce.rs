use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Challenge method advertised alongside the challenge.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// PKCE pair for one code-flow authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    /// Fresh verifier and its S256 challenge.
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Generates a code verifier at the RFC 7636 maximum length.
///
/// 96 random bytes encode to exactly 128 URL-safe characters.
#[must_use]
pub fn generate_code_verifier() -> String {
    let random_bytes: [u8; 96] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// `challenge = BASE64URL(SHA256(verifier))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random `state` value echoed back by the accounts service.
///
/// 16 random bytes, 22 URL-safe characters.
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
