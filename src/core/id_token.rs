//! Identity Token Decoding
//!
//! Decodes the `id_token` returned by the token endpoint. With an
//! [`IdTokenVerification`] configured the signature, expiry and (optionally)
//! audience are checked; without one the payload is read as-is, which is
//! acceptable only because the token came straight from the token endpoint
//! over the back channel.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;

use crate::error::{OAuth2Result, ProtocolError};
use crate::types::IdTokenClaims;

/// Key material used to verify identity tokens.
#[derive(Clone)]
pub struct IdTokenVerification {
    key: DecodingKey,
    algorithm: Algorithm,
    audience: Option<String>,
}

impl IdTokenVerification {
    /// Verify with a shared secret (HS256).
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            audience: None,
        }
    }

    /// Verify with an RSA public key in PEM form (RS256).
    pub fn from_rsa_pem(pem: &[u8]) -> OAuth2Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| ProtocolError::InvalidIdToken {
            message: e.to_string(),
        })?;
        Ok(Self {
            key,
            algorithm: Algorithm::RS256,
            audience: None,
        })
    }

    /// Require the `aud` claim to contain this value.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

impl std::fmt::Debug for IdTokenVerification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTokenVerification")
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

/// Decode an identity token into its claims.
///
/// Any failure, including a payload without `sub`, is a protocol error.
pub fn decode_id_token(
    token: &str,
    verification: Option<&IdTokenVerification>,
) -> OAuth2Result<IdTokenClaims> {
    let (key, validation) = match verification {
        Some(v) => (v.key.clone(), v.validation()),
        None => {
            let mut validation = Validation::new(Algorithm::HS256);
            validation.insecure_disable_signature_validation();
            validation.validate_exp = false;
            validation.validate_aud = false;
            validation.required_spec_claims = HashSet::new();
            (DecodingKey::from_secret(&[]), validation)
        }
    };

    let data = decode::<IdTokenClaims>(token, &key, &validation).map_err(|e| {
        ProtocolError::InvalidIdToken {
            message: e.to_string(),
        }
    })?;

    Ok(data.claims)
}
