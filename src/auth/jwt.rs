//! Bearer token verification.
//!
//! Token issuance belongs to the identity provider; this service only
//! verifies signatures and extracts the tenant identity. Generation helpers
//! exist for tests and operator tooling.

use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub tenant_id: String,
    pub company_id: Option<String>,
    pub role: Option<String>,
}

/// Verified token contents. `sub` is the caller's user id, `tenant_id`
/// scopes every query the request runs.
#[derive(Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub tenant_id: String,
    pub company_id: Option<String>,
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtConfig {
    key_pair: Arc<Ed25519KeyPair>,
    public_key: Arc<Ed25519PublicKey>,
    pub access_token_expiry: i64,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    /// Expects JWT_PRIVATE_KEY env var (base64-encoded Ed25519 key).
    pub fn from_env(issuer: Option<String>, audience: Option<String>) -> Self {
        use base64::Engine;

        let private_key_b64 =
            std::env::var("JWT_PRIVATE_KEY").expect("JWT_PRIVATE_KEY must be set");

        let key_bytes = base64::engine::general_purpose::STANDARD
            .decode(&private_key_b64)
            .expect("JWT_PRIVATE_KEY must be valid base64");

        let key_pair = Ed25519KeyPair::from_bytes(&key_bytes)
            .expect("JWT_PRIVATE_KEY must be a valid Ed25519 key");

        let public_key = key_pair.public_key();

        Self {
            key_pair: Arc::new(key_pair),
            public_key: Arc::new(public_key),
            access_token_expiry: 3600,
            issuer,
            audience,
        }
    }

    pub fn from_key_pair(key_pair: Ed25519KeyPair) -> Self {
        let public_key = key_pair.public_key();
        Self {
            key_pair: Arc::new(key_pair),
            public_key: Arc::new(public_key),
            access_token_expiry: 3600,
            issuer: None,
            audience: None,
        }
    }

    pub fn generate_key_pair() -> (String, String) {
        use base64::Engine;

        let key_pair = Ed25519KeyPair::generate();
        let private_b64 = base64::engine::general_purpose::STANDARD.encode(key_pair.to_bytes());
        let public_b64 =
            base64::engine::general_purpose::STANDARD.encode(key_pair.public_key().to_bytes());
        (private_b64, public_b64)
    }

    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        company_id: Option<Uuid>,
        role: Option<String>,
    ) -> Result<String, jwt_simple::Error> {
        let custom_claims = AccessClaims {
            tenant_id: tenant_id.to_string(),
            company_id: company_id.map(|id| id.to_string()),
            role,
        };

        let mut claims = jwt_simple::claims::Claims::with_custom_claims(
            custom_claims,
            Duration::from_secs(self.access_token_expiry as u64),
        )
        .with_subject(user_id.to_string());

        if let Some(issuer) = &self.issuer {
            claims = claims.with_issuer(issuer);
        }
        if let Some(audience) = &self.audience {
            claims = claims.with_audience(audience);
        }

        self.key_pair.sign(claims)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, jwt_simple::Error> {
        let mut options = VerificationOptions::default();
        if let Some(issuer) = &self.issuer {
            options.allowed_issuers = Some(std::collections::HashSet::from([issuer.clone()]));
        }
        if let Some(audience) = &self.audience {
            options.allowed_audiences = Some(std::collections::HashSet::from([audience.clone()]));
        }

        let token_data = self
            .public_key
            .verify_token::<AccessClaims>(token, Some(options))?;

        Ok(Claims {
            sub: token_data.subject.unwrap_or_default(),
            tenant_id: token_data.custom.tenant_id,
            company_id: token_data.custom.company_id,
            role: token_data.custom.role,
            exp: token_data
                .expires_at
                .map(|t| t.as_secs() as i64)
                .unwrap_or(0),
            iat: token_data
                .issued_at
                .map(|t| t.as_secs() as i64)
                .unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        let key_pair = Ed25519KeyPair::generate();
        JwtConfig::from_key_pair(key_pair)
    }

    #[test]
    fn test_generate_and_verify_access_token() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();

        let token = config
            .generate_access_token(user_id, tenant_id, None, None)
            .expect("Token generation should succeed");

        let claims = config
            .verify_access_token(&token)
            .expect("Token verification should succeed");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.tenant_id, tenant_id.to_string());
        assert!(claims.company_id.is_none());
        assert!(claims.role.is_none());
    }

    #[test]
    fn test_access_token_with_company_and_role() {
        let config = test_config();
        let company_id = Uuid::new_v4();

        let token = config
            .generate_access_token(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Some(company_id),
                Some("admin".to_string()),
            )
            .expect("Token generation should succeed");

        let claims = config.verify_access_token(&token).unwrap();
        assert_eq!(claims.company_id, Some(company_id.to_string()));
        assert_eq!(claims.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_verify_rejects_foreign_key() {
        let signer = test_config();
        let verifier = test_config();

        let token = signer
            .generate_access_token(Uuid::new_v4(), Uuid::new_v4(), None, None)
            .unwrap();

        assert!(verifier.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let config = test_config();
        assert!(config.verify_access_token("not-a-token").is_err());
    }
}
