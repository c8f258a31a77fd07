use anyhow::{Context, Result};
use std::env;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC secret shared with the identity provider that issues access tokens.
    pub jwt_secret: String,
    /// Expected `iss` claim. Unchecked when unset.
    pub jwt_issuer: Option<String>,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_seconds: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
            leeway_seconds: env::var("JWT_LEEWAY_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}
