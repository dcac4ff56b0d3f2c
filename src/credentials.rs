//! Twitter API credentials and where they come from.

use std::collections::HashMap;

use crate::config::ConfigError;

pub const BEARER_TOKEN_KEY: &str = "twitter_bearer_token";
pub const API_KEY_KEY: &str = "twitter_api_key";
pub const API_KEY_SECRET_KEY: &str = "twitter_api_key_secret";
pub const ACCESS_TOKEN_KEY: &str = "twitter_access_token";
pub const ACCESS_TOKEN_SECRET_KEY: &str = "twitter_access_token_secret";

/// A store of named secrets.
pub trait CredentialSource: Send + Sync {
    /// Look up a secret by key. Empty values count as missing.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads secrets from environment variables named after the upper-cased key.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialSource;

impl CredentialSource for EnvCredentialSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key.to_ascii_uppercase())
            .ok()
            .filter(|s| !s.is_empty())
    }
}

impl CredentialSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).filter(|s| !s.is_empty()).cloned()
    }
}

/// The five secrets a Twitter client is built from.
///
/// Only the bearer token is sent on the read-only endpoints this job uses; the
/// user-context keys are still required so a misconfigured deployment fails
/// before any request is made.
#[derive(Clone)]
pub struct Credentials {
    pub bearer_token: String,
    pub api_key: String,
    pub api_key_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    /// Resolve all five secrets from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming the first absent key.
    pub fn load(source: &dyn CredentialSource) -> Result<Self, ConfigError> {
        let fetch = |key: &str| {
            source
                .get(key)
                .ok_or_else(|| ConfigError::MissingCredential(key.to_string()))
        };

        Ok(Self {
            bearer_token: fetch(BEARER_TOKEN_KEY)?,
            api_key: fetch(API_KEY_KEY)?,
            api_key_secret: fetch(API_KEY_SECRET_KEY)?,
            access_token: fetch(ACCESS_TOKEN_KEY)?,
            access_token_secret: fetch(ACCESS_TOKEN_SECRET_KEY)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("api_key_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}
