use crate::services::error::PixError;
use async_trait::async_trait;
use std::collections::HashMap;
use subtle::ConstantTimeEq;

/// Resolves a bearer token to the user it belongs to.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, bearer_token: &str) -> Result<String, PixError>;
}

/// Token table loaded from configuration (`token -> user id`).
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, bearer_token: &str) -> Result<String, PixError> {
        // Percorre todas as entradas para não vazar tempo de comparação
        let mut matched: Option<&String> = None;
        for (token, user_id) in &self.tokens {
            if secrets_match(token, bearer_token) {
                matched = Some(user_id);
            }
        }

        matched
            .cloned()
            .ok_or_else(|| PixError::Auth("invalid token".to_string()))
    }
}

pub fn secrets_match(expected: &str, provided: &str) -> bool {
    bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, PixError> {
    let header = header.ok_or_else(|| PixError::Auth("missing authorization".to_string()))?;
    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(PixError::Auth("malformed authorization header".to_string())),
    }
}
