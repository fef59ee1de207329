//! Auth surface (spec §4.10, §6): static account table, JWT issue/refresh/
//! verify. Grounded in the original `app/security/auth.py`'s `PyJWT`-based
//! implementation, reimplemented with `jsonwebtoken` (HS256) the way the
//! broader pack (`jeremyandrews-trovato`, `openobserve-openobserve`) uses
//! that crate. Accounts load once at startup and are never mutated
//! afterwards, mirroring `datafusion-postgres`'s `AuthManager` being the
//! read-only-after-seeding shared resource for a session.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// One row of `accounts.json` (spec §6): password check is plain equality
/// against `hashed_password`, matching the original's behavior exactly —
/// this is not a security upgrade, it is the spec's required fidelity.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    BadCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
}

/// The process-wide auth surface: a read-only account table plus a signing
/// key, both loaded once at startup (spec §5 "Shared resources").
pub struct AuthManager {
    accounts: HashMap<String, Account>,
    secret: String,
    expire_minutes: i64,
}

impl AuthManager {
    pub fn load(accounts_path: &Path, secret: String, expire_minutes: i64) -> std::io::Result<Self> {
        let raw = fs::read_to_string(accounts_path)?;
        let accounts: HashMap<String, Account> = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(AuthManager { accounts, secret, expire_minutes })
    }

    #[cfg(test)]
    fn in_memory(accounts: HashMap<String, Account>, secret: String, expire_minutes: i64) -> Self {
        AuthManager { accounts, secret, expire_minutes }
    }

    /// `issue(credentials, db) -> token` (spec §4.10). `db` is validated by
    /// the caller (the `/auth/connect` handler checks it against the
    /// catalog); this only checks the username/password pair.
    pub fn issue(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let account = self.accounts.get(username).ok_or(AuthError::BadCredentials)?;
        if account.hashed_password != password {
            return Err(AuthError::BadCredentials);
        }
        self.sign(username)
    }

    /// `refresh(principal) -> token` (spec §4.10): re-issues with a fresh
    /// expiration for an already-valid token's subject.
    pub fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let subject = self.principal_of(token)?;
        self.sign(&subject)
    }

    /// `principal-of(token)` (spec §4.10): verifies signature and
    /// expiration, returning the subject.
    pub fn principal_of(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;
        Ok(data.claims.sub)
    }

    fn sign(&self, username: &str) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::minutes(self.expire_minutes)).timestamp() as usize;
        let claims = Claims { sub: username.to_string(), exp };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> AuthManager {
        let mut accounts = HashMap::new();
        accounts.insert(
            "alice".to_string(),
            Account { username: "alice".to_string(), hashed_password: "secret".to_string() },
        );
        AuthManager::in_memory(accounts, "test-secret".to_string(), 15)
    }

    #[test]
    fn issues_and_verifies_a_token() {
        let mgr = manager();
        let token = mgr.issue("alice", "secret").unwrap();
        assert_eq!(mgr.principal_of(&token).unwrap(), "alice");
    }

    #[test]
    fn rejects_bad_password() {
        let mgr = manager();
        assert!(mgr.issue("alice", "wrong").is_err());
    }

    #[test]
    fn rejects_unknown_user() {
        let mgr = manager();
        assert!(mgr.issue("nobody", "secret").is_err());
    }

    #[test]
    fn refresh_reissues_for_the_same_subject() {
        let mgr = manager();
        let token = mgr.issue("alice", "secret").unwrap();
        let refreshed = mgr.refresh(&token).unwrap();
        assert_eq!(mgr.principal_of(&refreshed).unwrap(), "alice");
    }

    #[test]
    fn rejects_garbage_tokens() {
        let mgr = manager();
        assert!(mgr.principal_of("not-a-jwt").is_err());
    }
}
