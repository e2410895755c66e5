use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sha2::{Digest, Sha256};
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

const TOKEN_ISSUER: &str = "yatube";
const SESSION_TOKEN_TYPE: &str = "session";

/// The user a valid session token belongs to.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    session_key: [u8; 32],
    session_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, session_key: [u8; 32], session_ttl_hours: u64) -> Self {
        Self {
            db,
            session_key,
            session_ttl_hours,
        }
    }

    pub async fn signup(
        &self,
        username: String,
        email: Option<String>,
        password: String,
    ) -> Result<User> {
        let password_hash = hash_password(&password)?;
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING id, username, email, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await?;

        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        })
    }

    /// Opens a session when the credentials match; `None` otherwise.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_id: Uuid = row.get("id");
        let password_hash: String = row.get("password_hash");
        if password_hash.is_empty() {
            return Ok(None);
        }

        if !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let session = self.create_session(user_id).await?;
        Ok(Some(session))
    }

    pub async fn create_session(&self, user_id: Uuid) -> Result<Session> {
        let session_id = Uuid::new_v4();
        let (claims, expires_at) = self.build_session_claims(user_id, session_id)?;
        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(self.db.pool())
        .await?;

        Ok(Session { token, expires_at })
    }

    pub async fn authenticate_session(&self, token: &str) -> Result<Option<SessionUser>> {
        let (user_id, session_id) = match self.verify_session_token(token)? {
            Some(ids) => ids,
            None => return Ok(None),
        };

        let row = sqlx::query(
            "SELECT u.id, u.username \
             FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.id = $1 \
               AND s.user_id = $2 \
               AND s.token_hash = $3 \
               AND s.revoked_at IS NULL \
               AND s.expires_at > now()",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(hash_token(token))
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| SessionUser {
            user_id: row.get("id"),
            username: row.get("username"),
        }))
    }

    pub async fn revoke_session(&self, token: &str) -> Result<bool> {
        let (user_id, session_id) = match self.verify_session_token(token)? {
            Some(ids) => ids,
            None => return Ok(false),
        };

        let result = sqlx::query(
            "UPDATE sessions \
             SET revoked_at = now() \
             WHERE id = $1 AND user_id = $2 AND token_hash = $3 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(hash_token(token))
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    fn build_session_claims(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<(Claims, OffsetDateTime)> {
        let ttl_seconds = self
            .session_ttl_hours
            .checked_mul(60 * 60)
            .and_then(|seconds| i64::try_from(seconds).ok())
            .ok_or_else(|| anyhow!("session ttl of {} hours is too long", self.session_ttl_hours))?;
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(Duration::seconds(ttl_seconds))
            .ok_or_else(|| anyhow!("session expiry out of range"))?;

        let duration = std::time::Duration::from_secs(ttl_seconds as u64);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(&user_id.to_string())?;
        claims.token_identifier(&session_id.to_string())?;
        claims.add_additional("typ", SESSION_TOKEN_TYPE)?;
        Ok((claims, expires_at))
    }

    /// `(user_id, session_id)` for a token that decrypts and has not expired.
    fn verify_session_token(&self, token: &str) -> Result<Option<(Uuid, Uuid)>> {
        let key = SymmetricKey::<V4>::from(&self.session_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let claims = match trusted.payload_claims() {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(claims, SESSION_TOKEN_TYPE) {
            return Ok(None);
        }

        let user_id = claim_uuid(claims, "sub")?;
        let session_id = claim_uuid(claims, "jti")?;
        Ok(Some((user_id, session_id)))
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}
