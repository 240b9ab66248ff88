use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use surrealdb::sql::Datetime;

use crate::utils::crypto::generate_uuid;

use super::{BindValue, StoreError, SurrealTx};

/// One session per (user, device). The refresh token itself is never stored,
/// only its keyed hash.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    // TODO: Fold more signals than the User-Agent into the fingerprint
    pub device_fingerprint: String,
    pub refresh_token_hash: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: String,
    pub device_fingerprint: String,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait SessionStore {
    async fn get_session_by_device(
        &self,
        user_id: &str,
        device_fingerprint: &str,
    ) -> Result<Option<Session>, StoreError>;
    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError>;
    async fn create_session(&self, new_session: NewSession) -> Result<Session, StoreError>;
    /// Reclaims an existing (user, device) row on a fresh login.
    async fn refresh_session(
        &self,
        session_id: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Swaps the stored hash, guarded by the hash the caller validated
    /// against. A concurrent rotation makes the guard fail instead of
    /// silently double-rotating.
    async fn rotate_session(
        &self,
        session_id: &str,
        expected_hash: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn revoke_session(&self, session_id: &str) -> Result<(), StoreError>;
    async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Deserialize)]
struct SessionRecord {
    id: String,
    user_id: String,
    device_fingerprint: String,
    refresh_token_hash: String,
    revoked: bool,
    expires_at: Datetime,
    created_at: Datetime,
    updated_at: Datetime,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Session {
            id: record.id,
            user_id: record.user_id,
            device_fingerprint: record.device_fingerprint,
            refresh_token_hash: record.refresh_token_hash,
            revoked: record.revoked,
            expires_at: record.expires_at.0,
            created_at: record.created_at.0,
            updated_at: record.updated_at.0,
        }
    }
}

const SESSION_PROJECTION: &str = "*, meta::id(id) AS id";

#[async_trait]
impl SessionStore for SurrealTx {
    async fn get_session_by_device(
        &self,
        user_id: &str,
        device_fingerprint: &str,
    ) -> Result<Option<Session>, StoreError> {
        let query = format!(
            r#"
            SELECT {SESSION_PROJECTION} FROM session
            WHERE user_id = $user_id AND device_fingerprint = $device_fingerprint
            LIMIT 1;
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("device_fingerprint", device_fingerprint.to_string()))
            .await
            .map_err(StoreError::from)?;

        let record: Option<SessionRecord> = response.take(0).map_err(StoreError::from)?;

        Ok(record.map(Session::from))
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let query = format!(
            r#"
            SELECT {SESSION_PROJECTION} FROM session
            WHERE user_id = $user_id;
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let records: Vec<SessionRecord> = response.take(0).map_err(StoreError::from)?;

        Ok(records.into_iter().map(Session::from).collect())
    }

    async fn create_session(&self, new_session: NewSession) -> Result<Session, StoreError> {
        let id = generate_uuid();
        let now = Utc::now();
        let p = self.bind_prefix();

        let query = format!(
            r#"
            CREATE type::thing('session', ${p}id) CONTENT {{
                user_id: ${p}user_id,
                device_fingerprint: ${p}device_fingerprint,
                refresh_token_hash: ${p}refresh_token_hash,
                revoked: false,
                expires_at: ${p}expires_at,
                created_at: ${p}now,
                updated_at: ${p}now
            }};
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}id"), BindValue::Str(id.clone())),
                (
                    format!("{p}user_id"),
                    BindValue::Str(new_session.user_id.clone()),
                ),
                (
                    format!("{p}device_fingerprint"),
                    BindValue::Str(new_session.device_fingerprint.clone()),
                ),
                (
                    format!("{p}refresh_token_hash"),
                    BindValue::Str(new_session.refresh_token_hash.clone()),
                ),
                (
                    format!("{p}expires_at"),
                    BindValue::Datetime(Datetime::from(new_session.expires_at)),
                ),
                (format!("{p}now"), BindValue::Datetime(Datetime::from(now))),
            ],
        );

        Ok(Session {
            id,
            user_id: new_session.user_id,
            device_fingerprint: new_session.device_fingerprint,
            refresh_token_hash: new_session.refresh_token_hash,
            revoked: false,
            expires_at: new_session.expires_at,
            created_at: now,
            updated_at: now,
        })
    }

    async fn refresh_session(
        &self,
        session_id: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            UPDATE type::thing('session', ${p}id) SET
                refresh_token_hash = ${p}refresh_token_hash,
                revoked = false,
                expires_at = ${p}expires_at,
                updated_at = ${p}now;
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}id"), BindValue::Str(session_id.to_string())),
                (
                    format!("{p}refresh_token_hash"),
                    BindValue::Str(refresh_token_hash.to_string()),
                ),
                (
                    format!("{p}expires_at"),
                    BindValue::Datetime(Datetime::from(expires_at)),
                ),
                (
                    format!("{p}now"),
                    BindValue::Datetime(Datetime::from(Utc::now())),
                ),
            ],
        );

        Ok(())
    }

    async fn rotate_session(
        &self,
        session_id: &str,
        expected_hash: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            IF (SELECT VALUE refresh_token_hash FROM ONLY type::thing('session', ${p}id)) != ${p}expected_hash {{
                THROW "session rotation conflict";
            }};
            UPDATE type::thing('session', ${p}id) SET
                refresh_token_hash = ${p}refresh_token_hash,
                expires_at = ${p}expires_at,
                updated_at = ${p}now;
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}id"), BindValue::Str(session_id.to_string())),
                (
                    format!("{p}expected_hash"),
                    BindValue::Str(expected_hash.to_string()),
                ),
                (
                    format!("{p}refresh_token_hash"),
                    BindValue::Str(refresh_token_hash.to_string()),
                ),
                (
                    format!("{p}expires_at"),
                    BindValue::Datetime(Datetime::from(expires_at)),
                ),
                (
                    format!("{p}now"),
                    BindValue::Datetime(Datetime::from(Utc::now())),
                ),
            ],
        );

        Ok(())
    }

    async fn revoke_session(&self, session_id: &str) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            UPDATE type::thing('session', ${p}id)
            SET revoked = true, updated_at = ${p}now;
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}id"), BindValue::Str(session_id.to_string())),
                (
                    format!("{p}now"),
                    BindValue::Datetime(Datetime::from(Utc::now())),
                ),
            ],
        );

        Ok(())
    }

    async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            UPDATE session
            SET revoked = true, updated_at = ${p}now
            WHERE user_id = ${p}user_id;
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}user_id"), BindValue::Str(user_id.to_string())),
                (
                    format!("{p}now"),
                    BindValue::Datetime(Datetime::from(Utc::now())),
                ),
            ],
        );

        Ok(())
    }
}
