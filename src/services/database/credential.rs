use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use surrealdb::sql::Datetime;

use super::{BindValue, StoreError, SurrealTx};

/// Local password credential, one row per user. OAuth-only accounts have no
/// credential row at all.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: String,
    pub verified: bool,
    pub password_hash: String,
}

#[async_trait]
pub trait CredentialStore {
    async fn create_credential(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), StoreError>;
    async fn get_credential(&self, user_id: &str) -> Result<Credential, StoreError>;
    async fn mark_verified(&self, user_id: &str) -> Result<(), StoreError>;
    async fn update_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        verified: bool,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Deserialize)]
struct CredentialRecord {
    user_id: String,
    verified: bool,
    password_hash: String,
}

impl From<CredentialRecord> for Credential {
    fn from(record: CredentialRecord) -> Self {
        Credential {
            user_id: record.user_id,
            verified: record.verified,
            password_hash: record.password_hash,
        }
    }
}

// Credential rows share their id with the owning user.
#[async_trait]
impl CredentialStore for SurrealTx {
    async fn create_credential(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            CREATE type::thing('credential', ${p}user_id) CONTENT {{
                user_id: ${p}user_id,
                password_hash: ${p}password_hash,
                verified: false,
                created_at: ${p}now,
                updated_at: ${p}now
            }};
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}user_id"), BindValue::Str(user_id.to_string())),
                (
                    format!("{p}password_hash"),
                    BindValue::Str(password_hash.to_string()),
                ),
                (
                    format!("{p}now"),
                    BindValue::Datetime(Datetime::from(Utc::now())),
                ),
            ],
        );

        Ok(())
    }

    async fn get_credential(&self, user_id: &str) -> Result<Credential, StoreError> {
        let query = r#"
            SELECT user_id, verified, password_hash
            FROM type::thing('credential', $user_id);
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let record: Option<CredentialRecord> = response.take(0).map_err(StoreError::from)?;

        record.map(Credential::from).ok_or(StoreError::NotFound)
    }

    async fn mark_verified(&self, user_id: &str) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            UPDATE type::thing('credential', ${p}user_id)
            SET verified = true, updated_at = ${p}now;
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

    async fn update_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        verified: bool,
    ) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            UPDATE type::thing('credential', ${p}user_id)
            SET password_hash = ${p}password_hash, verified = ${p}verified, updated_at = ${p}now;
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}user_id"), BindValue::Str(user_id.to_string())),
                (
                    format!("{p}password_hash"),
                    BindValue::Str(password_hash.to_string()),
                ),
                (format!("{p}verified"), BindValue::Bool(verified)),
                (
                    format!("{p}now"),
                    BindValue::Datetime(Datetime::from(Utc::now())),
                ),
            ],
        );

        Ok(())
    }
}
