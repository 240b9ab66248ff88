use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use surrealdb::sql::Datetime;

use crate::utils::crypto::generate_uuid;

use super::{BindValue, StoreError, SurrealTx};

/// Link between a local account and an external identity provider account.
#[derive(Debug, Clone)]
pub struct OauthLink {
    pub user_id: String,
    pub provider: String,
    pub provider_user_id: String,
}

#[async_trait]
pub trait OauthLinkStore {
    async fn find_oauth_link(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OauthLink>, StoreError>;
    async fn create_oauth_link(
        &self,
        user_id: &str,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Deserialize)]
struct OauthLinkRecord {
    user_id: String,
    provider: String,
    provider_user_id: String,
}

impl From<OauthLinkRecord> for OauthLink {
    fn from(record: OauthLinkRecord) -> Self {
        OauthLink {
            user_id: record.user_id,
            provider: record.provider,
            provider_user_id: record.provider_user_id,
        }
    }
}

#[async_trait]
impl OauthLinkStore for SurrealTx {
    async fn find_oauth_link(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OauthLink>, StoreError> {
        let query = r#"
            SELECT user_id, provider, provider_user_id FROM oauth_link
            WHERE provider = $provider AND provider_user_id = $provider_user_id
            LIMIT 1;
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("provider", provider.to_string()))
            .bind(("provider_user_id", provider_user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let record: Option<OauthLinkRecord> = response.take(0).map_err(StoreError::from)?;

        Ok(record.map(OauthLink::from))
    }

    async fn create_oauth_link(
        &self,
        user_id: &str,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<(), StoreError> {
        let id = generate_uuid();
        let p = self.bind_prefix();

        let query = format!(
            r#"
            CREATE type::thing('oauth_link', ${p}id) CONTENT {{
                user_id: ${p}user_id,
                provider: ${p}provider,
                provider_user_id: ${p}provider_user_id,
                created_at: ${p}now
            }};
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}id"), BindValue::Str(id)),
                (format!("{p}user_id"), BindValue::Str(user_id.to_string())),
                (format!("{p}provider"), BindValue::Str(provider.to_string())),
                (
                    format!("{p}provider_user_id"),
                    BindValue::Str(provider_user_id.to_string()),
                ),
                (
                    format!("{p}now"),
                    BindValue::Datetime(Datetime::from(Utc::now())),
                ),
            ],
        );

        Ok(())
    }
}
