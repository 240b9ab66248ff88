use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use surrealdb::sql::Datetime;

use crate::utils::crypto::generate_uuid;

use super::{BindValue, StoreError, SurrealTx};

/// The two OTP workflows share one table, discriminated by kind. Codes from
/// one workflow can never satisfy the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    AccountVerification,
    PasswordReset,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::AccountVerification => "account_verification",
            CodeKind::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub id: String,
    pub user_id: String,
    pub code: String,
    pub consumed: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVerificationCode {
    pub user_id: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait VerificationCodeStore {
    /// Issues a code, guarded by the per-day cap so concurrent requests
    /// cannot mint more than `daily_cap` codes between them.
    async fn create_code(
        &self,
        kind: CodeKind,
        new_code: NewVerificationCode,
        daily_cap: u32,
    ) -> Result<VerificationCode, StoreError>;
    async fn latest_code(
        &self,
        kind: CodeKind,
        user_id: &str,
    ) -> Result<Option<VerificationCode>, StoreError>;
    /// Single use. Consuming an already-consumed code is a conflict.
    async fn consume_code(&self, kind: CodeKind, code_id: &str) -> Result<(), StoreError>;
    async fn count_codes_today(&self, kind: CodeKind, user_id: &str) -> Result<u32, StoreError>;
}

/// Rate limiting counts per calendar day (UTC), not per rolling 24 hours.
pub(crate) fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

#[derive(Debug, Deserialize)]
struct VerificationCodeRecord {
    id: String,
    user_id: String,
    code: String,
    consumed: bool,
    expires_at: Datetime,
    created_at: Datetime,
}

impl From<VerificationCodeRecord> for VerificationCode {
    fn from(record: VerificationCodeRecord) -> Self {
        VerificationCode {
            id: record.id,
            user_id: record.user_id,
            code: record.code,
            consumed: record.consumed,
            expires_at: record.expires_at.0,
            created_at: record.created_at.0,
        }
    }
}

#[async_trait]
impl VerificationCodeStore for SurrealTx {
    async fn create_code(
        &self,
        kind: CodeKind,
        new_code: NewVerificationCode,
        daily_cap: u32,
    ) -> Result<VerificationCode, StoreError> {
        let id = generate_uuid();
        let now = Utc::now();
        let p = self.bind_prefix();

        let query = format!(
            r#"
            IF array::len((
                SELECT id FROM verification_code
                WHERE kind = ${p}kind AND user_id = ${p}user_id AND created_at >= ${p}day_start
            )) >= ${p}cap {{
                THROW "daily code cap exceeded";
            }};
            CREATE type::thing('verification_code', ${p}id) CONTENT {{
                kind: ${p}kind,
                user_id: ${p}user_id,
                code: ${p}code,
                consumed: false,
                expires_at: ${p}expires_at,
                created_at: ${p}now
            }};
            "#
        );

        self.stage(
            query,
            vec![
                (format!("{p}id"), BindValue::Str(id.clone())),
                (format!("{p}kind"), BindValue::Str(kind.as_str().to_string())),
                (
                    format!("{p}user_id"),
                    BindValue::Str(new_code.user_id.clone()),
                ),
                (format!("{p}code"), BindValue::Str(new_code.code.clone())),
                (
                    format!("{p}expires_at"),
                    BindValue::Datetime(Datetime::from(new_code.expires_at)),
                ),
                (
                    format!("{p}day_start"),
                    BindValue::Datetime(Datetime::from(start_of_day(now))),
                ),
                (format!("{p}cap"), BindValue::Int(i64::from(daily_cap))),
                (format!("{p}now"), BindValue::Datetime(Datetime::from(now))),
            ],
        );

        Ok(VerificationCode {
            id,
            user_id: new_code.user_id,
            code: new_code.code,
            consumed: false,
            expires_at: new_code.expires_at,
            created_at: now,
        })
    }

    async fn latest_code(
        &self,
        kind: CodeKind,
        user_id: &str,
    ) -> Result<Option<VerificationCode>, StoreError> {
        let query = r#"
            SELECT *, meta::id(id) AS id FROM verification_code
            WHERE kind = $kind AND user_id = $user_id
            ORDER BY created_at DESC
            LIMIT 1;
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("kind", kind.as_str().to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let record: Option<VerificationCodeRecord> = response.take(0).map_err(StoreError::from)?;

        Ok(record.map(VerificationCode::from))
    }

    async fn consume_code(&self, _kind: CodeKind, code_id: &str) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let query = format!(
            r#"
            IF (SELECT VALUE consumed FROM ONLY type::thing('verification_code', ${p}id)) = true {{
                THROW "code already consumed";
            }};
            UPDATE type::thing('verification_code', ${p}id) SET consumed = true;
            "#
        );

        self.stage(
            query,
            vec![(format!("{p}id"), BindValue::Str(code_id.to_string()))],
        );

        Ok(())
    }

    async fn count_codes_today(&self, kind: CodeKind, user_id: &str) -> Result<u32, StoreError> {
        let query = r#"
            SELECT VALUE meta::id(id) FROM verification_code
            WHERE kind = $kind AND user_id = $user_id AND created_at >= $day_start;
        "#;

        let mut response = self
            .db
            .query(query)
            .bind(("kind", kind.as_str().to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("day_start", Datetime::from(start_of_day(Utc::now()))))
            .await
            .map_err(StoreError::from)?;

        let ids: Vec<String> = response.take(0).map_err(StoreError::from)?;

        Ok(ids.len() as u32)
    }
}
