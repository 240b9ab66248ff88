use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Datetime;

use crate::utils::crypto::generate_uuid;

use super::{BindValue, StoreError, SurrealTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait UserStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn get_user(&self, user_id: &str) -> Result<User, StoreError>;
    async fn update_user_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: Option<String>,
    avatar_url: Option<String>,
    role: Role,
    created_at: Datetime,
    updated_at: Datetime,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            phone_number: record.phone_number,
            avatar_url: record.avatar_url,
            role: record.role,
            created_at: record.created_at.0,
            updated_at: record.updated_at.0,
        }
    }
}

const USER_PROJECTION: &str = "*, meta::id(id) AS id";

#[async_trait]
impl UserStore for SurrealTx {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let id = generate_uuid();
        let now = Utc::now();
        let p = self.bind_prefix();

        let mut binds = vec![
            (format!("{p}id"), BindValue::Str(id.clone())),
            (
                format!("{p}first_name"),
                BindValue::Str(new_user.first_name.clone()),
            ),
            (
                format!("{p}last_name"),
                BindValue::Str(new_user.last_name.clone()),
            ),
            (format!("{p}email"), BindValue::Str(new_user.email.clone())),
            (
                format!("{p}role"),
                BindValue::Str(new_user.role.as_str().to_string()),
            ),
            (format!("{p}now"), BindValue::Datetime(Datetime::from(now))),
        ];

        let phone_number = match &new_user.phone_number {
            Some(phone_number) => {
                binds.push((
                    format!("{p}phone_number"),
                    BindValue::Str(phone_number.clone()),
                ));
                format!("${p}phone_number")
            }
            None => String::from("NONE"),
        };

        let avatar_url = match &new_user.avatar_url {
            Some(avatar_url) => {
                binds.push((format!("{p}avatar_url"), BindValue::Str(avatar_url.clone())));
                format!("${p}avatar_url")
            }
            None => String::from("NONE"),
        };

        let query = format!(
            r#"
            CREATE type::thing('user', ${p}id) CONTENT {{
                first_name: ${p}first_name,
                last_name: ${p}last_name,
                email: ${p}email,
                phone_number: {phone_number},
                avatar_url: {avatar_url},
                role: ${p}role,
                created_at: ${p}now,
                updated_at: ${p}now
            }};
            "#
        );

        self.stage(query, binds);

        Ok(User {
            id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            phone_number: new_user.phone_number,
            avatar_url: new_user.avatar_url,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!(
            r#"
            SELECT {USER_PROJECTION} FROM user
            WHERE email = $email
            LIMIT 1;
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("email", email.to_string()))
            .await
            .map_err(StoreError::from)?;

        let record: Option<UserRecord> = response.take(0).map_err(StoreError::from)?;

        Ok(record.map(User::from))
    }

    async fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        let query = format!(
            r#"
            SELECT {USER_PROJECTION} FROM type::thing('user', $user_id);
            "#
        );

        let mut response = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let record: Option<UserRecord> = response.take(0).map_err(StoreError::from)?;

        record.map(User::from).ok_or(StoreError::NotFound)
    }

    async fn update_user_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<(), StoreError> {
        let p = self.bind_prefix();

        let mut sets = vec![format!("updated_at = ${p}now")];
        let mut binds = vec![
            (format!("{p}id"), BindValue::Str(user_id.to_string())),
            (
                format!("{p}now"),
                BindValue::Datetime(Datetime::from(Utc::now())),
            ),
        ];

        if let Some(first_name) = update.first_name {
            sets.push(format!("first_name = ${p}first_name"));
            binds.push((format!("{p}first_name"), BindValue::Str(first_name)));
        }
        if let Some(last_name) = update.last_name {
            sets.push(format!("last_name = ${p}last_name"));
            binds.push((format!("{p}last_name"), BindValue::Str(last_name)));
        }
        if let Some(avatar_url) = update.avatar_url {
            sets.push(format!("avatar_url = ${p}avatar_url"));
            binds.push((format!("{p}avatar_url"), BindValue::Str(avatar_url)));
        }

        let query = format!(
            "UPDATE type::thing('user', ${p}id) SET {};",
            sets.join(", ")
        );

        self.stage(query, binds);

        Ok(())
    }
}
