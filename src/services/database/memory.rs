//! In-memory store used by the engine tests. Transactions are fully
//! serialized: `begin` holds the state lock, work happens on a clone, and
//! `commit` writes the clone back. Dropping an uncommitted transaction
//! leaves the shared state untouched.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::utils::crypto::generate_uuid;

use super::credential::{Credential, CredentialStore};
use super::oauth_link::{OauthLink, OauthLinkStore};
use super::session::{NewSession, Session, SessionStore};
use super::user::{NewUser, ProfileUpdate, User, UserStore};
use super::verification_code::{
    start_of_day, CodeKind, NewVerificationCode, VerificationCode, VerificationCodeStore,
};
use super::{AuthStore, AuthTx, StoreError};

#[derive(Debug, Default, Clone)]
struct MemState {
    users: Vec<User>,
    credentials: Vec<Credential>,
    sessions: Vec<Session>,
    codes: Vec<(CodeKind, VerificationCode)>,
    oauth_links: Vec<OauthLink>,
}

#[derive(Clone, Default)]
pub struct MemAuthStore {
    state: Arc<AsyncMutex<MemState>>,
}

impl MemAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemAuthStore {
    async fn begin(&self) -> Result<Box<dyn AuthTx>, StoreError> {
        let shared = self.state.clone().lock_owned().await;
        let work = Mutex::new(shared.clone());
        Ok(Box::new(MemTx { shared, work }))
    }
}

pub struct MemTx {
    shared: OwnedMutexGuard<MemState>,
    work: Mutex<MemState>,
}

impl MemTx {
    fn with_state<R>(&self, f: impl FnOnce(&mut MemState) -> R) -> R {
        let mut state = self.work.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

#[async_trait]
impl AuthTx for MemTx {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut shared = this.shared;
        *shared = this.work.into_inner().unwrap_or_else(|e| e.into_inner());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemTx {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.with_state(|state| {
            if state.users.iter().any(|u| u.email == new_user.email) {
                return Err(StoreError::AlreadyExists);
            }

            let now = Utc::now();
            let user = User {
                id: generate_uuid(),
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                email: new_user.email,
                phone_number: new_user.phone_number,
                avatar_url: new_user.avatar_url,
                role: new_user.role,
                created_at: now,
                updated_at: now,
            };
            state.users.push(user.clone());
            Ok(user)
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.with_state(|state| Ok(state.users.iter().find(|u| u.email == email).cloned()))
    }

    async fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        self.with_state(|state| {
            state
                .users
                .iter()
                .find(|u| u.id == user_id)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
    }

    async fn update_user_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let user = state
                .users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or(StoreError::NotFound)?;

            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name;
            }
            if let Some(avatar_url) = update.avatar_url {
                user.avatar_url = Some(avatar_url);
            }
            user.updated_at = Utc::now();
            Ok(())
        })
    }
}

#[async_trait]
impl CredentialStore for MemTx {
    async fn create_credential(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            if state.credentials.iter().any(|c| c.user_id == user_id) {
                return Err(StoreError::AlreadyExists);
            }
            state.credentials.push(Credential {
                user_id: user_id.to_string(),
                verified: false,
                password_hash: password_hash.to_string(),
            });
            Ok(())
        })
    }

    async fn get_credential(&self, user_id: &str) -> Result<Credential, StoreError> {
        self.with_state(|state| {
            state
                .credentials
                .iter()
                .find(|c| c.user_id == user_id)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
    }

    async fn mark_verified(&self, user_id: &str) -> Result<(), StoreError> {
        self.with_state(|state| {
            let credential = state
                .credentials
                .iter_mut()
                .find(|c| c.user_id == user_id)
                .ok_or(StoreError::NotFound)?;
            credential.verified = true;
            Ok(())
        })
    }

    async fn update_credential(
        &self,
        user_id: &str,
        password_hash: &str,
        verified: bool,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let credential = state
                .credentials
                .iter_mut()
                .find(|c| c.user_id == user_id)
                .ok_or(StoreError::NotFound)?;
            credential.password_hash = password_hash.to_string();
            credential.verified = verified;
            Ok(())
        })
    }
}

#[async_trait]
impl SessionStore for MemTx {
    async fn get_session_by_device(
        &self,
        user_id: &str,
        device_fingerprint: &str,
    ) -> Result<Option<Session>, StoreError> {
        self.with_state(|state| {
            Ok(state
                .sessions
                .iter()
                .find(|s| s.user_id == user_id && s.device_fingerprint == device_fingerprint)
                .cloned())
        })
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        self.with_state(|state| {
            Ok(state
                .sessions
                .iter()
                .filter(|s| s.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<Session, StoreError> {
        self.with_state(|state| {
            if state.sessions.iter().any(|s| {
                s.user_id == new_session.user_id
                    && s.device_fingerprint == new_session.device_fingerprint
            }) {
                return Err(StoreError::AlreadyExists);
            }

            let now = Utc::now();
            let session = Session {
                id: generate_uuid(),
                user_id: new_session.user_id,
                device_fingerprint: new_session.device_fingerprint,
                refresh_token_hash: new_session.refresh_token_hash,
                revoked: false,
                expires_at: new_session.expires_at,
                created_at: now,
                updated_at: now,
            };
            state.sessions.push(session.clone());
            Ok(session)
        })
    }

    async fn refresh_session(
        &self,
        session_id: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let session = state
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or(StoreError::NotFound)?;
            session.refresh_token_hash = refresh_token_hash.to_string();
            session.revoked = false;
            session.expires_at = expires_at;
            session.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn rotate_session(
        &self,
        session_id: &str,
        expected_hash: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let session = state
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or(StoreError::NotFound)?;
            if session.refresh_token_hash != expected_hash {
                return Err(StoreError::Conflict);
            }
            session.refresh_token_hash = refresh_token_hash.to_string();
            session.expires_at = expires_at;
            session.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn revoke_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.with_state(|state| {
            let session = state
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or(StoreError::NotFound)?;
            session.revoked = true;
            session.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn revoke_all_sessions(&self, user_id: &str) -> Result<(), StoreError> {
        self.with_state(|state| {
            for session in state.sessions.iter_mut().filter(|s| s.user_id == user_id) {
                session.revoked = true;
                session.updated_at = Utc::now();
            }
            Ok(())
        })
    }
}

#[async_trait]
impl VerificationCodeStore for MemTx {
    async fn create_code(
        &self,
        kind: CodeKind,
        new_code: NewVerificationCode,
        daily_cap: u32,
    ) -> Result<VerificationCode, StoreError> {
        self.with_state(|state| {
            let now = Utc::now();
            let day_start = start_of_day(now);
            let issued_today = state
                .codes
                .iter()
                .filter(|(k, c)| {
                    *k == kind && c.user_id == new_code.user_id && c.created_at >= day_start
                })
                .count() as u32;

            if issued_today >= daily_cap {
                return Err(StoreError::Conflict);
            }

            let code = VerificationCode {
                id: generate_uuid(),
                user_id: new_code.user_id,
                code: new_code.code,
                consumed: false,
                expires_at: new_code.expires_at,
                created_at: now,
            };
            state.codes.push((kind, code.clone()));
            Ok(code)
        })
    }

    async fn latest_code(
        &self,
        kind: CodeKind,
        user_id: &str,
    ) -> Result<Option<VerificationCode>, StoreError> {
        self.with_state(|state| {
            Ok(state
                .codes
                .iter()
                .filter(|(k, c)| *k == kind && c.user_id == user_id)
                .max_by_key(|(_, c)| c.created_at)
                .map(|(_, c)| c.clone()))
        })
    }

    async fn consume_code(&self, kind: CodeKind, code_id: &str) -> Result<(), StoreError> {
        self.with_state(|state| {
            let (_, code) = state
                .codes
                .iter_mut()
                .find(|(k, c)| *k == kind && c.id == code_id)
                .ok_or(StoreError::NotFound)?;
            if code.consumed {
                return Err(StoreError::Conflict);
            }
            code.consumed = true;
            Ok(())
        })
    }

    async fn count_codes_today(&self, kind: CodeKind, user_id: &str) -> Result<u32, StoreError> {
        self.with_state(|state| {
            let day_start = start_of_day(Utc::now());
            Ok(state
                .codes
                .iter()
                .filter(|(k, c)| *k == kind && c.user_id == user_id && c.created_at >= day_start)
                .count() as u32)
        })
    }
}

#[async_trait]
impl OauthLinkStore for MemTx {
    async fn find_oauth_link(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OauthLink>, StoreError> {
        self.with_state(|state| {
            Ok(state
                .oauth_links
                .iter()
                .find(|l| l.provider == provider && l.provider_user_id == provider_user_id)
                .cloned())
        })
    }

    async fn create_oauth_link(
        &self,
        user_id: &str,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            if state
                .oauth_links
                .iter()
                .any(|l| l.provider == provider && l.provider_user_id == provider_user_id)
            {
                return Err(StoreError::AlreadyExists);
            }
            state.oauth_links.push(OauthLink {
                user_id: user_id.to_string(),
                provider: provider.to_string(),
                provider_user_id: provider_user_id.to_string(),
            });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::services::database::user::Role;

    use super::*;

    fn some_user() -> NewUser {
        NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone_number: None,
            avatar_url: None,
            role: Role::User,
        }
    }

    fn some_session(user_id: &str, device: &str) -> NewSession {
        NewSession {
            user_id: user_id.to_string(),
            device_fingerprint: device.to_string(),
            refresh_token_hash: "hash-1".into(),
            expires_at: Utc::now() + Duration::days(30),
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let store = MemAuthStore::new();

        let tx = store.begin().await.unwrap();
        tx.create_user(some_user()).await.unwrap();
        tx.rollback().await.unwrap();

        let tx = store.begin().await.unwrap();
        assert!(tx
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_transactions() {
        let store = MemAuthStore::new();

        let tx = store.begin().await.unwrap();
        tx.create_user(some_user()).await.unwrap();
        tx.commit().await.unwrap();

        let tx = store.begin().await.unwrap();
        assert!(tx
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn duplicate_device_session_is_rejected() {
        let store = MemAuthStore::new();

        let tx = store.begin().await.unwrap();
        tx.create_session(some_session("u1", "Firefox")).await.unwrap();
        let result = tx.create_session(some_session("u1", "Firefox")).await;
        assert_eq!(result.err(), Some(StoreError::AlreadyExists));

        // Different device on the same user is fine.
        tx.create_session(some_session("u1", "Safari")).await.unwrap();
    }

    #[tokio::test]
    async fn rotation_requires_the_expected_hash() {
        let store = MemAuthStore::new();

        let tx = store.begin().await.unwrap();
        let session = tx.create_session(some_session("u1", "Firefox")).await.unwrap();

        let stale = tx
            .rotate_session(&session.id, "not-the-hash", "hash-2", session.expires_at)
            .await;
        assert_eq!(stale, Err(StoreError::Conflict));

        tx.rotate_session(&session.id, "hash-1", "hash-2", session.expires_at)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn codes_are_single_use() {
        let store = MemAuthStore::new();

        let tx = store.begin().await.unwrap();
        let code = tx
            .create_code(
                CodeKind::AccountVerification,
                NewVerificationCode {
                    user_id: "u1".into(),
                    code: "123456".into(),
                    expires_at: Utc::now() + Duration::minutes(10),
                },
                5,
            )
            .await
            .unwrap();

        tx.consume_code(CodeKind::AccountVerification, &code.id)
            .await
            .unwrap();
        let again = tx.consume_code(CodeKind::AccountVerification, &code.id).await;
        assert_eq!(again, Err(StoreError::Conflict));
    }

    #[tokio::test]
    async fn daily_cap_counts_per_kind() {
        let store = MemAuthStore::new();
        let new_code = |code: &str| NewVerificationCode {
            user_id: "u1".into(),
            code: code.into(),
            expires_at: Utc::now() + Duration::minutes(10),
        };

        let tx = store.begin().await.unwrap();
        tx.create_code(CodeKind::AccountVerification, new_code("111111"), 2)
            .await
            .unwrap();
        tx.create_code(CodeKind::AccountVerification, new_code("222222"), 2)
            .await
            .unwrap();

        let over = tx
            .create_code(CodeKind::AccountVerification, new_code("333333"), 2)
            .await;
        assert_eq!(over.err(), Some(StoreError::Conflict));

        // The reset workflow has its own budget.
        tx.create_code(CodeKind::PasswordReset, new_code("444444"), 2)
            .await
            .unwrap();
        assert_eq!(
            tx.count_codes_today(CodeKind::AccountVerification, "u1")
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            tx.count_codes_today(CodeKind::PasswordReset, "u1")
                .await
                .unwrap(),
            1
        );
    }
}
