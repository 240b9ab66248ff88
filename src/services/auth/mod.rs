
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::warn;

use crate::errors::{AuthError, CommonError};
use crate::services::database::credential::Credential;
use crate::services::database::session::NewSession;
use crate::services::database::user::{NewUser, ProfileUpdate, Role, User};
use crate::services::database::verification_code::{
    CodeKind, NewVerificationCode, VerificationCode,
};
use crate::services::database::{
    AuthStore, AuthTx, CredentialStore, OauthLinkStore, SessionStore, StoreError, UserStore,
    VerificationCodeStore,
};
use crate::services::email::Notifier;
use crate::services::objects::ObjectStore;
use crate::utils::crypto::{constant_time_eq, hash_password, hash_token, verify_password, verify_token};
use crate::utils::random::generate_otp;
use crate::utils::token::{TokenCodec, TokenError};

const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub hash_secret: String,
    pub otp_ttl_minutes: i64,
    pub otp_daily_cap: u32,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Identity asserted by an external provider. The provider handshake itself
/// happens upstream; by the time this reaches the engine it is trusted.
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

/// The orchestrator behind every auth route. Each operation runs inside one
/// storage transaction; side effects that cannot roll back (email, object
/// uploads) happen outside it.
pub struct AuthEngine {
    store: Arc<dyn AuthStore>,
    notifier: Arc<dyn Notifier>,
    objects: Arc<dyn ObjectStore>,
    codec: TokenCodec,
    opts: EngineOptions,
}

impl AuthEngine {
    pub fn new(
        store: Arc<dyn AuthStore>,
        notifier: Arc<dyn Notifier>,
        objects: Arc<dyn ObjectStore>,
        codec: TokenCodec,
        opts: EngineOptions,
    ) -> Self {
        Self {
            store,
            notifier,
            objects,
            codec,
            opts,
        }
    }

    pub fn parse_access_token(
        &self,
        token: &str,
    ) -> Result<crate::utils::token::AccessClaims, TokenError> {
        self.codec.parse_access(token)
    }

    fn role_for(&self, email: &str) -> Role {
        if self.opts.admin_emails.iter().any(|e| e == email) {
            Role::Admin
        } else {
            Role::User
        }
    }

    fn otp_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::minutes(self.opts.otp_ttl_minutes)
    }

    /// Commit on success, roll back on failure. The transaction never
    /// outlives this call. Guard statements inside the commit batch report
    /// lost races here, so the commit error runs through the operation's
    /// conflict mapping, same as a conflict raised at call time.
    async fn finish<T>(
        tx: Box<dyn AuthTx>,
        result: Result<T, AuthError>,
        map_conflict: fn(StoreError) -> AuthError,
    ) -> Result<T, AuthError> {
        match result {
            Ok(value) => {
                tx.commit().await.map_err(map_conflict)?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(%rollback_error, "transaction rollback failed");
                }
                Err(error)
            }
        }
    }

    pub async fn register(
        &self,
        registration: NewRegistration,
        avatar: Option<AvatarUpload>,
    ) -> Result<User, AuthError> {
        let email = normalize_email(&registration.email);

        // The upload cannot ride in the transaction; compensate if the
        // transaction fails.
        let avatar_url = match avatar {
            Some(upload) => Some(self.objects.upload(upload.data, &upload.content_type).await?),
            None => None,
        };

        let tx = self.store.begin().await?;
        let result = self
            .register_op(tx.as_ref(), &registration, &email, avatar_url.clone())
            .await;
        let result = Self::finish(tx, result, rate_limit_on_conflict).await;

        let (user, otp) = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                if let Some(url) = avatar_url {
                    if let Err(delete_error) = self.objects.delete(&url).await {
                        warn!(%delete_error, "failed to clean up avatar after aborted registration");
                    }
                }
                return Err(error);
            }
        };

        // The account exists either way; a delivery failure is reported but
        // does not undo the registration.
        if let Err(error) = self.notifier.send_verification_code(&user.email, &otp).await {
            warn!(user_id = %user.id, %error, "verification code delivery failed");
            return Err(AuthError::Common(CommonError::Email(error)));
        }

        Ok(user)
    }

    async fn register_op(
        &self,
        tx: &dyn AuthTx,
        registration: &NewRegistration,
        email: &str,
        avatar_url: Option<String>,
    ) -> Result<(User, String), AuthError> {
        if tx.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = hash_password(&registration.password)?;

        let user = tx
            .create_user(NewUser {
                first_name: registration.first_name.clone(),
                last_name: registration.last_name.clone(),
                email: email.to_string(),
                phone_number: registration.phone_number.clone(),
                avatar_url,
                role: self.role_for(email),
            })
            .await?;

        tx.create_credential(&user.id, &password_hash).await?;

        let otp = generate_otp(OTP_LENGTH);
        tx.create_code(
            CodeKind::AccountVerification,
            NewVerificationCode {
                user_id: user.id.clone(),
                code: otp.clone(),
                expires_at: self.otp_expiry(),
            },
            self.opts.otp_daily_cap,
        )
        .await
        .map_err(rate_limit_on_conflict)?;

        Ok((user, otp))
    }

    pub async fn verify_account(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let tx = self.store.begin().await?;
        let result = self.verify_account_op(tx.as_ref(), &email, code).await;
        Self::finish(tx, result, invalid_code_on_conflict).await
    }

    async fn verify_account_op(
        &self,
        tx: &dyn AuthTx,
        email: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let user = tx
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;
        let _: Credential = tx.get_credential(&user.id).await?;

        // The code decides the outcome, even on an already verified account:
        // a replayed code is invalid, never a hint that verification already
        // happened.
        let latest = tx
            .latest_code(CodeKind::AccountVerification, &user.id)
            .await?;
        let latest = check_code(latest, code)?;

        tx.consume_code(CodeKind::AccountVerification, &latest.id)
            .await
            .map_err(invalid_code_on_conflict)?;
        tx.mark_verified(&user.id).await?;

        Ok(())
    }

    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let tx = self.store.begin().await?;
        let result = self.resend_verification_op(tx.as_ref(), &email).await;
        let (destination, otp) = Self::finish(tx, result, rate_limit_on_conflict).await?;

        if let Err(error) = self.notifier.send_verification_code(&destination, &otp).await {
            warn!(%error, "verification code delivery failed");
            return Err(AuthError::Common(CommonError::Email(error)));
        }

        Ok(())
    }

    async fn resend_verification_op(
        &self,
        tx: &dyn AuthTx,
        email: &str,
    ) -> Result<(String, String), AuthError> {
        let user = tx
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;
        let credential = tx.get_credential(&user.id).await?;

        if credential.verified {
            return Err(AuthError::AlreadyVerified);
        }

        self.issue_code(tx, CodeKind::AccountVerification, &user.id)
            .await
            .map(|otp| (user.email, otp))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_fingerprint: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);
        let tx = self.store.begin().await?;
        let result = self
            .login_op(tx.as_ref(), &email, password, device_fingerprint)
            .await;
        Self::finish(tx, result, store_fault).await
    }

    async fn login_op(
        &self,
        tx: &dyn AuthTx,
        email: &str,
        password: &str,
        device_fingerprint: &str,
    ) -> Result<LoginOutcome, AuthError> {
        // Unknown email, OAuth-only account and wrong password are
        // indistinguishable to the caller. The accountless paths still pay
        // the argon2 cost so response timing does not reveal whether the
        // email exists.
        let user = match tx.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                hash_password(password)?;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let credential = match tx.get_credential(&user.id).await {
            Ok(credential) => credential,
            Err(StoreError::NotFound) => {
                hash_password(password)?;
                return Err(AuthError::InvalidCredentials);
            }
            Err(error) => return Err(error.into()),
        };

        if !verify_password(&credential.password_hash, password)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !credential.verified {
            return Err(AuthError::AccountNotVerified);
        }

        let pair = self.establish_session(tx, &user, device_fingerprint).await?;

        Ok(LoginOutcome {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user,
        })
    }

    /// One session row per (user, device): a fresh login reclaims the
    /// existing row instead of piling up a second one.
    async fn establish_session(
        &self,
        tx: &dyn AuthTx,
        user: &User,
        device_fingerprint: &str,
    ) -> Result<TokenPair, AuthError> {
        let access_token =
            self.codec
                .issue_access(&user.id, user.role, self.opts.access_ttl_minutes)?;
        let refresh_token = self
            .codec
            .issue_refresh(&user.id, self.opts.refresh_ttl_days)?;

        let refresh_token_hash = hash_token(&refresh_token, &self.opts.hash_secret);
        let expires_at = Utc::now() + Duration::days(self.opts.refresh_ttl_days);

        match tx
            .get_session_by_device(&user.id, device_fingerprint)
            .await?
        {
            Some(session) => {
                tx.refresh_session(&session.id, &refresh_token_hash, expires_at)
                    .await?;
            }
            None => {
                tx.create_session(NewSession {
                    user_id: user.id.clone(),
                    device_fingerprint: device_fingerprint.to_string(),
                    refresh_token_hash,
                    expires_at,
                })
                .await?;
            }
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub async fn refresh(
        &self,
        user_id: &str,
        device_fingerprint: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let tx = self.store.begin().await?;
        let result = self
            .refresh_op(tx.as_ref(), user_id, device_fingerprint, refresh_token)
            .await;
        Self::finish(tx, result, invalid_session_on_conflict).await
    }

    async fn refresh_op(
        &self,
        tx: &dyn AuthTx,
        user_id: &str,
        device_fingerprint: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let session = self
            .validated_session(tx, user_id, device_fingerprint, refresh_token)
            .await?;
        let user = tx.get_user(user_id).await?;

        let access_token =
            self.codec
                .issue_access(&user.id, user.role, self.opts.access_ttl_minutes)?;
        let new_refresh_token = self
            .codec
            .issue_refresh(&user.id, self.opts.refresh_ttl_days)?;

        let new_hash = hash_token(&new_refresh_token, &self.opts.hash_secret);
        let expires_at = Utc::now() + Duration::days(self.opts.refresh_ttl_days);

        // Guarded by the hash we just validated; a concurrent rotation loses.
        tx.rotate_session(&session.id, &session.refresh_token_hash, &new_hash, expires_at)
            .await
            .map_err(invalid_session_on_conflict)?;

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
        })
    }

    pub async fn logout(
        &self,
        user_id: &str,
        device_fingerprint: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let tx = self.store.begin().await?;
        let result = self
            .logout_op(tx.as_ref(), user_id, device_fingerprint, refresh_token)
            .await;
        Self::finish(tx, result, store_fault).await
    }

    async fn logout_op(
        &self,
        tx: &dyn AuthTx,
        user_id: &str,
        device_fingerprint: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let session = self
            .validated_session(tx, user_id, device_fingerprint, refresh_token)
            .await?;
        tx.revoke_session(&session.id).await?;
        Ok(())
    }

    pub async fn logout_all(&self, user_id: &str) -> Result<(), AuthError> {
        let tx = self.store.begin().await?;
        let result = self.logout_all_op(tx.as_ref(), user_id).await;
        Self::finish(tx, result, store_fault).await
    }

    async fn logout_all_op(&self, tx: &dyn AuthTx, user_id: &str) -> Result<(), AuthError> {
        tx.get_user(user_id).await?;
        tx.revoke_all_sessions(user_id).await?;
        Ok(())
    }

    /// Shared validation for refresh and logout: the presented cookie must
    /// parse, belong to this user, and match the live session for this
    /// device.
    async fn validated_session(
        &self,
        tx: &dyn AuthTx,
        user_id: &str,
        device_fingerprint: &str,
        refresh_token: &str,
    ) -> Result<crate::services::database::session::Session, AuthError> {
        let claims = self
            .codec
            .parse_refresh(refresh_token)
            .map_err(|_| AuthError::InvalidSession)?;

        if claims.sub != user_id {
            return Err(AuthError::InvalidSession);
        }

        let session = tx
            .get_session_by_device(user_id, device_fingerprint)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        if session.revoked || session.expires_at <= Utc::now() {
            return Err(AuthError::InvalidSession);
        }

        if !verify_token(&session.refresh_token_hash, refresh_token, &self.opts.hash_secret) {
            return Err(AuthError::InvalidSession);
        }

        Ok(session)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let tx = self.store.begin().await?;
        let result = self.request_password_reset_op(tx.as_ref(), &email).await;
        let (destination, otp) = Self::finish(tx, result, rate_limit_on_conflict).await?;

        if let Err(error) = self
            .notifier
            .send_password_reset_code(&destination, &otp)
            .await
        {
            warn!(%error, "password reset code delivery failed");
            return Err(AuthError::Common(CommonError::Email(error)));
        }

        Ok(())
    }

    async fn request_password_reset_op(
        &self,
        tx: &dyn AuthTx,
        email: &str,
    ) -> Result<(String, String), AuthError> {
        let user = tx
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        // OAuth-only accounts have no password to reset.
        let credential = tx.get_credential(&user.id).await?;

        // Resetting a password on an unverified account would let the code
        // double as account verification.
        if !credential.verified {
            return Err(AuthError::AccountNotVerified);
        }

        self.issue_code(tx, CodeKind::PasswordReset, &user.id)
            .await
            .map(|otp| (user.email, otp))
    }

    async fn issue_code(
        &self,
        tx: &dyn AuthTx,
        kind: CodeKind,
        user_id: &str,
    ) -> Result<String, AuthError> {
        if tx.count_codes_today(kind, user_id).await? >= self.opts.otp_daily_cap {
            return Err(AuthError::RateLimited);
        }

        let otp = generate_otp(OTP_LENGTH);
        tx.create_code(
            kind,
            NewVerificationCode {
                user_id: user_id.to_string(),
                code: otp.clone(),
                expires_at: self.otp_expiry(),
            },
            self.opts.otp_daily_cap,
        )
        .await
        .map_err(rate_limit_on_conflict)?;

        Ok(otp)
    }

    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let tx = self.store.begin().await?;
        let result = self
            .confirm_password_reset_op(tx.as_ref(), &email, code, new_password)
            .await;
        Self::finish(tx, result, invalid_code_on_conflict).await
    }

    async fn confirm_password_reset_op(
        &self,
        tx: &dyn AuthTx,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = tx
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;
        let _: Credential = tx.get_credential(&user.id).await?;

        let latest = tx.latest_code(CodeKind::PasswordReset, &user.id).await?;
        let latest = check_code(latest, code)?;

        tx.consume_code(CodeKind::PasswordReset, &latest.id)
            .await
            .map_err(invalid_code_on_conflict)?;

        let password_hash = hash_password(new_password)?;
        // Also repairs an unverified flag; proving control of the inbox is
        // the same proof verification asks for.
        tx.update_credential(&user.id, &password_hash, true).await?;

        // Every device logs in again with the new password.
        tx.revoke_all_sessions(&user.id).await?;

        Ok(())
    }

    pub async fn oauth_upsert_and_login(
        &self,
        identity: ExternalIdentity,
        device_fingerprint: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let tx = self.store.begin().await?;
        let result = self
            .oauth_upsert_op(tx.as_ref(), identity, device_fingerprint)
            .await;
        Self::finish(tx, result, store_fault).await
    }

    async fn oauth_upsert_op(
        &self,
        tx: &dyn AuthTx,
        identity: ExternalIdentity,
        device_fingerprint: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(&identity.email);

        let existing_link = tx
            .find_oauth_link(&identity.provider, &identity.provider_user_id)
            .await?;

        let user = match existing_link {
            Some(link) => {
                // Known identity: refresh the profile from the provider.
                tx.update_user_profile(
                    &link.user_id,
                    ProfileUpdate {
                        first_name: Some(identity.first_name.clone()),
                        last_name: Some(identity.last_name.clone()),
                        avatar_url: identity.avatar_url.clone(),
                    },
                )
                .await?;
                tx.get_user(&link.user_id).await?
            }
            None => match tx.find_user_by_email(&email).await? {
                Some(user) => {
                    // Same inbox, first time through this provider: attach
                    // the identity to the existing account.
                    tx.create_oauth_link(
                        &user.id,
                        &identity.provider,
                        &identity.provider_user_id,
                    )
                    .await?;
                    user
                }
                None => {
                    let user = tx
                        .create_user(NewUser {
                            first_name: identity.first_name.clone(),
                            last_name: identity.last_name.clone(),
                            email: email.clone(),
                            phone_number: None,
                            avatar_url: identity.avatar_url.clone(),
                            role: self.role_for(&email),
                        })
                        .await?;
                    tx.create_oauth_link(
                        &user.id,
                        &identity.provider,
                        &identity.provider_user_id,
                    )
                    .await?;
                    user
                }
            },
        };

        let pair = self.establish_session(tx, &user, device_fingerprint).await?;

        Ok(LoginOutcome {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user,
        })
    }
}

/// Email is the lookup key everywhere, so it is stored and compared in one
/// canonical form.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shared OTP validation. A stale, consumed or mismatched code never reveals
/// which check failed; only a correct-but-late code reports expiry.
fn check_code(
    latest: Option<VerificationCode>,
    presented: &str,
) -> Result<VerificationCode, AuthError> {
    let latest = latest.ok_or(AuthError::InvalidCode)?;

    if latest.consumed {
        return Err(AuthError::InvalidCode);
    }
    if !constant_time_eq(latest.code.as_bytes(), presented.as_bytes()) {
        return Err(AuthError::InvalidCode);
    }
    if latest.expires_at <= Utc::now() {
        return Err(AuthError::CodeExpired);
    }

    Ok(latest)
}

// Operations whose commit batch carries no guard statement.
fn store_fault(error: StoreError) -> AuthError {
    error.into()
}

fn rate_limit_on_conflict(error: StoreError) -> AuthError {
    match error {
        StoreError::Conflict => AuthError::RateLimited,
        other => other.into(),
    }
}

fn invalid_code_on_conflict(error: StoreError) -> AuthError {
    match error {
        StoreError::Conflict => AuthError::InvalidCode,
        other => other.into(),
    }
}

fn invalid_session_on_conflict(error: StoreError) -> AuthError {
    match error {
        StoreError::Conflict => AuthError::InvalidSession,
        other => other.into(),
    }
}
