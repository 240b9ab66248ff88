use async_trait::async_trait;
use derive_more::Display;
use resend_rs::{types::CreateEmailBaseOptions, Resend};

#[derive(Debug, Display)]
pub enum NotifyError {
    Delivery(String),
}

/// Outbound OTP delivery. The engine only hands over a destination and a
/// code; templates and transport belong to the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), NotifyError>;
    async fn send_password_reset_code(&self, to: &str, code: &str) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct EmailLayer {
    api_key: String,
    pub domain: String,
}

impl EmailLayer {
    pub fn new(api_key: String, domain: String) -> Self {
        Self { api_key, domain }
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        let resend = Resend::new(&self.api_key);

        let from = format!("Afrad <noreply@{}>", &self.domain);
        let to = [to.to_string()];

        let email = CreateEmailBaseOptions::new(from, to, subject).with_html(html);

        resend
            .emails
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailLayer {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), NotifyError> {
        let html = format!(
            "
            <p>Use this code to verify your account:</p>
            <strong>{}</strong>
            <p>It expires shortly and can only be used once.</p>
        ",
            code
        );

        self.send(to, "Afrad - Account Verification", &html).await
    }

    async fn send_password_reset_code(&self, to: &str, code: &str) -> Result<(), NotifyError> {
        let html = format!(
            "
            <p>Use this code to reset your password:</p>
            <strong>{}</strong>
            <p>If you did not request a reset, you can ignore this email.</p>
        ",
            code
        );

        self.send(to, "Afrad - Password Reset", &html).await
    }
}
