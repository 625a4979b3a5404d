//! Transactional email delivery
//!
//! Sends verification links and password reset codes via the Resend API.
//! Register and forgot-password treat dispatch as load-bearing, so sends
//! return a `Result` instead of swallowing failures.

/// Email configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Resend API key
    pub resend_api_key: String,
    /// From address for emails
    pub email_from: String,
    /// App name for branding
    pub app_name: String,
    /// Dashboard URL (verification links point here)
    pub dashboard_url: String,
}

impl EmailConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            resend_api_key: std::env::var("RESEND_API_KEY").unwrap_or_default(),
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "VidVault <noreply@localhost>".to_string()),
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "VidVault".to_string()),
            dashboard_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
        }
    }

    /// Check if email sending is enabled
    pub fn is_enabled(&self) -> bool {
        !self.resend_api_key.is_empty()
    }
}

/// Transactional email service
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    client: reqwest::Client,
}

impl EmailService {
    /// Create a new email service
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::new(EmailConfig::from_env())
    }

    /// Check if email sending is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Send an email via the Resend API
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        if !self.config.is_enabled() {
            tracing::warn!("Email not configured, skipping: {}", subject);
            return Ok(());
        }

        let body = serde_json::json!({
            "from": self.config.email_from,
            "to": [to],
            "subject": subject,
            "html": html
        });

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.config.resend_api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(to = %to, subject = %subject, "Email sent");
                Ok(())
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::error!(status = %status, body = %body, "Failed to send email");
                Err(EmailError::Provider(status.as_u16()))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send email");
                Err(EmailError::Request(e.to_string()))
            }
        }
    }

    /// Send an email verification link
    pub async fn send_email_verification(
        &self,
        to: &str,
        verification_token: &str,
    ) -> Result<(), EmailError> {
        let verification_link = format!(
            "{}/auth/verify-email?token={}",
            self.config.dashboard_url, verification_token
        );

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #6366f1;">Welcome to {app_name}!</h2>
    <p>Hi there,</p>
    <p>Thanks for signing up! Please verify your email address to activate your account.</p>
    <p style="text-align: center; margin: 30px 0;">
        <a href="{verification_link}" style="display: inline-block; padding: 14px 28px; background-color: #6366f1; color: white; text-decoration: none; border-radius: 6px; font-weight: bold; font-size: 16px;">
            Verify Email Address
        </a>
    </p>
    <p style="color: #666; font-size: 14px;">
        This verification link expires in <strong>1 hour</strong>.
    </p>
    <p style="color: #666; font-size: 14px;">
        If you didn't create an account with {app_name}, you can safely ignore this email.
    </p>
    <hr style="border: none; border-top: 1px solid #eee; margin: 20px 0;">
    <p style="color: #999; font-size: 12px;">{app_name}</p>
</body>
</html>"#,
            app_name = self.config.app_name,
            verification_link = verification_link,
        );

        self.send_email(
            to,
            &format!("Verify Your Email - {}", self.config.app_name),
            &html,
        )
        .await
    }

    /// Send a password reset code
    pub async fn send_reset_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #6366f1;">Password Reset Requested</h2>
    <p>Hi there,</p>
    <p>We received a request to reset your {app_name} password. Enter this code to continue:</p>
    <p style="text-align: center; margin: 30px 0;">
        <span style="display: inline-block; padding: 14px 28px; background-color: #f0f4ff; border: 1px solid #6366f1; border-radius: 6px; font-weight: bold; font-size: 28px; letter-spacing: 6px;">
            {code}
        </span>
    </p>
    <p style="color: #666; font-size: 14px;">
        This code expires in <strong>15 minutes</strong>.
    </p>
    <p style="color: #dc2626; font-size: 14px; font-weight: bold;">
        If you didn't request a password reset, please ignore this email and your password will remain unchanged.
    </p>
    <hr style="border: none; border-top: 1px solid #eee; margin: 20px 0;">
    <p style="color: #999; font-size: 12px;">{app_name}</p>
</body>
</html>"#,
            app_name = self.config.app_name,
            code = code,
        );

        self.send_email(
            to,
            &format!("Your Password Reset Code - {}", self.config.app_name),
            &html,
        )
        .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email provider returned status {0}")]
    Provider(u16),
    #[error("Email request failed: {0}")]
    Request(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_api_key() {
        let config = EmailConfig {
            resend_api_key: String::new(),
            email_from: "VidVault <noreply@localhost>".to_string(),
            app_name: "VidVault".to_string(),
            dashboard_url: "http://localhost:5000".to_string(),
        };
        assert!(!config.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_service_send_is_a_noop() {
        let service = EmailService::new(EmailConfig {
            resend_api_key: String::new(),
            email_from: "VidVault <noreply@localhost>".to_string(),
            app_name: "VidVault".to_string(),
            dashboard_url: "http://localhost:5000".to_string(),
        });

        // No provider configured: logged and skipped, not an error
        assert!(service
            .send_reset_code("a@x.com", "123456")
            .await
            .is_ok());
    }
}
