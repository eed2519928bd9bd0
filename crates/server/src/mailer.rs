use shared_types::{Goal, User};
use std::time::Duration;

/// Outbound mail seam. Production uses the Mailgun HTTP API; tests swap in
/// capturing or failing transports to exercise the best-effort contract.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String>;
}

// --- Environment helpers ---

fn mailgun_api_key() -> Result<String, String> {
    std::env::var("MAILGUN_API_KEY").map_err(|_| "MAILGUN_API_KEY is not configured".to_string())
}

fn mailgun_domain() -> Result<String, String> {
    std::env::var("MAILGUN_DOMAIN").map_err(|_| "MAILGUN_DOMAIN is not configured".to_string())
}

fn mailgun_from() -> Result<String, String> {
    match std::env::var("MAILGUN_FROM") {
        Ok(v) => Ok(v),
        Err(_) => Ok(format!(
            "{} <noreply@{}>",
            crate::config::app_name(),
            mailgun_domain()?
        )),
    }
}

/// Mailgun-backed transport. The send timeout bounds how long a completion
/// request can be held up by a slow mail API.
pub struct MailgunMailer {
    client: reqwest::Client,
}

impl MailgunMailer {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }
}

impl Default for MailgunMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Mailer for MailgunMailer {
    #[tracing::instrument(skip(self, html_body))]
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<(), String> {
        let domain = mailgun_domain()?;
        let url = format!("https://api.mailgun.net/v3/{}/messages", domain);

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(mailgun_api_key()?))
            .form(&[
                ("from", mailgun_from()?),
                ("to", to.to_string()),
                ("subject", subject.to_string()),
                ("html", html_body.to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("Mailgun request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Mailgun API error ({}): {}", status, body));
        }

        tracing::info!(to = to, subject = subject, "Email sent successfully");
        Ok(())
    }
}

/// Transport that drops every message. Used when mail is not configured
/// in development.
pub struct NoopMailer;

#[async_trait::async_trait]
impl Mailer for NoopMailer {
    async fn send_email(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), String> {
        tracing::debug!(to = to, subject = subject, "Mail transport disabled, dropping email");
        Ok(())
    }
}

/// Pick the transport from the environment: Mailgun when configured,
/// otherwise the no-op transport.
pub fn mailer_from_env() -> std::sync::Arc<dyn Mailer> {
    if std::env::var("MAILGUN_API_KEY").is_ok() && std::env::var("MAILGUN_DOMAIN").is_ok() {
        std::sync::Arc::new(MailgunMailer::new())
    } else {
        tracing::warn!("Mailgun not configured, outbound email disabled");
        std::sync::Arc::new(NoopMailer)
    }
}

// --- Message rendering ---

pub fn completion_subject(goal: &Goal) -> String {
    format!("Goal Completed: {}", goal.title)
}

/// Render the goal-completion notification body: title, optional
/// description, end date, completion timestamp, owner name and email.
pub fn completion_html(goal: &Goal, owner: &User, app_name: &str) -> String {
    let description_row = match goal.description.as_deref() {
        Some(d) if !d.is_empty() => format!(
            "<p><strong>Description:</strong> {}</p>",
            html_escape(d)
        ),
        _ => String::new(),
    };
    let completed_at = goal
        .completed_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    format!(
        r#"<html>
<body>
  <h1>Goal Completed</h1>
  <p>A goal has just been completed in {app_name}.</p>
  <h2>{title}</h2>
  {description_row}
  <p><strong>End date:</strong> {end_date}</p>
  <p><strong>Completed at:</strong> {completed_at}</p>
  <p><strong>Completed by:</strong> {owner_name} ({owner_email})</p>
</body>
</html>"#,
        app_name = html_escape(app_name),
        title = html_escape(&goal.title),
        description_row = description_row,
        end_date = goal.end_date,
        completed_at = completed_at,
        owner_name = html_escape(&owner.name),
        owner_email = html_escape(&owner.email),
    )
}

/// Render the email-verification message.
pub fn verification_html(token: &str, base_url: &str, app_name: &str) -> String {
    format!(
        r#"<html>
<body>
  <h1>Verify your email</h1>
  <p>Welcome to {app_name}! Confirm your email address to continue.</p>
  <p><a href="{base_url}/api/auth/verify-email?token={token}">Verify email</a></p>
  <p>This link expires in 24 hours.</p>
</body>
</html>"#,
        app_name = html_escape(app_name),
        base_url = base_url,
        token = token,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
