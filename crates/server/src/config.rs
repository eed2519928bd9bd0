//! Environment-backed configuration.
//!
//! Core operations never read the environment themselves; the values they
//! need are resolved here once and passed in explicitly.

/// Settings consumed by the goal completion notification path.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Where completion emails go. `None` disables the notification step
    /// (a warning, not an error).
    pub recipient: Option<String>,
    pub app_name: String,
}

impl NotificationConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            recipient: std::env::var("GOAL_NOTIFICATION_RECIPIENT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            app_name: app_name(),
        }
    }
}

pub fn app_name() -> String {
    std::env::var("APP_NAME").unwrap_or_else(|_| "GoalTrack".to_string())
}

pub fn app_base_url() -> String {
    std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// URL of the onboarding video shown before the goals dashboard unlocks.
pub fn onboarding_video_url() -> String {
    std::env::var("ONBOARDING_VIDEO_URL")
        .unwrap_or_else(|_| format!("{}/videos/setting-smart-goals.mp4", app_base_url()))
}

pub fn bind_addr() -> String {
    std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}
