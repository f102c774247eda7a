use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::ServiceError;
use crate::models::validation::{char_len, invalid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementStatus {
    Draft,
    Published,
    Expired,
}

impl AnnouncementStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(AnnouncementStatus::Draft),
            "published" => Some(AnnouncementStatus::Published),
            "expired" => Some(AnnouncementStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnnouncementStatus::Draft => "draft",
            AnnouncementStatus::Published => "published",
            AnnouncementStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementCategory {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Announcement {
    #[serde(rename = "ID")]
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: String,
    pub is_pinned: bool,
    pub scheduled_publish_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
    pub category_id: i64,
    pub category: Option<AnnouncementCategory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_pinned: bool,
    pub scheduled_publish_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    /// Fan out a notification to every student once published
    #[serde(default)]
    pub send_notification: bool,
}

impl AnnouncementInput {
    pub fn validate(&self) -> Result<AnnouncementStatus, ServiceError> {
        if self.title.trim().is_empty() {
            return invalid("Title cannot be blank");
        }
        if char_len(self.title.trim()) > 200 {
            return invalid("Title must not exceed 200 characters");
        }
        if self.content.trim().is_empty() {
            return invalid("Content cannot be blank");
        }
        let status = self.status.trim();
        if status.is_empty() {
            return invalid("Status cannot be blank");
        }
        let status = AnnouncementStatus::parse(status)
            .ok_or_else(|| ServiceError::validation("Invalid status"))?;
        if self.category_id.unwrap_or(0) <= 0 {
            return invalid("Category is required");
        }
        if let (Some(publish), Some(expires)) = (self.scheduled_publish_at, self.expires_at) {
            if expires <= publish {
                return invalid("Expiry must be after the scheduled publish time");
            }
        }
        Ok(status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    #[serde(rename = "ID")]
    pub id: i64,
    pub notification_title: String,
    pub notification_message: String,
    pub notification_type: String,
    pub is_read: bool,
    pub user_id: i64,
    pub announcement_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Content of a notification before it is addressed to anyone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationInput {
    #[serde(default)]
    pub notification_title: String,
    #[serde(default)]
    pub notification_message: String,
    #[serde(default)]
    pub notification_type: String,
    pub announcement_id: Option<i64>,
}

impl NotificationInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.notification_title.trim().is_empty() {
            return invalid("Notification title is required");
        }
        if self.notification_message.trim().is_empty() {
            return invalid("Notification message is required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationUpdate {
    pub notification_title: Option<String>,
    pub notification_message: Option<String>,
    pub notification_type: Option<String>,
    pub is_read: Option<bool>,
}
