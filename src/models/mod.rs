use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Wire format note: field names are camelCase and enum tags are lowercase
// strings, matching both the single-page site and the remote backend tables.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Trainer,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Classifies an upload by its MIME content type.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Document
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Html,
    Image,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeStatus {
    New,
    Contacted,
    Scheduled,
    Converted,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    New,
    Read,
    Replied,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_login_at: Option<DateTime<Utc>>,
    // Only set for users registered against the local cache; the remote
    // identity provider keeps its own credentials. Stripped from API
    // responses via `without_hash`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password_hash: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Copy of this user safe to return from the API.
    pub fn without_hash(&self) -> User {
        User {
            password_hash: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub title: String,
    pub price: String,
    pub description: String,
    pub features: Vec<String>,
    pub icon: String,
    pub popular: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub title: String,
    pub image: String,
    pub video_thumb: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub video_url: Option<String>,
    pub quote: String,
    pub rating: u8,
    pub results: String,
    pub featured: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteContentEntry {
    pub id: String,
    pub section: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSubmission {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub age: u32,
    pub fitness_level: String,
    pub goals: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub injuries: Option<String>,
    pub availability: Vec<String>,
    pub preferred_service: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub additional_info: Option<String>,
    pub status: IntakeStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_contacted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: MessageStatus,
    pub priority: Priority,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replied_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_tags_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::to_string(&IntakeStatus::Contacted).unwrap(),
            "\"contacted\""
        );
        assert_eq!(
            serde_json::to_string(&MessageStatus::Archived).unwrap(),
            "\"archived\""
        );
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");

        let status: IntakeStatus = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(status, IntakeStatus::Declined);
    }

    #[test]
    fn media_kind_classification() {
        assert_eq!(
            MediaKind::from_content_type("image/png"),
            MediaKind::Image
        );
        assert_eq!(
            MediaKind::from_content_type("video/mp4"),
            MediaKind::Video
        );
        assert_eq!(
            MediaKind::from_content_type("application/pdf"),
            MediaKind::Document
        );
    }

    #[test]
    fn user_fields_serialize_camel_case_without_hash() {
        let user = User {
            id: "u1".to_string(),
            email: "a@b.c".to_string(),
            name: "A".to_string(),
            role: Role::Trainer,
            avatar: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
            password_hash: Some("secret".to_string()),
        };
        let json = serde_json::to_string(&user.without_hash()).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(!json.contains("passwordHash"));
    }
}
