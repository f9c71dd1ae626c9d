use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::{MAX_CONTENT_CHARS, MIN_CONTENT_CHARS};
use crate::error::AppError;

/// Kind of payload a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "file" => Ok(Self::File),
            other => Err(format!(
                "message_type must be one of text, image, file (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(format!(
                "priority must be one of low, normal, high (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub read_status: bool,
    pub message_type: MessageType,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// A stored message. `id` and `timestamp` are assigned by the server and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub sender_id: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: MessageMetadata,
}

/// Where a create request came from. Captured once by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestProvenance {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Body of `POST /v1/messages`.
///
/// Enum fields arrive as plain strings so that unknown values surface as
/// validation errors with a useful detail instead of a deserializer rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A create request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMessage {
    pub content: String,
    pub sender_id: String,
    pub message_type: MessageType,
    pub priority: Priority,
    pub tags: Vec<String>,
}

impl CreateMessageRequest {
    pub fn validate(self) -> Result<ValidatedMessage, AppError> {
        let chars = self.content.chars().count();
        if chars < MIN_CONTENT_CHARS {
            return Err(AppError::validation("content is required"));
        }
        if chars > MAX_CONTENT_CHARS {
            return Err(AppError::validation(format!(
                "content must be at most {} characters (got {})",
                MAX_CONTENT_CHARS, chars
            )));
        }

        if self.sender_id.trim().is_empty() {
            return Err(AppError::validation("sender_id is required"));
        }

        if self.message_type.is_empty() {
            return Err(AppError::validation("message_type is required"));
        }
        let message_type = self
            .message_type
            .parse::<MessageType>()
            .map_err(AppError::validation)?;

        // An empty priority string is treated the same as an absent one
        let priority = match self.priority.as_deref() {
            None | Some("") => Priority::default(),
            Some(p) => p.parse::<Priority>().map_err(AppError::validation)?,
        };

        Ok(ValidatedMessage {
            content: self.content,
            sender_id: self.sender_id,
            message_type,
            priority,
            tags: self.tags,
        })
    }
}

impl Message {
    /// Builds a new message, assigning the identifier and creation time.
    pub fn new(validated: ValidatedMessage, provenance: RequestProvenance) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: validated.content,
            sender_id: validated.sender_id,
            // Microsecond precision survives a round trip through any backend
            timestamp: Utc::now().trunc_subsecs(6),
            metadata: MessageMetadata {
                read_status: false,
                message_type: validated.message_type,
                priority: validated.priority,
                tags: validated.tags,
                ip_address: provenance.ip_address,
                user_agent: provenance.user_agent,
            },
        }
    }
}

/// Paginated listing envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: u64,
    pub page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            content: content.to_string(),
            sender_id: "user123".to_string(),
            message_type: "text".to_string(),
            priority: None,
            tags: vec![],
        }
    }

    #[test]
    fn test_priority_defaults_to_normal() {
        let validated = request("hello").validate().unwrap();
        assert_eq!(validated.priority, Priority::Normal);

        let mut req = request("hello");
        req.priority = Some(String::new());
        assert_eq!(req.validate().unwrap().priority, Priority::Normal);
    }

    #[test]
    fn test_content_bounds_are_counted_in_characters() {
        assert!(request("").validate().is_err());
        assert!(request(&"a".repeat(2000)).validate().is_ok());
        assert!(request(&"a".repeat(2001)).validate().is_err());
        // 2000 multi-byte characters exceed 2000 bytes but are still valid
        assert!(request(&"é".repeat(2000)).validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_enums_and_blank_sender() {
        let mut req = request("hello");
        req.message_type = "video".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = request("hello");
        req.priority = Some("urgent".to_string());
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = request("hello");
        req.sender_id = "   ".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_new_message_assigns_server_fields() {
        let provenance = RequestProvenance {
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("curl/8.0".to_string()),
        };
        let a = Message::new(request("hello").validate().unwrap(), provenance.clone());
        let b = Message::new(request("hello").validate().unwrap(), provenance);

        assert_ne!(a.id, b.id);
        assert!(!a.metadata.read_status);
        assert_eq!(a.metadata.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(a.metadata.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_wire_format_uses_snake_case_lowercase_enums() {
        let message = Message::new(request("hello").validate().unwrap(), RequestProvenance::default());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["sender_id"], "user123");
        assert_eq!(json["metadata"]["message_type"], "text");
        assert_eq!(json["metadata"]["priority"], "normal");
        assert_eq!(json["metadata"]["read_status"], false);
        assert!(json["metadata"].get("tags").is_none());
    }
}
