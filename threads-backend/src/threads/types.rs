use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Kind of content a media container holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MediaType {
    #[default]
    Text,
    Image,
    Video,
}

/// A post owned by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

impl Post {
    /// Media type as reported, `TEXT` when the API left it out.
    pub fn media_type_label(&self) -> &str {
        self.media_type.as_deref().unwrap_or("TEXT")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepliedTo {
    pub id: String,
}

/// A reply scoped to a parent post or reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, rename = "from", skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replied_to: Option<RepliedTo>,
}

impl Reply {
    pub fn author_id(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.id.as_deref())
    }

    pub fn username(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|a| a.username.as_deref())
            .unwrap_or("unknown")
    }

    pub fn display_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or("unknown")
    }

    pub fn text_or_placeholder(&self) -> &str {
        self.text.as_deref().unwrap_or(NO_TEXT)
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

pub const NO_TEXT: &str = "[no text]";

/// First page of a Graph API edge. `paging` cursors are never followed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Outbound post or reply, before it becomes a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerRequest {
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub link_attachment: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub reply_to_id: Option<String>,
}

impl ContainerRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn reply(reply_to_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            reply_to_id: Some(reply_to_id.into()),
            ..Self::text(text)
        }
    }

    /// Form fields for the create call. Media-specific URLs are only sent
    /// with the matching media type.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("media_type", self.media_type.to_string()),
            ("text", self.text.clone()),
        ];
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.is_empty()).cloned();

        match self.media_type {
            MediaType::Image => {
                if let Some(url) = non_empty(&self.image_url) {
                    fields.push(("image_url", url));
                }
            }
            MediaType::Video => {
                if let Some(url) = non_empty(&self.video_url) {
                    fields.push(("video_url", url));
                }
            }
            MediaType::Text => {
                if let Some(link) = non_empty(&self.link_attachment) {
                    fields.push(("link_attachment", link));
                }
            }
        }
        if let Some(target) = non_empty(&self.reply_to_id) {
            fields.push(("reply_to_id", target));
        }
        fields
    }

    /// Checks the fields a media type cannot do without.
    pub fn validate(&self) -> Result<(), String> {
        let blank = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").is_empty();
        match self.media_type {
            MediaType::Text if self.text.trim().is_empty() => {
                Err("text posts require text content".to_string())
            }
            MediaType::Image if blank(&self.image_url) => {
                Err("image posts require image_url".to_string())
            }
            MediaType::Video if blank(&self.video_url) => {
                Err("video posts require video_url".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Server-side processing state of a media container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerState {
    InProgress,
    Finished,
    Published,
    Error,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub status: ContainerState,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Live id returned by the publish call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub id: String,
}

/// Parse a Graph API timestamp (`2025-03-01T08:15:00+0000`) or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Human-readable timestamp for console output; unparseable input is echoed.
pub fn format_timestamp(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| raw.to_string())
}
