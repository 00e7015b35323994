//! Event shape identification.
//!
//! An [`EventKey`] is the `(post_type, sub_type, detail_type)` triple that
//! selects one event shape. A [`Topic`] is what a handler subscribes to: either
//! one key or every event.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

// ============================================================================
// Post Type
// ============================================================================

/// Top-level event category, read from the `post_type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PostType {
    /// Incoming messages.
    Message,
    /// Messages sent by the bot itself (reported by some implementations).
    MessageSent,
    /// Notices (group changes, recalls, guild updates, ...).
    Notice,
    /// Requests (friend requests, group invitations, ...).
    Request,
    /// Meta events (lifecycle, heartbeat).
    MetaEvent,
    /// Any post type this crate does not name.
    Other(String),
}

impl PostType {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::MessageSent => "message_sent",
            Self::Notice => "notice",
            Self::Request => "request",
            Self::MetaEvent => "meta_event",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for PostType {
    fn from(s: &str) -> Self {
        match s {
            "message" => Self::Message,
            "message_sent" => Self::MessageSent,
            "notice" => Self::Notice,
            "request" => Self::Request,
            "meta_event" => Self::MetaEvent,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PostType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event Key
// ============================================================================

/// Uniquely identifies one event shape.
///
/// An empty `sub_type` in a *registered* key means the shape accepts any
/// sub-type; see [`SchemaRegistry::resolve`](crate::SchemaRegistry::resolve).
///
/// Keys display as `post_type/sub_type/detail_type`, with `*` for an empty
/// sub-type, and parse back from the same form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    post_type: PostType,
    sub_type: Arc<str>,
    detail_type: Arc<str>,
}

impl EventKey {
    /// Creates a key.
    pub fn new(
        post_type: impl Into<PostType>,
        sub_type: impl Into<Arc<str>>,
        detail_type: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            post_type: post_type.into(),
            sub_type: sub_type.into(),
            detail_type: detail_type.into(),
        }
    }

    /// Shorthand for a `message` key.
    pub fn message(sub_type: &str, detail_type: &str) -> Self {
        Self::new(PostType::Message, sub_type, detail_type)
    }

    /// Shorthand for a `notice` key.
    pub fn notice(sub_type: &str, detail_type: &str) -> Self {
        Self::new(PostType::Notice, sub_type, detail_type)
    }

    /// Shorthand for a `request` key.
    pub fn request(sub_type: &str, detail_type: &str) -> Self {
        Self::new(PostType::Request, sub_type, detail_type)
    }

    /// Shorthand for a `meta_event` key.
    pub fn meta(sub_type: &str, detail_type: &str) -> Self {
        Self::new(PostType::MetaEvent, sub_type, detail_type)
    }

    /// Returns the post type.
    pub fn post_type(&self) -> &PostType {
        &self.post_type
    }

    /// Returns the sub-type (may be empty).
    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Returns the detail type.
    pub fn detail_type(&self) -> &str {
        &self.detail_type
    }

    /// Whether this key matches any sub-type.
    pub fn is_sub_type_agnostic(&self) -> bool {
        self.sub_type.is_empty()
    }

    /// Returns the same key with the sub-type erased, or `None` if it is
    /// already erased.
    pub fn without_sub_type(&self) -> Option<Self> {
        if self.is_sub_type_agnostic() {
            return None;
        }
        Some(Self {
            post_type: self.post_type.clone(),
            sub_type: Arc::from(""),
            detail_type: Arc::clone(&self.detail_type),
        })
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sub = if self.sub_type.is_empty() {
            "*"
        } else {
            &self.sub_type
        };
        write!(f, "{}/{}/{}", self.post_type, sub, self.detail_type)
    }
}

/// Error returned when parsing an [`EventKey`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid event key '{0}', expected 'post_type/sub_type/detail_type'")]
pub struct ParseKeyError(pub String);

impl FromStr for EventKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(post), Some(sub), Some(detail), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseKeyError(s.to_string()));
        };
        if post.is_empty() || detail.is_empty() {
            return Err(ParseKeyError(s.to_string()));
        }
        let sub = if sub == "*" { "" } else { sub };
        Ok(Self::new(post, sub, detail))
    }
}

// ============================================================================
// Topic
// ============================================================================

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Events resolved for one key.
    Key(EventKey),
    /// Every dispatched event (wildcard).
    Any,
}

impl From<EventKey> for Topic {
    fn from(key: EventKey) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => key.fmt(f),
            Self::Any => f.write_str("*"),
        }
    }
}
