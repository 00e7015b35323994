//! Schemas and views shared across OneBot shapes.

use signet_core::{FieldType, Id, Schema, SchemaBuilder};
use signet_macros::FromRecord;

/// Fields every OneBot event carries.
///
/// Optional, so payloads relayed without them still decode.
pub fn header() -> SchemaBuilder {
    Schema::builder()
        .optional("time", FieldType::Int)
        .optional("self_id", FieldType::Id)
}

/// Message sender information.
pub fn sender() -> Schema {
    Schema::builder()
        .optional("user_id", FieldType::Id)
        .optional("nickname", FieldType::String)
        .optional("sex", FieldType::String)
        .optional("age", FieldType::Int)
        .optional("card", FieldType::String)
        .optional("area", FieldType::String)
        .optional("level", FieldType::String)
        .optional("role", FieldType::String)
        .optional("title", FieldType::String)
        .optional("tiny_id", FieldType::Id)
        .build()
}

/// Anonymous group member.
pub fn anonymous() -> Schema {
    Schema::builder()
        .optional("id", FieldType::Id)
        .optional("name", FieldType::String)
        .optional("flag", FieldType::String)
        .build()
}

/// Message sender information.
#[derive(Debug, Clone, Default, PartialEq, FromRecord)]
pub struct Sender {
    pub user_id: Id,
    pub nickname: String,
    pub sex: String,
    pub age: i64,
    pub card: String,
    pub area: String,
    pub level: String,
    pub role: String,
    pub title: String,
    /// Guild-scoped id, only sent for guild messages.
    pub tiny_id: Id,
}

impl Sender {
    /// Returns the group card if set, otherwise the nickname.
    pub fn display_name(&self) -> &str {
        if self.card.is_empty() {
            &self.nickname
        } else {
            &self.card
        }
    }
}

/// Anonymous user information. All fields are empty for named senders.
#[derive(Debug, Clone, Default, PartialEq, FromRecord)]
pub struct Anonymous {
    pub id: Id,
    pub name: String,
    pub flag: String,
}

impl Anonymous {
    pub fn is_present(&self) -> bool {
        !self.flag.is_empty()
    }
}
