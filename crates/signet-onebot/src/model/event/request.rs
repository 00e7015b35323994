//! Request shapes: `request/*/friend` and `request/*/group`.

use signet_core::{EventDescriptor, EventKey, FieldType, Id};
use signet_macros::FromRecord;

use crate::model::types::header;

pub(crate) fn descriptors() -> Vec<EventDescriptor> {
    vec![
        EventDescriptor::new(
            EventKey::request("", "friend"),
            "request.friend",
            header()
                .required("user_id", FieldType::Id)
                .optional("comment", FieldType::String)
                .required("flag", FieldType::String)
                .build(),
        ),
        EventDescriptor::new(
            EventKey::request("", "group"),
            "request.group",
            header()
                .required("group_id", FieldType::Id)
                .required("user_id", FieldType::Id)
                .optional("comment", FieldType::String)
                .required("flag", FieldType::String)
                .optional("sub_type", FieldType::String)
                .build(),
        ),
    ]
}

/// Friend request.
#[derive(Debug, Clone, PartialEq, FromRecord)]
pub struct FriendRequest {
    pub user_id: Id,
    pub comment: String,
    /// Token to pass back when answering the request.
    pub flag: String,
}

/// Group join request or invitation.
#[derive(Debug, Clone, PartialEq, FromRecord)]
pub struct GroupRequest {
    pub group_id: Id,
    pub user_id: Id,
    pub comment: String,
    pub flag: String,
    /// "add" or "invite".
    pub sub_type: String,
}

impl GroupRequest {
    pub fn is_invite(&self) -> bool {
        self.sub_type == "invite"
    }
}
