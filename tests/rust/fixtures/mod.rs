//! Record types and helpers shared by the unit and integration suites

#![allow(dead_code)]

use monger::driver::memory::MemoryDriver;
use monger::{Connection, Document, Fields, OdmConfig, Record, RecordBase, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn connect() -> (Arc<MemoryDriver>, Connection) {
    connect_with(OdmConfig::default())
}

pub fn connect_with(config: OdmConfig) -> (Arc<MemoryDriver>, Connection) {
    init_logging();
    let driver = Arc::new(MemoryDriver::new());
    let connection = Connection::new(driver.clone(), config);
    (driver, connection)
}

macro_rules! impl_record {
    ($ty:ty) => {
        impl Record for $ty {
            fn base(&self) -> &RecordBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut RecordBase {
                &mut self.base
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: RecordBase,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Box<Profile>>,
}

impl Schema for User {
    fn declare(fields: &mut Fields) {
        fields
            .nested::<RecordBase>("Base", "inline")
            .scalar("Username", "username")
            .scalar("Email", "email,omitempty")
            .scalar("Age", "age")
            .record::<Profile>("Profile", "profile,omitempty;hasOne;foreignkey=user_id");
    }
}

impl_record!(User);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub base: RecordBase,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

impl Schema for Profile {
    fn declare(fields: &mut Fields) {
        fields
            .nested::<RecordBase>("Base", "inline")
            .scalar("Bio", "bio")
            .scalar("UserID", "user_id")
            .record::<User>("User", "user,omitempty;belongTo;foreignkey=user_id");
    }
}

impl_record!(Profile);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(flatten)]
    pub base: RecordBase,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub master_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Membership>,
}

impl Schema for Conversation {
    fn declare(fields: &mut Fields) {
        fields
            .nested::<RecordBase>("Base", "inline")
            .scalar("Title", "title")
            .scalar("MasterID", "master_id")
            .record::<User>("Master", "master,omitempty;belongTo;foreignkey=master_id")
            .records::<Membership>("Members", "members,omitempty;hasMany;foreignkey=conversation_id");
    }
}

impl_record!(Conversation);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    #[serde(flatten)]
    pub base: RecordBase,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Schema for Membership {
    fn declare(fields: &mut Fields) {
        fields
            .nested::<RecordBase>("Base", "inline")
            .scalar("ConversationID", "conversation_id")
            .scalar("UserID", "user_id")
            .scalar("Role", "role")
            .record::<User>("User", "user,omitempty;belongTo;localfield=user_id;foreignfield=_id");
    }
}

impl Record for Membership {
    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn collection_name() -> Option<&'static str> {
        Some("conversation_members")
    }
}

/// Two fields persisted under one name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clashing {
    #[serde(flatten)]
    pub base: RecordBase,
    pub label: String,
}

impl Schema for Clashing {
    fn declare(fields: &mut Fields) {
        fields
            .nested::<RecordBase>("Base", "inline")
            .scalar("Label", "label")
            .scalar("Caption", "column=label");
    }
}

impl_record!(Clashing);
