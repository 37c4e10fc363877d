use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::serialize_object_id_as_hex_string;
use serde::Serialize;

/// A booked appointment.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(serialize_with = "serialize_object_id_as_hex_string")]
    pub id: ObjectId,
    pub date: DateTime<Utc>,
    pub user_name: String,
    #[serde(serialize_with = "serialize_object_id_as_hex_string")]
    pub user_id: ObjectId,
    pub service: String,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub date: DateTime<Utc>,
    pub user_name: String,
    pub user_id: ObjectId,
    pub service: String,
}

/// Result of overwriting a schedule's date and service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Modified,
    /// The schedule exists but already held these values.
    Unchanged,
    NotFound,
}
