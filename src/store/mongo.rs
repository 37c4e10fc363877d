use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, info, warn};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};

use super::{ScheduleStore, StoreError, UserStore};
use crate::config::ConflictScope;
use crate::db::MongoDB;
use crate::models::{NewSchedule, NewUser, Schedule, UpdateOutcome, User};

const DUPLICATE_KEY: i32 = 11000;
const GLOBAL_SLOT_INDEX: &str = "date_1";
const USER_SLOT_INDEX: &str = "userId_1_date_1";

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    date: BsonDateTime,
    user_name: String,
    user_id: ObjectId,
    service: String,
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        User {
            id: doc.id,
            name: doc.name,
            email: doc.email,
            password_hash: doc.password,
        }
    }
}

impl From<ScheduleDocument> for Schedule {
    fn from(doc: ScheduleDocument) -> Self {
        Schedule {
            id: doc.id,
            date: from_bson_date(doc.date),
            user_name: doc.user_name,
            user_id: doc.user_id,
            service: doc.service,
        }
    }
}

fn to_bson_date(date: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(date.timestamp_millis())
}

fn from_bson_date(date: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The slot index left behind by the other conflict scope, if it exists.
fn stale_slot_index(scope: ConflictScope, existing: &[String]) -> Option<&'static str> {
    let stale = match scope {
        ConflictScope::Global => USER_SLOT_INDEX,
        ConflictScope::PerUser => GLOBAL_SLOT_INDEX,
    };
    existing.iter().any(|name| name == stale).then_some(stale)
}

fn map_write_error(err: mongodb::error::Error) -> StoreError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    };
    if duplicate {
        StoreError::Duplicate
    } else {
        StoreError::Mongo(err)
    }
}

/// `users` and `schedules` collections. Uniqueness of emails and of booked
/// timestamps is enforced by indexes created in [`MongoStore::init`].
#[derive(Clone)]
pub struct MongoStore {
    users: Collection<UserDocument>,
    schedules: Collection<ScheduleDocument>,
}

impl MongoStore {
    pub async fn init(mongodb: &MongoDB, scope: ConflictScope) -> Result<Self, StoreError> {
        let store = MongoStore {
            users: mongodb.db.collection::<UserDocument>("users"),
            schedules: mongodb.db.collection::<ScheduleDocument>("schedules"),
        };
        store.ensure_indexes(scope).await?;
        Ok(store)
    }

    async fn ensure_indexes(&self, scope: ConflictScope) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();

        self.users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        let (slot_keys, slot_name) = match scope {
            ConflictScope::Global => (doc! { "date": 1 }, GLOBAL_SLOT_INDEX),
            ConflictScope::PerUser => (doc! { "userId": 1, "date": 1 }, USER_SLOT_INDEX),
        };
        let slot_options = IndexOptions::builder()
            .unique(true)
            .name(slot_name.to_string())
            .build();
        self.schedules
            .create_index(IndexModel::builder().keys(slot_keys).options(slot_options).build())
            .await?;

        // An index from the other scope would keep enforcing its own uniqueness.
        let existing = self.schedules.list_index_names().await?;
        if let Some(stale) = stale_slot_index(scope, &existing) {
            self.schedules.drop_index(stale).await?;
            warn!("Dropped stale schedule index {} for conflict scope {:?}", stale, scope);
        }

        info!("Unique indexes ensured (conflict scope: {:?})", scope);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let doc = UserDocument {
            id: ObjectId::new(),
            name: user.name,
            email: user.email,
            password: user.password_hash,
        };
        self.users.insert_one(&doc).await.map_err(map_write_error)?;
        Ok(doc.into())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let found = self.users.find_one(doc! { "email": email }).await?;
        Ok(found.map(User::from))
    }
}

#[async_trait]
impl ScheduleStore for MongoStore {
    async fn insert_schedule(&self, schedule: NewSchedule) -> Result<Schedule, StoreError> {
        let doc = ScheduleDocument {
            id: ObjectId::new(),
            date: to_bson_date(schedule.date),
            user_name: schedule.user_name,
            user_id: schedule.user_id,
            service: schedule.service,
        };
        self.schedules.insert_one(&doc).await.map_err(map_write_error)?;
        Ok(doc.into())
    }

    async fn schedules_for_user(&self, user_id: ObjectId) -> Result<Vec<Schedule>, StoreError> {
        let mut cursor = self
            .schedules
            .find(doc! { "userId": user_id })
            .sort(doc! { "date": 1 })
            .await?;

        let mut schedules = Vec::new();
        while let Some(result) = cursor.next().await {
            schedules.push(Schedule::from(result?));
        }
        debug!("Loaded {} schedules for user {}", schedules.len(), user_id);
        Ok(schedules)
    }

    async fn update_schedule(
        &self,
        id: ObjectId,
        owner: ObjectId,
        date: DateTime<Utc>,
        service: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .schedules
            .update_one(
                doc! { "_id": id, "userId": owner },
                doc! { "$set": { "date": to_bson_date(date), "service": service } },
            )
            .await
            .map_err(map_write_error)?;

        Ok(match (result.matched_count, result.modified_count) {
            (0, _) => UpdateOutcome::NotFound,
            (_, 0) => UpdateOutcome::Unchanged,
            _ => UpdateOutcome::Modified,
        })
    }

    async fn delete_schedule(
        &self,
        id: ObjectId,
        owner: ObjectId,
    ) -> Result<Option<Schedule>, StoreError> {
        let deleted = self
            .schedules
            .find_one_and_delete(doc! { "_id": id, "userId": owner })
            .await?;
        Ok(deleted.map(Schedule::from))
    }
}
