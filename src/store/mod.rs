//! Persistence seams. Handlers only ever talk to these traits; `MongoStore`
//! backs them in production.

mod mongo;
#[cfg(test)]
pub mod memory;

pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{NewSchedule, NewUser, Schedule, UpdateOutcome, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate key")]
    Duplicate,

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the timestamp is already taken.
    async fn insert_schedule(&self, schedule: NewSchedule) -> Result<Schedule, StoreError>;

    /// All schedules owned by `user_id`, oldest first.
    async fn schedules_for_user(&self, user_id: ObjectId) -> Result<Vec<Schedule>, StoreError>;

    async fn update_schedule(
        &self,
        id: ObjectId,
        owner: ObjectId,
        date: DateTime<Utc>,
        service: &str,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_schedule(
        &self,
        id: ObjectId,
        owner: ObjectId,
    ) -> Result<Option<Schedule>, StoreError>;
}
