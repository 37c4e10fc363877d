//! In-process stand-in for [`super::MongoStore`] with the same uniqueness rules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use super::{ScheduleStore, StoreError, UserStore};
use crate::config::ConflictScope;
use crate::models::{NewSchedule, NewUser, Schedule, UpdateOutcome, User};

pub struct MemoryStore {
    scope: ConflictScope,
    users: Mutex<Vec<User>>,
    schedules: Mutex<Vec<Schedule>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(scope: ConflictScope) -> Self {
        Self {
            scope,
            users: Mutex::new(Vec::new()),
            schedules: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of store operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn slot_taken(&self, existing: &Schedule, user_id: ObjectId, date: DateTime<Utc>) -> bool {
        existing.date == date
            && match self.scope {
                ConflictScope::Global => true,
                ConflictScope::PerUser => existing.user_id == user_id,
            }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ConflictScope::Global)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.touch();
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: ObjectId::new(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.touch();
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn insert_schedule(&self, schedule: NewSchedule) -> Result<Schedule, StoreError> {
        self.touch();
        let mut schedules = self.schedules.lock().unwrap();
        if schedules
            .iter()
            .any(|s| self.slot_taken(s, schedule.user_id, schedule.date))
        {
            return Err(StoreError::Duplicate);
        }
        let schedule = Schedule {
            id: ObjectId::new(),
            date: schedule.date,
            user_name: schedule.user_name,
            user_id: schedule.user_id,
            service: schedule.service,
        };
        schedules.push(schedule.clone());
        Ok(schedule)
    }

    async fn schedules_for_user(&self, user_id: ObjectId) -> Result<Vec<Schedule>, StoreError> {
        self.touch();
        let schedules = self.schedules.lock().unwrap();
        let mut owned: Vec<Schedule> = schedules
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|s| s.date);
        Ok(owned)
    }

    async fn update_schedule(
        &self,
        id: ObjectId,
        owner: ObjectId,
        date: DateTime<Utc>,
        service: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        self.touch();
        let mut schedules = self.schedules.lock().unwrap();
        let Some(index) = schedules.iter().position(|s| s.id == id && s.user_id == owner) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if schedules
            .iter()
            .any(|s| s.id != id && self.slot_taken(s, owner, date))
        {
            return Err(StoreError::Duplicate);
        }

        let target = &mut schedules[index];
        if target.date == date && target.service == service {
            return Ok(UpdateOutcome::Unchanged);
        }
        target.date = date;
        target.service = service.to_string();
        Ok(UpdateOutcome::Modified)
    }

    async fn delete_schedule(
        &self,
        id: ObjectId,
        owner: ObjectId,
    ) -> Result<Option<Schedule>, StoreError> {
        self.touch();
        let mut schedules = self.schedules.lock().unwrap();
        Ok(schedules
            .iter()
            .position(|s| s.id == id && s.user_id == owner)
            .map(|index| schedules.remove(index)))
    }
}
