// src/schedule.rs

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::info;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::required;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{NewSchedule, Schedule, UpdateOutcome};
use crate::store::{ScheduleStore, StoreError};

/// Request payload for booking a schedule
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub user_name: Option<String>,
    pub date: Option<String>,
    pub service: Option<String>,
}

/// Request payload for moving a schedule
#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    pub date: Option<String>,
    pub service: Option<String>,
}

/// A user's schedules split around the current instant.
#[derive(Debug, Serialize)]
pub struct ScheduleOverview {
    #[serde(rename = "pastSchedules")]
    pub past: Vec<Schedule>,
    #[serde(rename = "presentSchedules")]
    pub upcoming: Vec<Schedule>,
}

/// Parses a client-supplied date into the canonical stored form: UTC,
/// truncated to whole milliseconds.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS[.fff]]` (read as UTC) and a bare
/// `YYYY-MM-DD` (UTC midnight).
pub fn normalize_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let raw = raw.trim();

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .ok_or_else(|| ApiError::Validation(format!("Invalid date: {}", raw)))?;

    DateTime::from_timestamp_millis(parsed.timestamp_millis())
        .ok_or_else(|| ApiError::Validation(format!("Date out of range: {}", raw)))
}

/// Splits schedules into those strictly before `now` and those at or after it.
pub fn partition_by(schedules: Vec<Schedule>, now: DateTime<Utc>) -> ScheduleOverview {
    let (past, upcoming): (Vec<Schedule>, Vec<Schedule>) =
        schedules.into_iter().partition(|s| s.date < now);
    ScheduleOverview { past, upcoming }
}

fn parse_schedule_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| ApiError::Validation(format!("Invalid schedule id: {}", raw)))
}

/// The caller may only act on their own bookings.
fn ensure_same_user(path_user_id: &str, caller: &AuthUser) -> Result<(), ApiError> {
    let user_id = ObjectId::parse_str(path_user_id.trim())
        .map_err(|_| ApiError::Validation(format!("Invalid user id: {}", path_user_id)))?;
    if user_id == caller.user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Cannot access another user's schedules".to_string(),
        ))
    }
}

fn slot_taken(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate => {
            ApiError::Conflict("Another service is already booked for that date".to_string())
        }
        other => other.into(),
    }
}

/// Booking operations over a [`ScheduleStore`], always scoped to one owner.
#[derive(Clone)]
pub struct ScheduleService {
    schedules: Arc<dyn ScheduleStore>,
}

impl ScheduleService {
    pub fn new(schedules: Arc<dyn ScheduleStore>) -> Self {
        Self { schedules }
    }

    pub async fn create(
        &self,
        owner: ObjectId,
        request: &CreateScheduleRequest,
    ) -> Result<Schedule, ApiError> {
        let user_name = required(&request.user_name, "User name is required")?;
        let date = normalize_date(&required(&request.date, "Date is required")?)?;
        let service = required(&request.service, "Service is required")?;

        let schedule = self
            .schedules
            .insert_schedule(NewSchedule {
                date,
                user_name,
                user_id: owner,
                service,
            })
            .await
            .map_err(slot_taken)?;

        info!("Schedule {} booked for {}", schedule.id, schedule.date);
        Ok(schedule)
    }

    pub async fn read(
        &self,
        owner: ObjectId,
        now: DateTime<Utc>,
    ) -> Result<ScheduleOverview, ApiError> {
        let schedules = self.schedules.schedules_for_user(owner).await?;
        Ok(partition_by(schedules, now))
    }

    pub async fn update(
        &self,
        owner: ObjectId,
        id: ObjectId,
        request: &UpdateScheduleRequest,
    ) -> Result<UpdateOutcome, ApiError> {
        let date = normalize_date(&required(&request.date, "Date is required")?)?;
        let service = required(&request.service, "Service is required")?;

        let outcome = self
            .schedules
            .update_schedule(id, owner, date, &service)
            .await
            .map_err(slot_taken)?;

        info!("Schedule {} update: {:?}", id, outcome);
        Ok(outcome)
    }

    pub async fn delete(
        &self,
        owner: ObjectId,
        id: ObjectId,
    ) -> Result<Option<Schedule>, ApiError> {
        let deleted = self.schedules.delete_schedule(id, owner).await?;
        if deleted.is_some() {
            info!("Schedule {} cancelled", id);
        }
        Ok(deleted)
    }
}

/// GET /schedule/read/{user_id}
pub async fn read_schedules(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    ensure_same_user(&path, &caller)?;
    let overview = data.schedules.read(caller.user_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(overview))
}

/// POST /schedule/create/{user_id}
pub async fn create_schedule(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
    payload: web::Json<CreateScheduleRequest>,
) -> Result<HttpResponse, ApiError> {
    ensure_same_user(&path, &caller)?;
    let schedule = data.schedules.create(caller.user_id, &payload).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "msg": "Schedule booked successfully",
        "schedule": schedule,
    })))
}

/// PUT /schedule/update/{id}
pub async fn update_schedule(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
    payload: web::Json<UpdateScheduleRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_schedule_id(&path)?;
    match data.schedules.update(caller.user_id, id, &payload).await? {
        UpdateOutcome::Modified => Ok(HttpResponse::Ok().json(serde_json::json!({
            "msg": "Schedule updated successfully",
            "modified": true,
        }))),
        UpdateOutcome::Unchanged => Ok(HttpResponse::Ok().json(serde_json::json!({
            "msg": "No changes were made",
            "modified": false,
        }))),
        UpdateOutcome::NotFound => Err(ApiError::NotFound("Schedule not found".to_string())),
    }
}

/// DELETE /schedule/delete/{id}
pub async fn delete_schedule(
    data: web::Data<AppState>,
    caller: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_schedule_id(&path)?;
    match data.schedules.delete(caller.user_id, id).await? {
        Some(deleted) => {
            Ok(HttpResponse::Ok().json(serde_json::json!({ "deletedSchedule": deleted })))
        }
        None => Err(ApiError::NotFound("Schedule not found".to_string())),
    }
}
