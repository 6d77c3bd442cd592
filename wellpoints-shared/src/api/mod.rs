use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_PREFIX: &str = "/api";

// Auth
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
}

/// A user's logged wellness counters for a given date.
///
/// The same shape is used for create (no `id`), update (`id` required)
/// and reads. `username` is filled by the server for non-admin callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub date: NaiveDate,
    pub exercise: i32,
    pub meals: i32,
    pub alcohol: i32,
}

/// Weekly aggregate: the Monday of the week window plus the summed
/// counters over the caller's records in that window. Derived, never
/// stored.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointsPerWeekDto {
    pub week: NaiveDate,
    pub points: i32,
}

/// Structured error body. `entity_name`/`error_key` are present for
/// validation failures so clients can map them to field-level alerts.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_key: Option<String>,
}
