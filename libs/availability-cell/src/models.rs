use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertScheduleRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_is_available")]
    pub is_available: bool,
    pub max_patients: Option<u32>,
}

fn default_is_available() -> bool {
    true
}

/// Result of replicating one week of schedules onto another.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CopyWeekSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    /// Target dates left untouched, either because the source day had no
    /// schedule or because the target day is already in the past.
    pub skipped_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSlots {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot_duration_minutes: u32,
    pub slots: Vec<NaiveTime>,
    pub capacity_reached: bool,
    pub message: Option<String>,
}

impl AvailableSlots {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
