use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::{
    within_range, AppConfig, CUTOFF_HOURS_RANGE, DEFAULT_CANCEL_CUTOFF_HOURS,
    DEFAULT_RESCHEDULE_CUTOFF_HOURS, DEFAULT_SLOT_MINUTES, SLOT_MINUTES_RANGE,
};
use shared_models::{Appointment, AppointmentRecord, AppointmentStatus, RecordFields};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    #[serde(default)]
    pub record: RecordFields,
}

/// Narrows a listing further than the caller's role already does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionOutcome {
    pub appointment: Appointment,
    pub record: AppointmentRecord,
}

// ==============================================================================
// BOOKING RULES
// ==============================================================================

/// Lead times and defaults the state machine is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRules {
    pub cancel_cutoff_hours: i64,
    pub reschedule_cutoff_hours: i64,
    pub default_slot_minutes: u32,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            cancel_cutoff_hours: DEFAULT_CANCEL_CUTOFF_HOURS,
            reschedule_cutoff_hours: DEFAULT_RESCHEDULE_CUTOFF_HOURS,
            default_slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

impl BookingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cancel_cutoff_hours: within_range(
                "cancel_cutoff_hours",
                config.cancel_cutoff_hours,
                CUTOFF_HOURS_RANGE,
                DEFAULT_CANCEL_CUTOFF_HOURS,
            ),
            reschedule_cutoff_hours: within_range(
                "reschedule_cutoff_hours",
                config.reschedule_cutoff_hours,
                CUTOFF_HOURS_RANGE,
                DEFAULT_RESCHEDULE_CUTOFF_HOURS,
            ),
            default_slot_minutes: within_range(
                "default_slot_minutes",
                config.default_slot_minutes,
                SLOT_MINUTES_RANGE,
                DEFAULT_SLOT_MINUTES,
            ),
        }
    }
}
