use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::SLOT_LABEL_FORMAT;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Clinic-local wall-clock moment of the visit.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// `YYYY-MM-DD HH:MM`, as shown to patients and doctors.
    pub fn slot_label(&self) -> String {
        format!("{} {}", self.date.format("%Y-%m-%d"), self.time.format(SLOT_LABEL_FORMAT))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    /// Active appointments hold their slot and count toward capacity.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values written when a patient books. New appointments always start pending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

/// Visit record attached 1:1 to a completed appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub reason: Option<String>,
    pub description: Option<String>,
    pub status_before: Option<String>,
    pub status_after: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    /// Copies every supplied field onto the record. Returns whether anything changed.
    pub fn apply(&mut self, fields: &RecordFields) -> bool {
        let mut updated = false;
        for (target, value) in [
            (&mut self.reason, &fields.reason),
            (&mut self.description, &fields.description),
            (&mut self.status_before, &fields.status_before),
            (&mut self.status_after, &fields.status_after),
        ] {
            if let Some(value) = value {
                *target = Some(value.clone());
                updated = true;
            }
        }
        updated
    }
}

/// Optional record fields a doctor may supply when completing a visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordFields {
    pub reason: Option<String>,
    pub description: Option<String>,
    pub status_before: Option<String>,
    pub status_after: Option<String>,
}

impl RecordFields {
    pub fn is_empty(&self) -> bool {
        self.reason.is_none()
            && self.description.is_none()
            && self.status_before.is_none()
            && self.status_after.is_none()
    }
}
