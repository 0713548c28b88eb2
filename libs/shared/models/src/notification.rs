use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Patient or doctor id of the counterparty being told about the change.
    pub recipient_id: Uuid,
    pub appointment_id: Uuid,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: Uuid,
        appointment_id: Uuid,
        notification_type: NotificationType,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            recipient_id,
            appointment_id,
            message: message.into(),
            notification_type,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AppointmentCreated,
    AppointmentConfirmed,
    AppointmentCompleted,
    AppointmentCanceled,
    AppointmentRescheduled,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::AppointmentCreated => write!(f, "appointment_created"),
            NotificationType::AppointmentConfirmed => write!(f, "appointment_confirmed"),
            NotificationType::AppointmentCompleted => write!(f, "appointment_completed"),
            NotificationType::AppointmentCanceled => write!(f, "appointment_canceled"),
            NotificationType::AppointmentRescheduled => write!(f, "appointment_rescheduled"),
        }
    }
}
