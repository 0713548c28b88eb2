use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::appointment::AppointmentStatus;

/// Every way a booking-core operation can be refused, plus the storage
/// failure that is not a refusal at all.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "detail")]
pub enum BookingError {
    #[error("Cannot create or modify a schedule for a past date")]
    PastDate,

    #[error("Schedule end time must be after start time")]
    InvalidRange,

    #[error("Doctor is not verified or not accepting appointments")]
    DoctorNotBookable,

    #[error("Cannot book an appointment in the past")]
    PastBooking,

    #[error("Doctor has no working hours on {0}")]
    NoWorkingHours(String),

    #[error("Appointment time must be within working hours ({start} - {end})")]
    OutsideWorkingHours { start: String, end: String },

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("Doctor has reached the maximum number of patients for this date")]
    CapacityExceeded,

    #[error("Caller is not allowed to {0}")]
    NotOwner(String),

    #[error("Appointment cannot be changed in status '{0}'")]
    InvalidState(AppointmentStatus),

    #[error("Cannot {action} within {hours} hours of the appointment")]
    CutoffExceeded { action: String, hours: i64 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Doctor has no working schedule on the selected date")]
    NoSchedule,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Stable reason code carried by every rejection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    PastDate,
    InvalidRange,
    DoctorNotBookable,
    PastBooking,
    NoWorkingHours,
    OutsideWorkingHours,
    SlotTaken,
    CapacityExceeded,
    NotOwner,
    InvalidState,
    CutoffExceeded,
    NotFound,
    NoSchedule,
    InvalidRequest,
    Storage,
}

impl BookingError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            BookingError::PastDate => RejectionKind::PastDate,
            BookingError::InvalidRange => RejectionKind::InvalidRange,
            BookingError::DoctorNotBookable => RejectionKind::DoctorNotBookable,
            BookingError::PastBooking => RejectionKind::PastBooking,
            BookingError::NoWorkingHours(_) => RejectionKind::NoWorkingHours,
            BookingError::OutsideWorkingHours { .. } => RejectionKind::OutsideWorkingHours,
            BookingError::SlotTaken => RejectionKind::SlotTaken,
            BookingError::CapacityExceeded => RejectionKind::CapacityExceeded,
            BookingError::NotOwner(_) => RejectionKind::NotOwner,
            BookingError::InvalidState(_) => RejectionKind::InvalidState,
            BookingError::CutoffExceeded { .. } => RejectionKind::CutoffExceeded,
            BookingError::NotFound(_) => RejectionKind::NotFound,
            BookingError::NoSchedule => RejectionKind::NoSchedule,
            BookingError::InvalidRequest(_) => RejectionKind::InvalidRequest,
            BookingError::Storage(_) => RejectionKind::Storage,
        }
    }

    /// False only for infrastructure failures; everything else is a
    /// business rule refusing the request.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, BookingError::Storage(_))
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(BookingError::SlotTaken.kind(), RejectionKind::SlotTaken);
        assert_eq!(
            BookingError::InvalidState(AppointmentStatus::Completed).kind(),
            RejectionKind::InvalidState
        );
        assert_eq!(RejectionKind::CutoffExceeded.to_string(), "CutoffExceeded");
    }

    #[test]
    fn storage_failures_are_not_rejections() {
        assert!(!BookingError::Storage("timeout".into()).is_rejection());
        assert!(BookingError::CapacityExceeded.is_rejection());
    }

    #[test]
    fn errors_round_trip_through_json() {
        let err = BookingError::CutoffExceeded { action: "cancel".into(), hours: 12 };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "CutoffExceeded");

        let back: BookingError = serde_json::from_value(json).unwrap();
        assert_matches!(back, BookingError::CutoffExceeded { hours: 12, .. });
        assert_eq!(back.to_string(), "Cannot cancel within 12 hours of the appointment");
    }
}
