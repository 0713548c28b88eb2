use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use shared_models::{Actor, Appointment, AppointmentStatus, BookingError};

use crate::models::BookingRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    Confirm,
    Complete,
    Cancel,
    Reschedule,
}

impl AppointmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentAction::Confirm => "confirm",
            AppointmentAction::Complete => "complete",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::Reschedule => "reschedule",
        }
    }

    /// Status the appointment ends up in. Reschedule resets to pending.
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            AppointmentAction::Confirm => AppointmentStatus::Confirmed,
            AppointmentAction::Complete => AppointmentStatus::Completed,
            AppointmentAction::Cancel => AppointmentStatus::Canceled,
            AppointmentAction::Reschedule => AppointmentStatus::Pending,
        }
    }

    fn allowed_from(&self, status: AppointmentStatus) -> bool {
        match self {
            AppointmentAction::Confirm => status == AppointmentStatus::Pending,
            AppointmentAction::Complete => status == AppointmentStatus::Confirmed,
            AppointmentAction::Cancel | AppointmentAction::Reschedule => status.is_active(),
        }
    }
}

/// Guards of the appointment state machine. Every check is pure; callers
/// pass in the clinic-local current time.
pub struct AppointmentLifecycleService {
    rules: BookingRules,
}

impl AppointmentLifecycleService {
    pub fn new(rules: BookingRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    /// Status, then ownership, then lead time.
    pub fn authorize_transition(
        &self,
        appointment: &Appointment,
        actor: &Actor,
        action: AppointmentAction,
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        self.validate_status_transition(appointment.status, action)?;
        self.check_actor(appointment, actor, action)?;
        self.check_cutoff(appointment, action, now)
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        action: AppointmentAction,
    ) -> Result<(), BookingError> {
        debug!("Validating {} from status {}", action.as_str(), current_status);

        if !action.allowed_from(current_status) {
            warn!("Invalid transition attempted: {} from {}", action.as_str(), current_status);
            return Err(BookingError::InvalidState(current_status));
        }
        Ok(())
    }

    /// Confirm and complete belong to the appointment's doctor, cancel to its
    /// patient, reschedule to its patient or staff.
    pub fn check_actor(
        &self,
        appointment: &Appointment,
        actor: &Actor,
        action: AppointmentAction,
    ) -> Result<(), BookingError> {
        let allowed = match action {
            AppointmentAction::Confirm | AppointmentAction::Complete => actor.is_doctor(appointment.doctor_id),
            AppointmentAction::Cancel => actor.is_patient(appointment.patient_id),
            AppointmentAction::Reschedule => actor.is_staff() || actor.is_patient(appointment.patient_id),
        };

        if !allowed {
            warn!(
                appointment_id = %appointment.id,
                role = actor.role(),
                "Caller may not {} this appointment",
                action.as_str()
            );
            return Err(BookingError::NotOwner(format!("{} this appointment", action.as_str())));
        }
        Ok(())
    }

    /// Cancel and reschedule must happen strictly before the cutoff window
    /// that precedes the visit.
    pub fn check_cutoff(
        &self,
        appointment: &Appointment,
        action: AppointmentAction,
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        let hours = match action {
            AppointmentAction::Cancel => self.rules.cancel_cutoff_hours,
            AppointmentAction::Reschedule => self.rules.reschedule_cutoff_hours,
            AppointmentAction::Confirm | AppointmentAction::Complete => return Ok(()),
        };

        let deadline = Duration::try_hours(hours)
            .and_then(|window| appointment.scheduled_at().checked_sub_signed(window))
            .ok_or_else(|| {
                warn!("Cutoff of {} hours for {} is out of range", hours, action.as_str());
                BookingError::InvalidRequest(format!("{} cutoff of {} hours is out of range", action.as_str(), hours))
            })?;
        if now >= deadline {
            return Err(BookingError::CutoffExceeded {
                action: action.as_str().to_string(),
                hours,
            });
        }
        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        [
            AppointmentAction::Confirm,
            AppointmentAction::Complete,
            AppointmentAction::Cancel,
            AppointmentAction::Reschedule,
        ]
        .into_iter()
        .filter(|action| action.allowed_from(current_status))
        .map(|action| action.target_status())
        .collect()
    }
}
