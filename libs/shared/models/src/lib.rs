pub mod actor;
pub mod appointment;
pub mod doctor;
pub mod error;
pub mod notification;
pub mod schedule;

pub use actor::Actor;
pub use appointment::{
    Appointment, AppointmentRecord, AppointmentStatus, NewAppointment, RecordFields,
};
pub use doctor::{DoctorProfile, VerificationStatus};
pub use error::{BookingError, RejectionKind};
pub use notification::{Notification, NotificationType};
pub use schedule::{NewSchedule, Schedule};

/// Time-of-day format used in notification messages and slot labels.
pub const SLOT_LABEL_FORMAT: &str = "%H:%M";
