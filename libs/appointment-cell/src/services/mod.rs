pub mod booking;
pub mod lifecycle;
pub mod validator;

pub use booking::AppointmentBookingService;
pub use lifecycle::{AppointmentAction, AppointmentLifecycleService};
pub use validator::BookingValidator;
