pub mod memory;
pub mod repository;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use repository::{
    AppointmentFilter, AppointmentRepository, DoctorDirectory, NotificationSink,
    RecordRepository, Repositories, ScheduleRepository, StoreError, UpsertOutcome,
};
pub use store::SupabaseStore;
pub use supabase::{SupabaseClient, SupabaseError};
