use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The slice of a doctor's profile the booking core relies on. The
/// profile itself is owned by the identity/profile collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub price: i64,
    pub verification_status: VerificationStatus,
    pub is_available: bool,
}

impl DoctorProfile {
    /// Only verified doctors that are currently taking patients can be booked.
    pub fn is_bookable(&self) -> bool {
        self.verification_status == VerificationStatus::Verified && self.is_available
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "PENDING"),
            VerificationStatus::Verified => write!(f, "VERIFIED"),
            VerificationStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}
