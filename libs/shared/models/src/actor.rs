use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The caller of a core operation, resolved once by the authorization
/// layer and passed explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Patient(Uuid),
    Doctor(Uuid),
    Staff,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::Staff)
    }

    pub fn is_patient(&self, patient_id: Uuid) -> bool {
        matches!(self, Actor::Patient(id) if *id == patient_id)
    }

    pub fn is_doctor(&self, doctor_id: Uuid) -> bool {
        matches!(self, Actor::Doctor(id) if *id == doctor_id)
    }

    /// Whether this actor may manage the schedules of `doctor_id`.
    pub fn manages_doctor(&self, doctor_id: Uuid) -> bool {
        match self {
            Actor::Staff => true,
            Actor::Doctor(id) => *id == doctor_id,
            Actor::Patient(_) => false,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Actor::Patient(_) => "patient",
            Actor::Doctor(_) => "doctor",
            Actor::Staff => "staff",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_manages_only_own_schedule() {
        let doctor_id = Uuid::new_v4();
        let actor = Actor::Doctor(doctor_id);

        assert!(actor.manages_doctor(doctor_id));
        assert!(!actor.manages_doctor(Uuid::new_v4()));
        assert!(Actor::Staff.manages_doctor(doctor_id));
        assert!(!Actor::Patient(doctor_id).manages_doctor(doctor_id));
    }

    #[test]
    fn actor_serializes_with_role_tag() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(Actor::Patient(id)).unwrap();
        assert_eq!(value["role"], "patient");
        assert_eq!(value["id"], id.to_string());

        let staff = serde_json::to_value(Actor::Staff).unwrap();
        assert_eq!(staff["role"], "staff");
    }
}
