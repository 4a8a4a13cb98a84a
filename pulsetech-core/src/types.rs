use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

/// User account document (Users collection), keyed by email.
///
/// Field names match the JSON documents the web client exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Base64 image payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Appointment lifecycle. One-way: Scheduled -> Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
}

/// Appointment document (Appointments collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub doctor_email: String,
    pub patient_email: String,
    pub date: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether the given user participates in this appointment,
    /// as either side.
    pub fn involves(&self, email: &str) -> bool {
        self.doctor_email == email || self.patient_email == email
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_appointment_serde_wire_names() {
        let appt = Appointment {
            doctor_email: "dr@pulsetech.test".into(),
            patient_email: "pat@pulsetech.test".into(),
            date: Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap(),
            reason: "Checkup".into(),
            status: AppointmentStatus::Scheduled,
            updated_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        };

        let v = serde_json::to_value(&appt).unwrap();
        assert_eq!(v["doctorEmail"], "dr@pulsetech.test");
        assert_eq!(v["status"], "Scheduled");
        assert!(v["updatedAt"].is_string());
    }

    #[test]
    fn test_involves_either_side() {
        let appt = Appointment {
            doctor_email: "dr@x".into(),
            patient_email: "pat@x".into(),
            date: Utc::now(),
            reason: String::new(),
            status: AppointmentStatus::Completed,
            updated_at: Utc::now(),
        };
        assert!(appt.involves("dr@x"));
        assert!(appt.involves("pat@x"));
        assert!(!appt.involves("other@x"));
    }
}
