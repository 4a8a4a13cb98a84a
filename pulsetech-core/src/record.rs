//! Medical record document and its embedded medication / time-series
//! structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one scheduled administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoseStatus {
    Taken,
    Missed,
}

/// One dose event. Append-only: once recorded, never mutated or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseLog {
    pub time: DateTime<Utc>,
    pub status: DoseStatus,
}

/// A medication on a user's record. Owned by exactly one MedicalRecord
/// and mutated only through the tracker operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationEntry {
    pub name: String,
    pub time_to_take: String,
    /// Raw frequency label as entered by the client. Labels outside the
    /// recognized set are kept as-is; they simply never get a computed
    /// next dose.
    pub frequency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_dose_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs: Vec<DoseLog>,
}

impl MedicationEntry {
    pub fn missed_count(&self) -> usize {
        self.logs
            .iter()
            .filter(|l| l.status == DoseStatus::Missed)
            .count()
    }
}

/// One reading in a health time series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub time: DateTime<Utc>,
    pub value: Value,
}

/// The four series `add-health-data` may append to. A closed set:
/// anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthSeries {
    HeartRate,
    StepCount,
    SleepTracking,
    MedicalLogs,
}

impl HealthSeries {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "heartRate" => Some(HealthSeries::HeartRate),
            "stepCount" => Some(HealthSeries::StepCount),
            "sleepTracking" => Some(HealthSeries::SleepTracking),
            "medicalLogs" => Some(HealthSeries::MedicalLogs),
            _ => None,
        }
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            HealthSeries::HeartRate => "heartRate",
            HealthSeries::StepCount => "stepCount",
            HealthSeries::SleepTracking => "sleepTracking",
            HealthSeries::MedicalLogs => "medicalLogs",
        }
    }
}

/// Medical record document (MedicalRecords collection). At most one per
/// user email; created on first save, updated in place thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,

    #[serde(default)]
    pub heart_rate: Vec<SeriesEntry>,
    #[serde(default)]
    pub step_count: Vec<SeriesEntry>,
    #[serde(default)]
    pub sleep_tracking: Vec<SeriesEntry>,
    #[serde(default)]
    pub blood_oxygen: Vec<SeriesEntry>,
    #[serde(default)]
    pub medical_logs: Vec<SeriesEntry>,

    #[serde(default)]
    pub medications: Vec<MedicationEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MedicalRecord {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            full_name: None,
            date_of_birth: None,
            blood_type: None,
            allergies: None,
            conditions: None,
            heart_rate: Vec::new(),
            step_count: Vec::new(),
            sleep_tracking: Vec::new(),
            blood_oxygen: Vec::new(),
            medical_logs: Vec::new(),
            medications: Vec::new(),
            updated_at: None,
        }
    }

    /// Append a reading to one of the closed set of series.
    pub fn append_reading(&mut self, series: HealthSeries, entry: SeriesEntry) {
        match series {
            HealthSeries::HeartRate => self.heart_rate.push(entry),
            HealthSeries::StepCount => self.step_count.push(entry),
            HealthSeries::SleepTracking => self.sleep_tracking.push(entry),
            HealthSeries::MedicalLogs => self.medical_logs.push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_parses_sparse_document() {
        // Documents written by older clients carry only a subset of fields
        let record: MedicalRecord =
            serde_json::from_value(json!({"email": "a@b.c"})).unwrap();
        assert_eq!(record.email, "a@b.c");
        assert!(record.medications.is_empty());
        assert!(record.heart_rate.is_empty());
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_series_names_closed_set() {
        assert_eq!(
            HealthSeries::from_name("heartRate"),
            Some(HealthSeries::HeartRate)
        );
        assert_eq!(HealthSeries::from_name("bloodOxygen"), None);
        assert_eq!(HealthSeries::from_name("heartrate"), None);
    }

    #[test]
    fn test_append_reading_dispatch() {
        let mut record = MedicalRecord::new("a@b.c");
        record.append_reading(
            HealthSeries::StepCount,
            SeriesEntry {
                time: Utc::now(),
                value: json!(8200),
            },
        );
        assert_eq!(record.step_count.len(), 1);
        assert!(record.heart_rate.is_empty());
    }

    #[test]
    fn test_medication_wire_names() {
        let med = MedicationEntry {
            name: "Amoxicillin".into(),
            time_to_take: "08:00".into(),
            frequency: "Every 8 hours".into(),
            next_dose_time: None,
            logs: vec![DoseLog {
                time: Utc::now(),
                status: DoseStatus::Taken,
            }],
        };
        let v = serde_json::to_value(&med).unwrap();
        assert_eq!(v["timeToTake"], "08:00");
        assert_eq!(v["logs"][0]["status"], "Taken");
        assert!(v.get("nextDoseTime").is_none());
    }
}
