//! Medication tracker: mutations over a user's medication list.
//!
//! These functions operate on an already-loaded record; the server runs
//! them inside a store transaction so the whole-list read-modify-write
//! is atomic per record.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{PulseError, Result};
use crate::record::{DoseLog, DoseStatus, MedicalRecord, MedicationEntry};
use crate::schedule;

/// Client payload for a new medication
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedication {
    pub name: String,
    pub time_to_take: String,
    #[serde(default)]
    pub frequency: String,
}

/// Append a medication with an empty dose log.
///
/// Duplicate names are allowed and create a second entry; the original
/// application behaves the same way and mark operations act on the
/// first name match.
pub fn add_medication(record: &mut MedicalRecord, med: NewMedication) -> Result<()> {
    if med.name.trim().is_empty() {
        return Err(PulseError::invalid_input("Medication name is required"));
    }
    if med.time_to_take.trim().is_empty() {
        return Err(PulseError::invalid_input("Time to take is required"));
    }

    record.medications.push(MedicationEntry {
        name: med.name,
        time_to_take: med.time_to_take,
        frequency: med.frequency,
        next_dose_time: None,
        logs: Vec::new(),
    });
    Ok(())
}

/// Record a taken dose at `now` and recompute the next dose time from
/// the medication's frequency. An unrecognized frequency leaves the
/// next dose unset.
pub fn mark_taken(record: &mut MedicalRecord, name: &str, now: DateTime<Utc>) -> Result<()> {
    let med = find_medication(record, name)?;
    med.logs.push(DoseLog {
        time: now,
        status: DoseStatus::Taken,
    });
    med.next_dose_time = schedule::next_dose(now, &med.frequency);
    Ok(())
}

/// Record a missed dose at `now`. The next dose time is deliberately
/// left untouched; only a taken dose moves the schedule forward.
pub fn mark_missed(record: &mut MedicalRecord, name: &str, now: DateTime<Utc>) -> Result<()> {
    let med = find_medication(record, name)?;
    med.logs.push(DoseLog {
        time: now,
        status: DoseStatus::Missed,
    });
    Ok(())
}

/// First entry with an exact name match.
fn find_medication<'a>(
    record: &'a mut MedicalRecord,
    name: &str,
) -> Result<&'a mut MedicationEntry> {
    record
        .medications
        .iter_mut()
        .find(|m| m.name == name)
        .ok_or_else(|| PulseError::not_found("Medication", name))
}
