//! Health dashboard aggregation: adherence statistics, alerts, and the
//! derived snapshot payload.
//!
//! Everything here is pure over already-loaded documents; the server
//! layer does the collection reads and name resolution.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::record::{DoseStatus, MedicalRecord, MedicationEntry, SeriesEntry};
use crate::types::{Appointment, AppointmentStatus};

/// Per-date taken/missed counts, parallel to `dates`. Dates appear in
/// first-seen order while scanning every medication's log sequence, not
/// sorted.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AdherenceStats {
    pub dates: Vec<String>,
    pub taken: Vec<u32>,
    pub missed: Vec<u32>,
}

/// Derived dashboard payload. Never persisted; recomputed per request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Latest change across the user's appointments and record, for the
    /// client to send back as `lastUpdated` next time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub recent_appointments: Vec<AppointmentView>,
    pub upcoming_appointments: Vec<AppointmentView>,
    pub medications: Vec<MedicationEntry>,
    pub medication_stats: AdherenceStats,
    pub alerts: Vec<String>,
    pub heart_rate: Vec<SeriesEntry>,
    pub step_count: Vec<SeriesEntry>,
    pub sleep_tracking: Vec<SeriesEntry>,
    pub medical_logs: Vec<SeriesEntry>,
}

/// Appointment annotated with the counterpart's display name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub counterpart_name: String,
}

/// Latest `updatedAt` across the record and the user's appointments,
/// ignoring the record when it carries no timestamp.
pub fn latest_change_time(
    record: Option<&MedicalRecord>,
    appointments: &[Appointment],
) -> Option<DateTime<Utc>> {
    appointments
        .iter()
        .map(|a| a.updated_at)
        .chain(record.and_then(|r| r.updated_at))
        .max()
}

/// The 3 most recent Completed appointments, newest first.
pub fn recent_completed(appointments: &[Appointment]) -> Vec<Appointment> {
    let mut completed: Vec<Appointment> = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .cloned()
        .collect();
    completed.sort_by(|a, b| b.date.cmp(&a.date));
    completed.truncate(3);
    completed
}

/// The 3 soonest Scheduled appointments, earliest first.
pub fn upcoming_scheduled(appointments: &[Appointment]) -> Vec<Appointment> {
    let mut scheduled: Vec<Appointment> = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
        .cloned()
        .collect();
    scheduled.sort_by(|a, b| a.date.cmp(&b.date));
    scheduled.truncate(3);
    scheduled
}

/// Scan every medication's log sequence and bucket taken/missed counts
/// by calendar date (date portion of the log timestamp).
pub fn adherence_stats(medications: &[MedicationEntry]) -> AdherenceStats {
    let mut stats = AdherenceStats::default();

    for med in medications {
        for log in &med.logs {
            let date = log.time.format("%Y-%m-%d").to_string();
            let idx = match stats.dates.iter().position(|d| *d == date) {
                Some(i) => i,
                None => {
                    stats.dates.push(date);
                    stats.taken.push(0);
                    stats.missed.push(0);
                    stats.dates.len() - 1
                }
            };
            match log.status {
                DoseStatus::Taken => stats.taken[idx] += 1,
                DoseStatus::Missed => stats.missed[idx] += 1,
            }
        }
    }

    stats
}

/// Derive the alert list. Each condition is evaluated independently and
/// the output order is fixed.
pub fn health_alerts(medications: &[MedicationEntry], now: DateTime<Utc>) -> Vec<String> {
    let mut alerts = Vec::new();

    // Due soon: next dose strictly in the future, within the next hour
    let due_soon = medications.iter().any(|m| {
        m.next_dose_time
            .is_some_and(|t| t > now && t <= now + Duration::minutes(60))
    });
    if due_soon {
        alerts.push("You have a medication dose due within the next hour.".to_string());
    }

    let overdue = medications.iter().filter(|m| m.missed_count() >= 1).count();
    if overdue > 0 {
        alerts.push(format!(
            "{} medication(s) have missed doses. Try to stay on schedule.",
            overdue
        ));
    }

    let critical = medications.iter().filter(|m| m.missed_count() >= 3).count();
    if critical > 0 {
        alerts.push(
            "Critical medication warning: repeated missed doses detected. Please review your medication schedule."
                .to_string(),
        );
    }

    let total_missed: usize = medications.iter().map(|m| m.missed_count()).sum();
    if total_missed >= 5 {
        alerts.push(format!(
            "You have missed {} doses in total. Please contact your doctor.",
            total_missed
        ));
    }

    alerts
}

/// Last `n` entries of a series, oldest first.
pub fn series_tail(series: &[SeriesEntry], n: usize) -> Vec<SeriesEntry> {
    let start = series.len().saturating_sub(n);
    series[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DoseLog;
    use chrono::TimeZone;
    use serde_json::json;

    fn med(name: &str, logs: Vec<DoseLog>) -> MedicationEntry {
        MedicationEntry {
            name: name.into(),
            time_to_take: "08:00".into(),
            frequency: "Once a day".into(),
            next_dose_time: None,
            logs,
        }
    }

    fn log(status: DoseStatus, y: i32, m: u32, d: u32, h: u32) -> DoseLog {
        DoseLog {
            time: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            status,
        }
    }

    #[test]
    fn test_adherence_stats_first_seen_order() {
        // D1 = 2025-03-10 (2 taken, 1 missed), D2 = 2025-03-11 (1 taken)
        let meds = vec![
            med(
                "A",
                vec![
                    log(DoseStatus::Taken, 2025, 3, 10, 8),
                    log(DoseStatus::Missed, 2025, 3, 10, 16),
                    log(DoseStatus::Taken, 2025, 3, 11, 8),
                ],
            ),
            med("B", vec![log(DoseStatus::Taken, 2025, 3, 10, 9)]),
        ];

        let stats = adherence_stats(&meds);
        assert_eq!(stats.dates, vec!["2025-03-10", "2025-03-11"]);
        assert_eq!(stats.taken, vec![2, 1]);
        assert_eq!(stats.missed, vec![1, 0]);
    }

    #[test]
    fn test_adherence_stats_encounter_order_not_sorted() {
        // A later date encountered first stays first
        let meds = vec![med(
            "A",
            vec![
                log(DoseStatus::Taken, 2025, 3, 12, 8),
                log(DoseStatus::Taken, 2025, 3, 10, 8),
            ],
        )];
        let stats = adherence_stats(&meds);
        assert_eq!(stats.dates, vec!["2025-03-12", "2025-03-10"]);
    }

    #[test]
    fn test_due_soon_window_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        let at = |offset_min: i64| {
            let mut m = med("A", Vec::new());
            m.next_dose_time = Some(now + Duration::minutes(offset_min));
            vec![m]
        };

        // Past-due is excluded, exactly-now is excluded
        assert!(health_alerts(&at(-5), now).is_empty());
        assert!(health_alerts(&at(0), now).is_empty());
        // Within the hour, including the 60-minute edge
        assert_eq!(health_alerts(&at(30), now).len(), 1);
        assert_eq!(health_alerts(&at(60), now).len(), 1);
        // Beyond the hour
        assert!(health_alerts(&at(61), now).is_empty());
    }

    #[test]
    fn test_critical_warning_per_medication_threshold() {
        let now = Utc::now();
        let two_missed = vec![med(
            "A",
            vec![
                log(DoseStatus::Missed, 2025, 3, 10, 8),
                log(DoseStatus::Missed, 2025, 3, 11, 8),
            ],
        )];
        let alerts = health_alerts(&two_missed, now);
        assert!(!alerts.iter().any(|a| a.contains("Critical")));

        let three_missed = vec![med(
            "A",
            vec![
                log(DoseStatus::Missed, 2025, 3, 10, 8),
                log(DoseStatus::Missed, 2025, 3, 11, 8),
                log(DoseStatus::Missed, 2025, 3, 12, 8),
            ],
        )];
        let alerts = health_alerts(&three_missed, now);
        assert!(alerts.iter().any(|a| a.contains("Critical")));
        // The critical warning is a fixed string without the count
        assert!(!alerts.iter().any(|a| a.contains("3 ")));
    }

    #[test]
    fn test_contact_doctor_total_threshold() {
        let now = Utc::now();
        // 2 + 3 missed across two medications = 5 total
        let meds = vec![
            med(
                "A",
                vec![
                    log(DoseStatus::Missed, 2025, 3, 10, 8),
                    log(DoseStatus::Missed, 2025, 3, 11, 8),
                ],
            ),
            med(
                "B",
                vec![
                    log(DoseStatus::Missed, 2025, 3, 10, 9),
                    log(DoseStatus::Missed, 2025, 3, 11, 9),
                    log(DoseStatus::Missed, 2025, 3, 12, 9),
                ],
            ),
        ];
        let alerts = health_alerts(&meds, now);
        assert!(alerts.iter().any(|a| a.contains("missed 5 doses")));

        // One fewer and the alert disappears
        let mut fewer = meds.clone();
        fewer[1].logs.pop();
        let alerts = health_alerts(&fewer, now);
        assert!(!alerts.iter().any(|a| a.contains("contact your doctor")));
    }

    #[test]
    fn test_alert_order_fixed() {
        let now = Utc.with_ymd_and_hms(2025, 3, 13, 12, 0, 0).unwrap();
        let mut m = med(
            "A",
            vec![
                log(DoseStatus::Missed, 2025, 3, 10, 8),
                log(DoseStatus::Missed, 2025, 3, 11, 8),
                log(DoseStatus::Missed, 2025, 3, 12, 8),
                log(DoseStatus::Missed, 2025, 3, 12, 20),
                log(DoseStatus::Missed, 2025, 3, 13, 8),
            ],
        );
        m.next_dose_time = Some(now + Duration::minutes(15));

        let alerts = health_alerts(&[m], now);
        assert_eq!(alerts.len(), 4);
        assert!(alerts[0].contains("due within the next hour"));
        assert!(alerts[1].contains("missed doses"));
        assert!(alerts[2].contains("Critical"));
        assert!(alerts[3].contains("contact your doctor"));
    }

    #[test]
    fn test_latest_change_time_ignores_missing() {
        let t1 = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 3, 12, 0, 0, 0).unwrap();

        let appt = Appointment {
            doctor_email: "d".into(),
            patient_email: "p".into(),
            date: t1,
            reason: String::new(),
            status: AppointmentStatus::Scheduled,
            updated_at: t2,
        };

        let record = MedicalRecord::new("p");
        assert_eq!(latest_change_time(Some(&record), &[appt.clone()]), Some(t2));
        assert_eq!(latest_change_time(None, &[]), None);

        let mut stamped = MedicalRecord::new("p");
        stamped.updated_at = Some(t2 + Duration::days(1));
        assert_eq!(
            latest_change_time(Some(&stamped), &[appt]),
            Some(t2 + Duration::days(1))
        );
    }

    #[test]
    fn test_appointment_selection() {
        let day = |d: u32| Utc.with_ymd_and_hms(2025, 3, d, 10, 0, 0).unwrap();
        let mk = |d: u32, status: AppointmentStatus| Appointment {
            doctor_email: "d".into(),
            patient_email: "p".into(),
            date: day(d),
            reason: String::new(),
            status,
            updated_at: day(d),
        };

        let appts = vec![
            mk(1, AppointmentStatus::Completed),
            mk(5, AppointmentStatus::Completed),
            mk(3, AppointmentStatus::Completed),
            mk(2, AppointmentStatus::Completed),
            mk(20, AppointmentStatus::Scheduled),
            mk(15, AppointmentStatus::Scheduled),
            mk(25, AppointmentStatus::Scheduled),
            mk(18, AppointmentStatus::Scheduled),
        ];

        let recent = recent_completed(&appts);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].date, day(5));
        assert_eq!(recent[2].date, day(2));

        let upcoming = upcoming_scheduled(&appts);
        assert_eq!(upcoming.len(), 3);
        assert_eq!(upcoming[0].date, day(15));
        assert_eq!(upcoming[2].date, day(20));
    }

    #[test]
    fn test_series_tail() {
        let series: Vec<SeriesEntry> = (0..30)
            .map(|i| SeriesEntry {
                time: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
                    + Duration::hours(i),
                value: json!(i),
            })
            .collect();

        let tail = series_tail(&series, 20);
        assert_eq!(tail.len(), 20);
        assert_eq!(tail[0].value, json!(10));
        assert_eq!(tail[19].value, json!(29));

        assert_eq!(series_tail(&series[..3], 7).len(), 3);
    }
}
