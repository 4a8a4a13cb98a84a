pub mod dashboard;
pub mod error;
pub mod medication;
pub mod record;
pub mod schedule;
pub mod types;

pub use error::{PulseError, Result};
pub use record::{
    DoseLog, DoseStatus, HealthSeries, MedicalRecord, MedicationEntry, SeriesEntry,
};
pub use schedule::{next_dose, Frequency};
pub use types::{Appointment, AppointmentStatus, Role, User};
