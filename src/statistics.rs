//! Usage statistics over a user's appointment history.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{Appointment, Doctor, EntityId};

pub const FAVORITE_DOCTORS_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorVisits {
    pub doctor_id: EntityId,
    pub name: String,
    pub specialization: String,
    pub visits: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStatistics {
    pub total_appointments: usize,
    /// At most three doctors, most visited first
    pub favorite_doctors: Vec<DoctorVisits>,
    /// Visits per specialization in first-seen order
    pub by_specialization: Vec<(String, usize)>,
    /// Visits per calendar month keyed `YYYY-MM`
    pub by_month: BTreeMap<String, usize>,
}

/// Parse the datetime format used by the clinic API.
///
/// Accepts RFC 3339 with an offset as well as naive `YYYY-MM-DDTHH:MM[:SS[.f]]`
/// and the space-separated variant.
pub fn parse_appointment_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Aggregate `appointments` using `doctors` (keyed by id) for attribution.
///
/// Every appointment counts towards the total. Appointments without a
/// parseable datetime are left out of the monthly breakdown; those whose
/// doctor is unknown are left out of the doctor and specialization breakdowns.
pub fn aggregate(appointments: &[Appointment], doctors: &HashMap<EntityId, Doctor>) -> UserStatistics {
    let mut per_doctor: Vec<DoctorVisits> = Vec::new();
    let mut per_specialization: Vec<(String, usize)> = Vec::new();
    let mut by_month = BTreeMap::new();

    for appointment in appointments {
        if let Some(when) = appointment.datetime.as_deref().and_then(parse_appointment_datetime) {
            *by_month.entry(when.format("%Y-%m").to_string()).or_insert(0) += 1;
        }

        let Some(doctor) = appointment.doctor_id.as_ref().and_then(|id| doctors.get(id)) else {
            continue;
        };

        match per_doctor.iter_mut().find(|d| d.doctor_id == doctor.id) {
            Some(entry) => entry.visits += 1,
            None => per_doctor.push(DoctorVisits {
                doctor_id: doctor.id.clone(),
                name: doctor.display_name(),
                specialization: doctor.specialization.clone(),
                visits: 1,
            }),
        }

        match per_specialization.iter_mut().find(|(s, _)| *s == doctor.specialization) {
            Some((_, count)) => *count += 1,
            None => per_specialization.push((doctor.specialization.clone(), 1)),
        }
    }

    // Stable: equal counts keep first-seen order
    per_doctor.sort_by(|a, b| b.visits.cmp(&a.visits));
    per_doctor.truncate(FAVORITE_DOCTORS_LIMIT);

    UserStatistics {
        total_appointments: appointments.len(),
        favorite_doctors: per_doctor,
        by_specialization: per_specialization,
        by_month,
    }
}
