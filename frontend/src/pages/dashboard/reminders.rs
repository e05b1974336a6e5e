//! Upcoming-care reminders derived from vaccination and consultation rows.
//!
//! Vaccines surface when overdue or due within [`VACCINE_WINDOW_DAYS`]. Consultations surface
//! only from today up to [`CONSULTATION_WINDOW_DAYS`] ahead; a past scheduled consultation
//! belongs to the activity history and never becomes an overdue reminder.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    api::{ConsultationRow, ConsultationStatus, PetRef, VaccinationRow},
    utils::time::{days_between, parse_calendar_date},
};

pub const VACCINE_WINDOW_DAYS: i64 = 30;
pub const CONSULTATION_WINDOW_DAYS: i64 = 7;
pub const MAX_REMINDERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReminderStatus {
    Overdue,
    DueToday,
    Upcoming,
}

impl ReminderStatus {
    pub fn from_days(days_until: i64) -> Self {
        match days_until {
            d if d < 0 => ReminderStatus::Overdue,
            0 => ReminderStatus::DueToday,
            _ => ReminderStatus::Upcoming,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReminderStatus::Overdue => "Atrasado",
            ReminderStatus::DueToday => "Hoje",
            ReminderStatus::Upcoming => "Próximo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReminderSource {
    Vaccine,
    Consultation,
    Other,
}

impl ReminderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderSource::Vaccine => "vaccine",
            ReminderSource::Consultation => "consultation",
            ReminderSource::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub pet_name: String,
    pub date: NaiveDate,
    pub source: ReminderSource,
    pub status: ReminderStatus,
    pub days_until: i64,
}

fn due_date(raw: &str, tz: Tz, row_id: &str) -> Option<NaiveDate> {
    let date = parse_calendar_date(raw, tz);
    if date.is_none() {
        log::debug!("Skipping row {} with unparseable date {:?}", row_id, raw);
    }
    date
}

fn vaccine_reminder(row: &VaccinationRow, today: NaiveDate, tz: Tz) -> Option<Reminder> {
    let date = due_date(row.next_dose_date.as_deref()?, tz, &row.id)?;
    let days_until = days_between(date, today);
    if days_until > VACCINE_WINDOW_DAYS {
        return None;
    }
    Some(Reminder {
        id: format!("{}-{}", ReminderSource::Vaccine.as_str(), row.id),
        title: format!("Vacina: {}", row.vaccine_name),
        subtitle: "Próxima dose".into(),
        pet_name: PetRef::pet_name(&row.pets),
        date,
        source: ReminderSource::Vaccine,
        status: ReminderStatus::from_days(days_until),
        days_until,
    })
}

fn consultation_reminder(row: &ConsultationRow, today: NaiveDate, tz: Tz) -> Option<Reminder> {
    if row.status != ConsultationStatus::Scheduled {
        return None;
    }
    let date = due_date(&row.consultation_date, tz, &row.id)?;
    let days_until = days_between(date, today);
    if !(0..=CONSULTATION_WINDOW_DAYS).contains(&days_until) {
        return None;
    }
    let kind = row.consultation_type.as_deref().unwrap_or("Consulta");
    let subtitle = row
        .reason
        .clone()
        .or_else(|| row.veterinarian.as_ref().map(|vet| format!("com {}", vet)))
        .unwrap_or_default();
    Some(Reminder {
        id: format!("{}-{}", ReminderSource::Consultation.as_str(), row.id),
        title: format!("Consulta: {}", kind),
        subtitle,
        pet_name: PetRef::pet_name(&row.pets),
        date,
        source: ReminderSource::Consultation,
        status: ReminderStatus::from_days(days_until),
        days_until,
    })
}

/// Merges both sources, oldest trigger date first, capped at [`MAX_REMINDERS`].
/// Ties keep vaccines ahead of consultations and otherwise preserve row order.
pub fn build_reminders(
    vaccinations: &[VaccinationRow],
    consultations: &[ConsultationRow],
    today: NaiveDate,
    tz: Tz,
) -> Vec<Reminder> {
    let mut reminders: Vec<Reminder> = vaccinations
        .iter()
        .filter_map(|row| vaccine_reminder(row, today, tz))
        .chain(
            consultations
                .iter()
                .filter_map(|row| consultation_reminder(row, today, tz)),
        )
        .collect();
    reminders.sort_by_key(|r| r.date);
    reminders.truncate(MAX_REMINDERS);
    reminders
}
