use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::{
    api::{ConsultationRow, MedicationRow, PetRef, VaccinationRow, WeightRecordRow},
    utils::time::parse_calendar_date,
};

pub const MAX_ACTIVITY_ENTRIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityKind {
    Consultation,
    Medication,
    Vaccine,
    Weight,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Consultation => "consulta",
            ActivityKind::Medication => "medicamento",
            ActivityKind::Vaccine => "vacina",
            ActivityKind::Weight => "peso",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub description: String,
    pub pet_name: String,
    pub tutor_name: Option<String>,
    pub date: NaiveDate,
}

/// Rows already fetched for the feed, newest first per source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySources {
    pub consultations: Vec<ConsultationRow>,
    pub medications: Vec<MedicationRow>,
    pub vaccinations: Vec<VaccinationRow>,
    pub weights: Vec<WeightRecordRow>,
}

struct Normalizer {
    today: NaiveDate,
    tz: Tz,
    with_tutor: bool,
}

impl Normalizer {
    fn entry(
        &self,
        kind: ActivityKind,
        id: &str,
        raw_date: &str,
        description: String,
        pets: &Option<PetRef>,
    ) -> Option<ActivityEntry> {
        let Some(date) = parse_calendar_date(raw_date, self.tz) else {
            log::debug!("Skipping {} {} with unparseable date {:?}", kind.as_str(), id, raw_date);
            return None;
        };
        if date > self.today {
            return None;
        }
        Some(ActivityEntry {
            id: format!("{}-{}", kind.as_str(), id),
            kind,
            description,
            pet_name: PetRef::pet_name(pets),
            tutor_name: if self.with_tutor {
                PetRef::tutor_name(pets)
            } else {
                None
            },
            date,
        })
    }
}

fn format_weight(weight: f64) -> String {
    let text = format!("{:.2}", weight);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Normalizes every source, newest first, capped at [`MAX_ACTIVITY_ENTRIES`].
/// Entries dated after `today` have not happened yet and are left out.
/// Tutor names are only carried for the vet view.
pub fn build_activity_feed(
    sources: &ActivitySources,
    today: NaiveDate,
    tz: Tz,
    with_tutor: bool,
) -> Vec<ActivityEntry> {
    let n = Normalizer { today, tz, with_tutor };
    let per_source = MAX_ACTIVITY_ENTRIES;

    let consultations = sources.consultations.iter().take(per_source).filter_map(|row| {
        let subject = row
            .consultation_type
            .as_deref()
            .or(row.reason.as_deref())
            .unwrap_or_default();
        n.entry(
            ActivityKind::Consultation,
            &row.id,
            &row.consultation_date,
            format!("Consulta: {}", subject),
            &row.pets,
        )
    });
    let medications = sources.medications.iter().take(per_source).filter_map(|row| {
        n.entry(
            ActivityKind::Medication,
            &row.id,
            &row.start_date,
            format!("Medicamento: {}", row.medication_name),
            &row.pets,
        )
    });
    let vaccinations = sources.vaccinations.iter().take(per_source).filter_map(|row| {
        n.entry(
            ActivityKind::Vaccine,
            &row.id,
            row.application_date.as_deref().unwrap_or_default(),
            format!("Vacina: {}", row.vaccine_name),
            &row.pets,
        )
    });
    let weights = sources.weights.iter().take(per_source).filter_map(|row| {
        n.entry(
            ActivityKind::Weight,
            &row.id,
            &row.record_date,
            format!("Peso registrado: {} kg", format_weight(row.weight)),
            &row.pets,
        )
    });

    let mut feed: Vec<ActivityEntry> = consultations
        .chain(medications)
        .chain(vaccinations)
        .chain(weights)
        .collect();
    feed.sort_by(|a, b| b.date.cmp(&a.date));
    feed.truncate(MAX_ACTIVITY_ENTRIES);
    feed
}
