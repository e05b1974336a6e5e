use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::{
    api::{
        query_as, ApiError, ConsultationRow, MedicationRow, Query, RecordStore, VaccinationRow,
        WeightRecordRow,
    },
    pages::dashboard::{
        activity::{build_activity_feed, ActivityEntry, ActivitySources, MAX_ACTIVITY_ENTRIES},
        reminders::{build_reminders, Reminder},
    },
    utils::timer::with_timeout,
};

pub const VACCINATIONS: &str = "vaccinations";
pub const CONSULTATIONS: &str = "consultations";
pub const MEDICATIONS: &str = "medications";
pub const WEIGHT_RECORDS: &str = "weight_records";

/// Whose records the dashboard shows. Vet rows are scoped by the backend's access rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Tutor { tutor_id: String },
    Vet,
}

impl Subject {
    fn scoped(&self, query: Query) -> Query {
        match self {
            Subject::Tutor { tutor_id } => query
                .select("*, pets!inner(name, tutor_id)")
                .eq("pets.tutor_id", tutor_id),
            Subject::Vet => query.select("*, pets!inner(name, tutor:profiles(full_name))"),
        }
    }

    fn is_vet(&self) -> bool {
        matches!(self, Subject::Vet)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{collection} unavailable: {error}")]
pub struct AggregationSourceError {
    pub collection: &'static str,
    pub error: ApiError,
}

/// Whatever could be built, plus the sources that failed to load.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated<T> {
    pub items: Vec<T>,
    pub failures: Vec<AggregationSourceError>,
}

impl<T> Aggregated<T> {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

async fn fetch_source<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: &'static str,
    query: Query,
    timeout: Duration,
) -> Result<Vec<T>, AggregationSourceError> {
    let result = match with_timeout(timeout, query_as::<T>(store, collection, &query)).await {
        Ok(result) => result,
        Err(elapsed) => Err(ApiError::timeout(elapsed.to_string())),
    };
    result.map_err(|error| {
        log::warn!("Dashboard source {} failed [{}]: {}", collection, error.code, error);
        AggregationSourceError { collection, error }
    })
}

fn collect<T>(
    result: Result<Vec<T>, AggregationSourceError>,
    failures: &mut Vec<AggregationSourceError>,
) -> Vec<T> {
    result.unwrap_or_else(|failure| {
        failures.push(failure);
        Vec::new()
    })
}

pub async fn fetch_reminders(
    store: &dyn RecordStore,
    subject: &Subject,
    today: NaiveDate,
    tz: Tz,
    timeout: Duration,
) -> Aggregated<Reminder> {
    let vaccinations = subject.scoped(
        Query::new()
            .not_null("next_dose_date")
            .order_by("next_dose_date", true),
    );
    let consultations = subject.scoped(
        Query::new()
            .gte("consultation_date", today.format("%Y-%m-%d"))
            .order_by("consultation_date", true),
    );
    let (vaccinations, consultations) = futures::join!(
        fetch_source::<VaccinationRow>(store, VACCINATIONS, vaccinations, timeout),
        fetch_source::<ConsultationRow>(store, CONSULTATIONS, consultations, timeout)
    );

    let mut failures = Vec::new();
    let vaccinations = collect(vaccinations, &mut failures);
    let consultations = collect(consultations, &mut failures);
    Aggregated {
        items: build_reminders(&vaccinations, &consultations, today, tz),
        failures,
    }
}

pub async fn fetch_recent_activity(
    store: &dyn RecordStore,
    subject: &Subject,
    today: NaiveDate,
    tz: Tz,
    timeout: Duration,
) -> Aggregated<ActivityEntry> {
    let until = today.format("%Y-%m-%d").to_string();
    let recent = |column: &str| {
        subject.scoped(
            Query::new()
                .lte(column, &until)
                .order_by(column, false)
                .limit(MAX_ACTIVITY_ENTRIES),
        )
    };
    let (consultations, medications, vaccinations, weights) = futures::join!(
        fetch_source::<ConsultationRow>(store, CONSULTATIONS, recent("consultation_date"), timeout),
        fetch_source::<MedicationRow>(store, MEDICATIONS, recent("start_date"), timeout),
        fetch_source::<VaccinationRow>(
            store,
            VACCINATIONS,
            recent("application_date").not_null("application_date"),
            timeout
        ),
        fetch_source::<WeightRecordRow>(store, WEIGHT_RECORDS, recent("record_date"), timeout)
    );

    let mut failures = Vec::new();
    let sources = ActivitySources {
        consultations: collect(consultations, &mut failures),
        medications: collect(medications, &mut failures),
        vaccinations: collect(vaccinations, &mut failures),
        weights: collect(weights, &mut failures),
    };
    Aggregated {
        items: build_activity_feed(&sources, today, tz, subject.is_vet()),
        failures,
    }
}
