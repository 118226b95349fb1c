use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{CompanionRecord, PublishedCompanion, Roster};

/// Whether a companion belongs in this run's roster: eligible this period,
/// has a picture, and is not retired as of `now`.
pub fn is_publishable(record: &CompanionRecord, eligible: &HashSet<String>, now: DateTime<Utc>) -> bool {
    eligible.contains(&record.id)
        && record.primary_image().is_some()
        && record.retirement.map_or(true, |retired_at| retired_at > now)
}

/// Public shape of a companion. Empty tagline/keywords become `None`.
pub fn project(record: &CompanionRecord) -> PublishedCompanion {
    let attrs = &record.attributes;
    PublishedCompanion {
        id: record.id.clone(),
        name: record.name.clone(),
        url: record.website.clone(),
        services: attrs.services.clone(),
        race: attrs.race.clone(),
        gender: attrs.gender.clone(),
        catersto: attrs.caters_to.clone(),
        age: attrs.age.clone(),
        body_type: attrs.body_type.clone(),
        height: attrs.height.clone(),
        tattoos: attrs.tattoos.clone(),
        body_hair: attrs.body_hair.clone(),
        tagline: record.tagline.clone().filter(|t| !t.is_empty()),
        keywords: record
            .keywords
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase),
        location: attrs.location.clone(),
    }
}

/// Project every publishable record, keeping upstream order.
pub fn project_roster(
    records: &[CompanionRecord],
    eligible: &HashSet<String>,
    now: DateTime<Utc>,
) -> Roster {
    records
        .iter()
        .filter(|r| is_publishable(r, eligible, now))
        .map(project)
        .collect()
}
