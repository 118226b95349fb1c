//! Conversion of raw Notion pages into domain records.
//!
//! Every accessor fails with `SyncError::Schema` naming the page and property,
//! so an upstream schema change surfaces as a readable error instead of a
//! silently empty roster.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use notion_client::{Page, PropertyValue};
use tracing::warn;

use crate::error::{Result, SyncError};
use crate::types::{Attributes, BannedKeyword, CompanionRecord, ContributionRecord};

pub const LIFETIME: &str = "Lifetime";
pub const CONTRIBUTION_COMPANION: &str = "💋 Companion";
pub const KEYWORD_NAME: &str = "Name";

pub const NAME: &str = "Name";
pub const WEBSITE: &str = "Website";
pub const PICTURE: &str = "Picture";
pub const SERVICES: &str = "Services";
pub const RACE: &str = "Race";
pub const GENDER: &str = "Gender";
pub const CATERS_TO: &str = "Caters to";
pub const AGE: &str = "Age";
pub const BODY_TYPE: &str = "Body type";
pub const HEIGHT: &str = "Height";
pub const TATTOOS: &str = "Tattoos & mods";
pub const BODY_HAIR: &str = "Body hair";
pub const LOCATION: &str = "Location";
pub const TAGLINE: &str = "Tagline";
pub const KEYWORDS: &str = "Keywords";
pub const RETIREMENT: &str = "Retirement";

/// Contribution rows without a linked companion are skipped.
pub fn contributions_from_pages(pages: &[Page]) -> Result<Vec<ContributionRecord>> {
    let mut records = Vec::with_capacity(pages.len());
    for page in pages {
        let Some(companion_id) = first_relation(page, CONTRIBUTION_COMPANION)? else {
            warn!(page_id = page.id.as_str(), "Contribution has no linked companion, skipping");
            continue;
        };

        let periods: BTreeMap<String, bool> = page
            .properties
            .iter()
            .filter(|(name, _)| name.as_str() != LIFETIME)
            .filter_map(|(name, value)| match value {
                PropertyValue::Checkbox { checkbox } => Some((name.clone(), *checkbox)),
                _ => None,
            })
            .collect();

        records.push(ContributionRecord {
            companion_id,
            lifetime: checkbox(page, LIFETIME)?,
            periods,
        });
    }
    Ok(records)
}

/// Banned keywords in database order. Rows with an empty title are skipped.
pub fn banned_keywords_from_pages(pages: &[Page]) -> Result<Vec<BannedKeyword>> {
    let mut keywords = Vec::with_capacity(pages.len());
    for page in pages {
        match first_text(page, KEYWORD_NAME)? {
            Some(token) if !token.is_empty() => keywords.push(BannedKeyword { token }),
            _ => warn!(page_id = page.id.as_str(), "Banned keyword row has no text, skipping"),
        }
    }
    Ok(keywords)
}

pub fn companions_from_pages(pages: &[Page]) -> Result<Vec<CompanionRecord>> {
    pages.iter().map(companion_from_page).collect()
}

pub fn companion_from_page(page: &Page) -> Result<CompanionRecord> {
    Ok(CompanionRecord {
        id: page.id.clone(),
        name: first_text(page, NAME)?.unwrap_or_default(),
        website: url(page, WEBSITE)?,
        image_urls: files(page, PICTURE)?,
        attributes: Attributes {
            services: labels(page, SERVICES)?,
            race: labels(page, RACE)?,
            gender: labels(page, GENDER)?,
            caters_to: labels(page, CATERS_TO)?,
            age: labels(page, AGE)?,
            body_type: labels(page, BODY_TYPE)?,
            height: labels(page, HEIGHT)?,
            tattoos: labels(page, TATTOOS)?,
            body_hair: labels(page, BODY_HAIR)?,
            location: labels(page, LOCATION)?,
        },
        tagline: first_text(page, TAGLINE)?,
        keywords: first_text(page, KEYWORDS)?,
        retirement: date(page, RETIREMENT)?,
    })
}

// --- property accessors ---

fn property<'a>(page: &'a Page, name: &str) -> Result<&'a PropertyValue> {
    page.property(name).ok_or_else(|| {
        SyncError::Schema(format!("page {}: property '{name}' is missing", page.id))
    })
}

fn wrong_type(page: &Page, name: &str, value: &PropertyValue, expected: &str) -> SyncError {
    SyncError::Schema(format!(
        "page {}: property '{name}' is {}, expected {expected}",
        page.id,
        value.kind()
    ))
}

fn checkbox(page: &Page, name: &str) -> Result<bool> {
    match property(page, name)? {
        PropertyValue::Checkbox { checkbox } => Ok(*checkbox),
        other => Err(wrong_type(page, name, other, "checkbox")),
    }
}

/// Plain text of the first segment of a title or rich-text property.
fn first_text(page: &Page, name: &str) -> Result<Option<String>> {
    let segments = match property(page, name)? {
        PropertyValue::Title { title } => title,
        PropertyValue::RichText { rich_text } => rich_text,
        other => return Err(wrong_type(page, name, other, "title or rich_text")),
    };
    Ok(segments.first().map(|s| s.plain_text.clone()))
}

fn labels(page: &Page, name: &str) -> Result<Vec<String>> {
    match property(page, name)? {
        PropertyValue::MultiSelect { multi_select } => {
            Ok(multi_select.iter().map(|o| o.name.clone()).collect())
        }
        other => Err(wrong_type(page, name, other, "multi_select")),
    }
}

fn files(page: &Page, name: &str) -> Result<Vec<String>> {
    match property(page, name)? {
        PropertyValue::Files { files } => Ok(files.iter().map(|f| f.url().to_string()).collect()),
        other => Err(wrong_type(page, name, other, "files")),
    }
}

fn url(page: &Page, name: &str) -> Result<Option<String>> {
    match property(page, name)? {
        PropertyValue::Url { url } => Ok(url.clone()),
        other => Err(wrong_type(page, name, other, "url")),
    }
}

fn first_relation(page: &Page, name: &str) -> Result<Option<String>> {
    match property(page, name)? {
        PropertyValue::Relation { relation } => Ok(relation.first().map(|r| r.id.clone())),
        other => Err(wrong_type(page, name, other, "relation")),
    }
}

fn date(page: &Page, name: &str) -> Result<Option<DateTime<Utc>>> {
    match property(page, name)? {
        PropertyValue::Date { date: None } => Ok(None),
        PropertyValue::Date { date: Some(value) } => parse_date(&value.start)
            .map(Some)
            .ok_or_else(|| {
                SyncError::Schema(format!(
                    "page {}: property '{name}' has unparseable date '{}'",
                    page.id, value.start
                ))
            }),
        other => Err(wrong_type(page, name, other, "date")),
    }
}

/// Notion dates are either `YYYY-MM-DD` or a full RFC 3339 timestamp.
/// Bare dates resolve to midnight UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
}
