use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment status of one companion, as recorded in the contributions database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionRecord {
    pub companion_id: String,
    pub lifetime: bool,
    /// One flag per `YYYY-MM` column.
    pub periods: BTreeMap<String, bool>,
}

/// A token scrubbed from public keyword text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannedKeyword {
    pub token: String,
}

/// Categorical multi-value attributes, already reduced to their labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub services: Vec<String>,
    pub race: Vec<String>,
    pub gender: Vec<String>,
    pub caters_to: Vec<String>,
    pub age: Vec<String>,
    pub body_type: Vec<String>,
    pub height: Vec<String>,
    pub tattoos: Vec<String>,
    pub body_hair: Vec<String>,
    pub location: Vec<String>,
}

/// A companion profile as stored upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionRecord {
    pub id: String,
    pub name: String,
    pub website: Option<String>,
    pub image_urls: Vec<String>,
    pub attributes: Attributes,
    /// Plain text of the first tagline segment, if any.
    pub tagline: Option<String>,
    /// Plain text of the first keywords segment, if any. Not yet lowercased.
    pub keywords: Option<String>,
    pub retirement: Option<DateTime<Utc>>,
}

impl CompanionRecord {
    /// Source image for the published picture: the first attached file.
    pub fn primary_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

/// Public projection written to `companions.json`. Field order is the feed's
/// on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedCompanion {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub services: Vec<String>,
    pub race: Vec<String>,
    pub gender: Vec<String>,
    pub catersto: Vec<String>,
    pub age: Vec<String>,
    pub body_type: Vec<String>,
    pub height: Vec<String>,
    pub tattoos: Vec<String>,
    pub body_hair: Vec<String>,
    pub tagline: Option<String>,
    pub keywords: Option<String>,
    pub location: Vec<String>,
}

/// The whole published feed, in upstream order.
pub type Roster = Vec<PublishedCompanion>;
