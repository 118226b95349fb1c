pub mod config;
pub mod eligibility;
pub mod error;
pub mod images;
pub mod pipeline;
pub mod projector;
pub mod publisher;
pub mod records;
pub mod sanitizer;
pub mod schedule;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod types;

pub use config::{Config, DatabaseIds};
pub use error::{Result, SyncError};
pub use pipeline::{RunOptions, SyncPipeline, SyncStats};
pub use schedule::Schedule;
pub use types::{
    Attributes, BannedKeyword, CompanionRecord, ContributionRecord, PublishedCompanion, Roster,
};
