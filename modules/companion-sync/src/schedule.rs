use std::future::Future;

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use tracing::info;

/// Fires at minute 0 of every hour divisible by `every_hours` (UTC),
/// i.e. cron `0 */N * * *`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    every_hours: u32,
}

impl Schedule {
    /// `every_hours` must divide 24 so the cadence is the same every day.
    pub fn every_hours(every_hours: u32) -> Self {
        Self {
            every_hours: every_hours.clamp(1, 24),
        }
    }

    /// First trigger strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour_start = now
            .date_naive()
            .and_hms_opt(now.hour(), 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(now);

        let mut next = hour_start + Duration::hours(1);
        while next.hour() % self.every_hours != 0 {
            next += Duration::hours(1);
        }
        next
    }

    /// Sleep until each trigger and run `job`, forever. Errors are the job's
    /// concern; the loop never exits on its own.
    pub async fn run_forever<F, Fut>(&self, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let now = Utc::now();
            let next = self.next_after(now);
            info!(next_run = %next, "Waiting for scheduled run");

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            job().await;
        }
    }
}
