use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::date_util::{last_day_of_month, month_start, week_monday};
use crate::error::{Error, Result};
use crate::filter::ItemFilter;
use crate::model::WorkItem;
use crate::period::Period;

/// Bucket size for time-series output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// Auto-select a granularity from a period's inclusive day count:
    /// up to 31 days daily, up to 365 days weekly, monthly beyond that.
    pub fn for_period_days(days: i64) -> Self {
        if days <= 31 {
            Granularity::Daily
        } else if days <= 365 {
            Granularity::Weekly
        } else {
            Granularity::Monthly
        }
    }

    /// Canonical key of the bucket containing a date: the date itself,
    /// the Monday of its ISO week, or its `YYYY-MM` month.
    pub fn key_for(&self, d: NaiveDate) -> String {
        match self {
            Granularity::Daily => d.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => week_monday(d).format("%Y-%m-%d").to_string(),
            Granularity::Monthly => d.format("%Y-%m").to_string(),
        }
    }
}

/// Which instant attributes an item to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketAttribution {
    Created,
    Completed,
}

/// Creation and completion counts per bucket, as parallel arrays.
///
/// Every bucket key in the period's range is present, zero-seeded, so the
/// series never has gaps. A single item can contribute to one bucket in each
/// series independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub granularity: Granularity,
    pub bucket_keys: Vec<String>,
    pub new_counts: Vec<u64>,
    pub completed_counts: Vec<u64>,
}

/// Partition a period into buckets and count creations/completions per bucket.
///
/// `granularity` overrides the auto-selection when given.
pub fn bucketize(
    items: &[WorkItem],
    period: &Period,
    granularity: Option<Granularity>,
    filter: &ItemFilter,
) -> TimeSeries {
    let granularity = granularity.unwrap_or_else(|| Granularity::for_period_days(period.days()));

    let bucket_keys = seed_keys(period, granularity);
    let index: HashMap<&str, usize> = bucket_keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i))
        .collect();

    let mut new_counts = vec![0u64; bucket_keys.len()];
    let mut completed_counts = vec![0u64; bucket_keys.len()];

    for item in items.iter().filter(|i| filter.retains(i)) {
        if let Some(created) = item.creation_instant() {
            let d = created.date_naive();
            if period.contains_date(d) {
                if let Some(&i) = index.get(granularity.key_for(d).as_str()) {
                    new_counts[i] += 1;
                }
            }
        }
        if let Some(completed) = item.completion_instant() {
            let d = completed.date_naive();
            if period.contains_date(d) {
                if let Some(&i) = index.get(granularity.key_for(d).as_str()) {
                    completed_counts[i] += 1;
                }
            }
        }
    }

    TimeSeries {
        granularity,
        bucket_keys,
        new_counts,
        completed_counts,
    }
}

/// All bucket keys covering the period, in order, before any counting.
fn seed_keys(period: &Period, granularity: Granularity) -> Vec<String> {
    let mut keys = Vec::new();
    match granularity {
        Granularity::Daily => {
            let mut d = period.start;
            while d <= period.end {
                keys.push(granularity.key_for(d));
                d += Duration::days(1);
            }
        }
        Granularity::Weekly => {
            let mut monday = week_monday(period.start);
            while monday <= period.end {
                keys.push(granularity.key_for(monday));
                monday += Duration::days(7);
            }
        }
        Granularity::Monthly => {
            let mut first = month_start(period.start);
            while first <= period.end {
                keys.push(granularity.key_for(first));
                first = last_day_of_month(first.year(), first.month()) + Duration::days(1);
            }
        }
    }
    keys
}

/// Recover the inclusive date range a bucket key covers.
pub fn bucket_range(key: &str, granularity: Granularity) -> Result<(NaiveDate, NaiveDate)> {
    match granularity {
        Granularity::Daily => {
            let d = NaiveDate::parse_from_str(key, "%Y-%m-%d")
                .map_err(|_| Error::BucketParse(key.to_string()))?;
            Ok((d, d))
        }
        Granularity::Weekly => {
            let d = NaiveDate::parse_from_str(key, "%Y-%m-%d")
                .map_err(|_| Error::BucketParse(key.to_string()))?;
            let monday = week_monday(d);
            Ok((monday, monday + Duration::days(6)))
        }
        Granularity::Monthly => {
            let (year, month) = key
                .split_once('-')
                .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
                .filter(|(_, m)| (1..=12).contains(m))
                .ok_or_else(|| Error::BucketParse(key.to_string()))?;
            Ok((
                NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or_else(|| Error::BucketParse(key.to_string()))?,
                last_day_of_month(year, month),
            ))
        }
    }
}

/// Drill-down: the retained items whose attribution instant falls inside a
/// bucket.
pub fn items_in_bucket<'a>(
    items: &'a [WorkItem],
    key: &str,
    granularity: Granularity,
    attribution: BucketAttribution,
    filter: &ItemFilter,
) -> Result<Vec<&'a WorkItem>> {
    let (start, end) = bucket_range(key, granularity)?;
    Ok(items
        .iter()
        .filter(|i| filter.retains(i))
        .filter(|i| {
            let instant = match attribution {
                BucketAttribution::Created => i.creation_instant(),
                BucketAttribution::Completed => i.completion_instant(),
            };
            match instant {
                Some(at) => {
                    let d = at.date_naive();
                    d >= start && d <= end
                }
                None => false,
            }
        })
        .collect())
}
