use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::date_util::{last_day_of_month, month_start, quarter_of, week_monday};
use crate::error::{Error, Result};

static RE_LAST_DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^last-(\d{1,4})-days$").unwrap());
static RE_CUSTOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})\.\.(\d{4}-\d{2}-\d{2})$").unwrap());

/// Longest span accepted for a custom period.
pub const MAX_CUSTOM_SPAN_DAYS: i64 = 365;

/// A concrete analysis window: a closed `[start, end]` day range.
///
/// The end bound is inclusive and interpreted as end-of-day, so an instant
/// anywhere on the end date is inside the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Inclusive day count: `calculate_period_days(day1, day1) == 1`.
    pub fn days(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(1)
    }

    /// Whether an instant falls inside the window (end-of-day inclusive).
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.contains_date(instant.date_naive())
    }

    pub fn contains_date(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A period selector, resolved against an explicit reference date.
///
/// The reference date is always passed in by the caller; nothing in this
/// crate reads a clock, so resolution is reproducible in tests and caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSpec {
    Today,
    ThisWeek,
    ThisMonth,
    ThisQuarter,
    ThisYear,
    LastDays(u32),
    /// From the earliest resolvable item creation through the reference date.
    All,
    Custom {
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl PeriodSpec {
    /// Parse a period selector string.
    ///
    /// Supported formats:
    /// - `today`
    /// - `this-week` / `this-month` / `this-quarter` / `this-year`
    /// - `last-30-days` — rolling last N days
    /// - `all`
    /// - `2025-01-01..2025-03-31` — custom closed range
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        match s.to_lowercase().as_str() {
            "today" => return Ok(PeriodSpec::Today),
            "this-week" => return Ok(PeriodSpec::ThisWeek),
            "this-month" => return Ok(PeriodSpec::ThisMonth),
            "this-quarter" => return Ok(PeriodSpec::ThisQuarter),
            "this-year" => return Ok(PeriodSpec::ThisYear),
            "all" => return Ok(PeriodSpec::All),
            _ => {}
        }

        if let Some(caps) = RE_LAST_DAYS.captures(s) {
            let n: u32 = caps[1]
                .parse()
                .map_err(|_| Error::PeriodParse(format!("invalid day count: {s}")))?;
            return Ok(PeriodSpec::LastDays(n));
        }

        if let Some(caps) = RE_CUSTOM.captures(s) {
            let start = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
                .map_err(|_| Error::PeriodParse(format!("invalid start date: {s}")))?;
            let end = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d")
                .map_err(|_| Error::PeriodParse(format!("invalid end date: {s}")))?;
            return Ok(PeriodSpec::Custom { start, end });
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// Resolve into a concrete [`Period`].
    ///
    /// `earliest_created` anchors the `All` selector; it is the earliest
    /// resolvable creation date in the snapshot (the reference date is used
    /// when no item has one).
    ///
    /// Custom ranges are validated here: `start` must not exceed `end`, and
    /// the span must not exceed [`MAX_CUSTOM_SPAN_DAYS`]. Longer ranges are
    /// rejected rather than truncated.
    pub fn resolve(
        &self,
        reference: NaiveDate,
        earliest_created: Option<NaiveDate>,
    ) -> Result<Period> {
        match self {
            PeriodSpec::Today => Ok(Period::new(
                reference,
                reference,
                format!("Today ({reference})"),
            )),
            PeriodSpec::ThisWeek => {
                let start = week_monday(reference);
                let end = start + Duration::days(6);
                let iw = reference.iso_week();
                Ok(Period::new(
                    start,
                    end,
                    format!("Week {}-W{:02}", iw.year(), iw.week()),
                ))
            }
            PeriodSpec::ThisMonth => {
                let start = month_start(reference);
                let end = last_day_of_month(reference.year(), reference.month());
                Ok(Period::new(
                    start,
                    end,
                    format!("{}-{:02}", reference.year(), reference.month()),
                ))
            }
            PeriodSpec::ThisQuarter => {
                let q = quarter_of(reference);
                let start_month = (q as u32 - 1) * 3 + 1;
                let start = NaiveDate::from_ymd_opt(reference.year(), start_month, 1).unwrap();
                let end = last_day_of_month(reference.year(), start_month + 2);
                Ok(Period::new(
                    start,
                    end,
                    format!("{}-Q{}", reference.year(), q),
                ))
            }
            PeriodSpec::ThisYear => Ok(Period::new(
                NaiveDate::from_ymd_opt(reference.year(), 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(reference.year(), 12, 31).unwrap(),
                format!("{}", reference.year()),
            )),
            PeriodSpec::LastDays(n) => {
                if *n == 0 {
                    return Err(Error::InvalidPeriod(
                        "last-N-days requires N >= 1".to_string(),
                    ));
                }
                let start = reference - Duration::days(*n as i64 - 1);
                Ok(Period::new(start, reference, format!("Last {n} days")))
            }
            PeriodSpec::All => {
                let start = earliest_created.unwrap_or(reference).min(reference);
                Ok(Period::new(start, reference, "All time".to_string()))
            }
            PeriodSpec::Custom { start, end } => {
                if start > end {
                    return Err(Error::InvalidPeriod(format!(
                        "custom period start {start} is after end {end}"
                    )));
                }
                let span = (*end - *start).num_days() + 1;
                if span > MAX_CUSTOM_SPAN_DAYS {
                    return Err(Error::InvalidPeriod(format!(
                        "custom period spans {span} days, maximum is {MAX_CUSTOM_SPAN_DAYS}"
                    )));
                }
                Ok(Period::new(*start, *end, format!("{start}..{end}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(PeriodSpec::parse("today").unwrap(), PeriodSpec::Today);
        assert_eq!(PeriodSpec::parse("this-week").unwrap(), PeriodSpec::ThisWeek);
        assert_eq!(
            PeriodSpec::parse("This-Month").unwrap(),
            PeriodSpec::ThisMonth
        );
        assert_eq!(
            PeriodSpec::parse("this-quarter").unwrap(),
            PeriodSpec::ThisQuarter
        );
        assert_eq!(PeriodSpec::parse("this-year").unwrap(), PeriodSpec::ThisYear);
        assert_eq!(PeriodSpec::parse("all").unwrap(), PeriodSpec::All);
    }

    #[test]
    fn test_parse_last_days() {
        assert_eq!(
            PeriodSpec::parse("last-30-days").unwrap(),
            PeriodSpec::LastDays(30)
        );
        assert_eq!(
            PeriodSpec::parse("last-7-days").unwrap(),
            PeriodSpec::LastDays(7)
        );
    }

    #[test]
    fn test_parse_custom() {
        assert_eq!(
            PeriodSpec::parse("2025-01-01..2025-03-31").unwrap(),
            PeriodSpec::Custom {
                start: d(2025, 1, 1),
                end: d(2025, 3, 31),
            }
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PeriodSpec::parse("garbage").is_err());
        assert!(PeriodSpec::parse("last--days").is_err());
        assert!(PeriodSpec::parse("2025-01-01..").is_err());
    }

    #[test]
    fn test_days_inclusive() {
        let p = Period::new(d(2025, 1, 1), d(2025, 1, 1), "one day");
        assert_eq!(p.days(), 1);
        let p = Period::new(d(2025, 1, 1), d(2025, 1, 7), "one week");
        assert_eq!(p.days(), 7);
    }

    #[test]
    fn test_contains_end_of_day_inclusive() {
        let p = Period::new(d(2025, 1, 1), d(2025, 1, 5), "window");
        let late_on_end = d(2025, 1, 5).and_hms_opt(23, 59, 59).unwrap().and_utc();
        assert!(p.contains(late_on_end));
        let next_day = d(2025, 1, 6).and_hms_opt(0, 0, 0).unwrap().and_utc();
        assert!(!p.contains(next_day));
    }

    #[test]
    fn test_resolve_today() {
        let p = PeriodSpec::Today.resolve(d(2025, 8, 25), None).unwrap();
        assert_eq!(p.start, d(2025, 8, 25));
        assert_eq!(p.end, d(2025, 8, 25));
        assert_eq!(p.days(), 1);
    }

    #[test]
    fn test_resolve_this_week() {
        // 2025-08-27 is a Wednesday; its ISO week runs Mon 08-25 .. Sun 08-31
        let p = PeriodSpec::ThisWeek.resolve(d(2025, 8, 27), None).unwrap();
        assert_eq!(p.start, d(2025, 8, 25));
        assert_eq!(p.end, d(2025, 8, 31));
        assert_eq!(p.days(), 7);
    }

    #[test]
    fn test_resolve_this_month() {
        let p = PeriodSpec::ThisMonth.resolve(d(2025, 2, 10), None).unwrap();
        assert_eq!(p.start, d(2025, 2, 1));
        assert_eq!(p.end, d(2025, 2, 28));
        assert_eq!(p.label, "2025-02");
    }

    #[test]
    fn test_resolve_this_quarter() {
        let p = PeriodSpec::ThisQuarter.resolve(d(2025, 8, 25), None).unwrap();
        assert_eq!(p.start, d(2025, 7, 1));
        assert_eq!(p.end, d(2025, 9, 30));
        assert_eq!(p.label, "2025-Q3");
    }

    #[test]
    fn test_resolve_this_year() {
        let p = PeriodSpec::ThisYear.resolve(d(2025, 8, 25), None).unwrap();
        assert_eq!(p.start, d(2025, 1, 1));
        assert_eq!(p.end, d(2025, 12, 31));
    }

    #[test]
    fn test_resolve_last_days() {
        let p = PeriodSpec::LastDays(30).resolve(d(2025, 8, 25), None).unwrap();
        assert_eq!(p.end, d(2025, 8, 25));
        assert_eq!(p.days(), 30);
        assert!(PeriodSpec::LastDays(0).resolve(d(2025, 8, 25), None).is_err());
    }

    #[test]
    fn test_resolve_all() {
        let p = PeriodSpec::All
            .resolve(d(2025, 8, 25), Some(d(2024, 3, 1)))
            .unwrap();
        assert_eq!(p.start, d(2024, 3, 1));
        assert_eq!(p.end, d(2025, 8, 25));

        // No resolvable creations: collapses to the reference day.
        let p = PeriodSpec::All.resolve(d(2025, 8, 25), None).unwrap();
        assert_eq!(p.start, d(2025, 8, 25));
        assert_eq!(p.days(), 1);
    }

    #[test]
    fn test_resolve_custom_valid() {
        let spec = PeriodSpec::Custom {
            start: d(2025, 1, 1),
            end: d(2025, 3, 31),
        };
        let p = spec.resolve(d(2025, 8, 25), None).unwrap();
        assert_eq!(p.days(), 90);
    }

    #[test]
    fn test_resolve_custom_rejects_inverted_range() {
        let spec = PeriodSpec::Custom {
            start: d(2025, 3, 31),
            end: d(2025, 1, 1),
        };
        assert!(matches!(
            spec.resolve(d(2025, 8, 25), None),
            Err(Error::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_resolve_custom_rejects_over_year_span() {
        let spec = PeriodSpec::Custom {
            start: d(2024, 1, 1),
            end: d(2025, 1, 1),
        };
        // 367 days inclusive — rejected, not truncated.
        assert!(matches!(
            spec.resolve(d(2025, 8, 25), None),
            Err(Error::InvalidPeriod(_))
        ));

        let spec = PeriodSpec::Custom {
            start: d(2025, 1, 1),
            end: d(2025, 12, 31),
        };
        assert!(spec.resolve(d(2025, 8, 25), None).is_ok());
    }

    #[test]
    fn test_display_uses_label() {
        let p = Period::new(d(2025, 1, 1), d(2025, 1, 7), "Last 7 days");
        assert_eq!(p.to_string(), "Last 7 days");
    }
}
