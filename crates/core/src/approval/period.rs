//! Period types for approval workflows.
//!
//! A workflow approves data for one period type. Periods are always stored
//! normalized to their start date so that two periods compare equal exactly
//! when they cover the same span.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Period type of a workflow or of a requested period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    /// One calendar day.
    Daily,
    /// ISO week starting on Monday.
    Weekly,
    /// Calendar month.
    Monthly,
    /// Two calendar months starting January.
    BiMonthly,
    /// Calendar quarter.
    Quarterly,
    /// Half year starting January or July.
    SixMonthly,
    /// Calendar year.
    Yearly,
}

impl PeriodType {
    /// Returns the string representation of the period type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::BiMonthly => "bi_monthly",
            Self::Quarterly => "quarterly",
            Self::SixMonthly => "six_monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Parses a period type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "bi_monthly" | "bimonthly" => Some(Self::BiMonthly),
            "quarterly" => Some(Self::Quarterly),
            "six_monthly" | "sixmonthly" => Some(Self::SixMonthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Number of months spanned, for month-aligned types.
    const fn months(self) -> Option<u32> {
        match self {
            Self::Daily | Self::Weekly => None,
            Self::Monthly => Some(1),
            Self::BiMonthly => Some(2),
            Self::Quarterly => Some(3),
            Self::SixMonthly => Some(6),
            Self::Yearly => Some(12),
        }
    }

    /// Returns the period of this type that contains `date`.
    #[must_use]
    pub fn containing(self, date: NaiveDate) -> Period {
        let start = match self.months() {
            None if self == Self::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            None => date,
            Some(span) => {
                let month0 = (date.month0() / span) * span;
                first_of_month(date.year(), month0)
            }
        };

        Period {
            period_type: self,
            start_date: start,
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A concrete period, normalized to its start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// The type of this period.
    pub period_type: PeriodType,
    /// First day of the period.
    pub start_date: NaiveDate,
}

impl Period {
    /// Creates the period of `period_type` containing `date`.
    #[must_use]
    pub fn new(period_type: PeriodType, date: NaiveDate) -> Self {
        period_type.containing(date)
    }

    /// Last day of the period (inclusive).
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        match self.period_type.months() {
            None if self.period_type == PeriodType::Weekly => self.start_date + Duration::days(6),
            None => self.start_date,
            Some(span) => {
                let next_month0 = self.start_date.month0() + span;
                let next_start = first_of_month(
                    self.start_date.year() + i32::try_from(next_month0 / 12).unwrap_or(0),
                    next_month0 % 12,
                );
                next_start - Duration::days(1)
            }
        }
    }

    /// Returns true if `date` falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date()
    }

    /// Returns the period of `period_type` that contains this period's end.
    ///
    /// Used to find the workflow period a finer period is approved under.
    #[must_use]
    pub fn rebase(&self, period_type: PeriodType) -> Self {
        if period_type == self.period_type {
            *self
        } else {
            period_type.containing(self.end_date())
        }
    }

    /// ISO-like period code, e.g. `202601`, `2026Q1`, `2026W3`.
    #[must_use]
    pub fn code(&self) -> String {
        let d = self.start_date;
        match self.period_type {
            PeriodType::Daily => d.format("%Y%m%d").to_string(),
            PeriodType::Weekly => {
                let week = d.iso_week();
                format!("{}W{}", week.year(), week.week())
            }
            PeriodType::Monthly => d.format("%Y%m").to_string(),
            PeriodType::BiMonthly => format!("{}{:02}B", d.year(), d.month0() / 2 + 1),
            PeriodType::Quarterly => format!("{}Q{}", d.year(), d.month0() / 3 + 1),
            PeriodType::SixMonthly => format!("{}S{}", d.year(), d.month0() / 6 + 1),
            PeriodType::Yearly => d.year().to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

fn first_of_month(year: i32, month0: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(NaiveDate::MIN)
}
