//! Date range resolution. Maps the dashboard's range picker to a concrete
//! half-open `[start, end)` window anchored to "now".
//!
//! Midnights are computed in the host's local timezone. No further
//! normalization happens, so a dashboard viewed from two timezones sees
//! two different "today" windows.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use storefront_core::AnalyticsError;

/// Range selected in the dashboard.
///
/// Deserializes from a bare tag (`"7days"`, `"custom"`) or from the tagged
/// custom form `{"custom": {"start": .., "end": ..}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr")]
pub enum DateRange {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[default]
    #[serde(rename = "7days")]
    Last7Days,
    #[serde(rename = "30days")]
    Last30Days,
    #[serde(rename = "thisMonth")]
    ThisMonth,
    #[serde(rename = "custom")]
    Custom {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RangeRepr {
    Tag(String),
    Custom { custom: CustomBounds },
}

#[derive(Deserialize)]
struct CustomBounds {
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
}

impl TryFrom<RangeRepr> for DateRange {
    type Error = AnalyticsError;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        match repr {
            RangeRepr::Tag(tag) => tag.parse(),
            RangeRepr::Custom { custom } => Ok(DateRange::Custom {
                start: custom.start,
                end: custom.end,
            }),
        }
    }
}

/// Concrete half-open interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Build a window, swapping the bounds if they arrive reversed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl DateRange {
    pub fn tag(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::Yesterday => "yesterday",
            DateRange::Last7Days => "7days",
            DateRange::Last30Days => "30days",
            DateRange::ThisMonth => "thisMonth",
            DateRange::Custom { .. } => "custom",
        }
    }

    /// Resolve against the host clock and local timezone.
    pub fn resolve(&self) -> DateWindow {
        self.resolve_at(&Local::now())
    }

    /// Resolve against an explicit "now". Midnights are taken in `now`'s timezone.
    pub fn resolve_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateWindow {
        let tz = now.timezone();
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);
        let midnight = |date: NaiveDate| local_midnight(&tz, date);

        match *self {
            DateRange::Today => DateWindow::new(midnight(today), now_utc),
            DateRange::Yesterday => {
                let yesterday = today.pred_opt().unwrap_or(today);
                DateWindow::new(midnight(yesterday), midnight(today))
            }
            DateRange::Last7Days => DateWindow::new(midnight(today - Duration::days(7)), now_utc),
            DateRange::Last30Days => {
                DateWindow::new(midnight(today - Duration::days(30)), now_utc)
            }
            DateRange::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                DateWindow::new(midnight(first), now_utc)
            }
            DateRange::Custom { start, end } => DateWindow::new(
                start.unwrap_or_else(|| midnight(today)),
                end.unwrap_or(now_utc),
            ),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DateRange {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "today" => Ok(DateRange::Today),
            "yesterday" => Ok(DateRange::Yesterday),
            "7days" => Ok(DateRange::Last7Days),
            "30days" => Ok(DateRange::Last30Days),
            "thisMonth" => Ok(DateRange::ThisMonth),
            "custom" => Ok(DateRange::Custom {
                start: None,
                end: None,
            }),
            other => Err(AnalyticsError::InvalidRange(format!(
                "unknown range tag '{other}'"
            ))),
        }
    }
}

/// Midnight of `date` in `tz`. When a DST jump skips midnight, the first
/// wall-clock time that exists that day is used instead.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    first_valid_instant(date.and_time(NaiveTime::MIN), |naive| {
        tz.from_local_datetime(naive).map(|dt| dt.with_timezone(&Utc))
    })
}

/// Probe forward in 15-minute steps for up to a day until `resolve` maps the
/// wall-clock time to a real instant; gives up by reading it as UTC.
fn first_valid_instant(
    naive: NaiveDateTime,
    resolve: impl Fn(&NaiveDateTime) -> LocalResult<DateTime<Utc>>,
) -> DateTime<Utc> {
    const STEP_MINUTES: i64 = 15;
    (0..=24 * 60 / STEP_MINUTES)
        .map(|step| naive + Duration::minutes(step * STEP_MINUTES))
        .find_map(|candidate| resolve(&candidate).earliest())
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
