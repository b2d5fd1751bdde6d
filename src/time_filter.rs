use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, SecondsFormat, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 集計対象期間
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TimePeriod {
    CurrentWeek,
    PreviousWeek,
    CurrentMonth,
    PreviousMonth,
    CurrentQuarter,
    PreviousQuarter,
    CurrentYear,
    PreviousYear,
}

/// 半開区間 `[start, end)` の日付範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidInput(format!(
                "Date range start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }
}

impl TimePeriod {
    /// `today` を基準にした期間。今期は明日まで、前期は今期の開始日まで
    pub fn date_range(self, today: NaiveDate) -> Result<DateRange> {
        let week_start = start_of_week_date(today);
        let month_start = first_of_month(today.year(), today.month())?;
        let quarter_start = first_of_month(today.year(), (today.month0() / 3) * 3 + 1)?;
        let year_start = first_of_month(today.year(), 1)?;
        let tomorrow = add_days(today, 1)?;

        let (start, end) = match self {
            TimePeriod::CurrentWeek => (week_start, tomorrow),
            TimePeriod::PreviousWeek => (sub_days(week_start, 7)?, week_start),
            TimePeriod::CurrentMonth => (month_start, tomorrow),
            TimePeriod::PreviousMonth => (sub_months(month_start, 1)?, month_start),
            TimePeriod::CurrentQuarter => (quarter_start, tomorrow),
            TimePeriod::PreviousQuarter => (sub_months(quarter_start, 3)?, quarter_start),
            TimePeriod::CurrentYear => (year_start, tomorrow),
            TimePeriod::PreviousYear => (first_of_month(today.year() - 1, 1)?, year_start),
        };

        DateRange::new(start, end)
    }
}

/// リードタイム集計用のJQLを生成
pub fn lead_cycle_jql(project: &str, range: &DateRange) -> String {
    let conditions = [
        format!("project = {}", quote_jql(project)),
        format!("resolutiondate >= \"{}\"", format_jira_date(range.start)),
        format!("resolutiondate < \"{}\"", format_jira_date(range.end)),
        "resolution = Done".to_string(),
    ];

    format!("{} ORDER BY resolutiondate DESC", conditions.join(" AND "))
}

fn quote_jql(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn format_jira_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// ミリ秒精度のISO 8601（UTC, `Z` 付き）
pub fn to_iso_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 月曜 00:00 UTC の週初め
pub fn start_of_week(dt: &DateTime<Utc>) -> DateTime<Utc> {
    start_of_week_date(dt.date_naive()).and_time(chrono::NaiveTime::MIN).and_utc()
}

fn start_of_week_date(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// CSV 出力用の日付区分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBuckets {
    pub iso: String,
    pub year_month: String,
    pub year_week: String,
    pub week_start: String,
}

impl DateBuckets {
    pub fn of(dt: &DateTime<Utc>) -> Self {
        let iso_week = dt.iso_week();
        Self {
            iso: to_iso_string(dt),
            year_month: dt.format("%Y-%m").to_string(),
            year_week: format!("{}-{:02}", iso_week.year(), iso_week.week()),
            week_start: to_iso_string(&start_of_week(dt)),
        }
    }
}

/// JIRAの日時表現をパース
///
/// RFC 3339、`2024-01-15T10:30:00.000+0000` 形式、JQLの `2024-01-15 10:30` 形式を受け付ける。
pub fn parse_jira_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive_dt = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")?;
    Ok(naive_dt.and_utc())
}

/// `#[serde(with = "...")]` 用の日時シリアライザ
pub mod jira_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_iso_string(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_jira_datetime(&raw)
            .map_err(|e| serde::de::Error::custom(format!("invalid date '{}': {}", raw, e)))
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidInput(format!("Invalid date {}-{:02}-01", year, month)))
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| Error::InvalidInput(format!("Date out of range: {} + {} days", date, days)))
}

fn sub_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(|| Error::InvalidInput(format!("Date out of range: {} - {} days", date, days)))
}

fn sub_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_sub_months(Months::new(months)).ok_or_else(|| {
        Error::InvalidInput(format!("Date out of range: {} - {} months", date, months))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_jira_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();

        assert_eq!(parse_jira_datetime("2024-01-15T10:30:00.000+0000").unwrap(), expected);
        assert_eq!(parse_jira_datetime("2024-01-15T10:30:00Z").unwrap(), expected);
        assert_eq!(parse_jira_datetime("2024-01-15T19:30:00.000+0900").unwrap(), expected);
        assert_eq!(parse_jira_datetime("2024-01-15 10:30").unwrap(), expected);
        assert!(parse_jira_datetime("yesterday").is_err());
    }

    #[test]
    fn test_current_periods_end_tomorrow() {
        // 2024-05-15 は水曜日
        let today = date(2024, 5, 15);

        let week = TimePeriod::CurrentWeek.date_range(today).unwrap();
        assert_eq!(week.start, date(2024, 5, 13));
        assert_eq!(week.end, date(2024, 5, 16));

        let month = TimePeriod::CurrentMonth.date_range(today).unwrap();
        assert_eq!(month.start, date(2024, 5, 1));

        let quarter = TimePeriod::CurrentQuarter.date_range(today).unwrap();
        assert_eq!(quarter.start, date(2024, 4, 1));

        let year = TimePeriod::CurrentYear.date_range(today).unwrap();
        assert_eq!(year.start, date(2024, 1, 1));
        assert_eq!(year.end, date(2024, 5, 16));
    }

    #[test]
    fn test_previous_periods() {
        let today = date(2024, 1, 3);

        let week = TimePeriod::PreviousWeek.date_range(today).unwrap();
        assert_eq!((week.start, week.end), (date(2023, 12, 25), date(2024, 1, 1)));

        let month = TimePeriod::PreviousMonth.date_range(today).unwrap();
        assert_eq!((month.start, month.end), (date(2023, 12, 1), date(2024, 1, 1)));

        let quarter = TimePeriod::PreviousQuarter.date_range(today).unwrap();
        assert_eq!((quarter.start, quarter.end), (date(2023, 10, 1), date(2024, 1, 1)));

        let year = TimePeriod::PreviousYear.date_range(today).unwrap();
        assert_eq!((year.start, year.end), (date(2023, 1, 1), date(2024, 1, 1)));
    }

    #[test]
    fn test_lead_cycle_jql() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 4, 1)).unwrap();

        let jql = lead_cycle_jql("AB", &range);

        assert_eq!(
            jql,
            "project = \"AB\" AND resolutiondate >= \"2024-01-01\" AND resolutiondate < \"2024-04-01\" \
             AND resolution = Done ORDER BY resolutiondate DESC"
        );
    }

    #[test]
    fn test_lead_cycle_jql_escapes_quotes() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 2, 1)).unwrap();

        let jql = lead_cycle_jql("My \"Team\"", &range);

        assert!(jql.starts_with("project = \"My \\\"Team\\\"\" AND"));
    }

    #[test]
    fn test_date_range_rejects_empty() {
        assert!(DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_date_buckets() {
        // 2024-01-03 (水) 15:45 UTC
        let dt = Utc.with_ymd_and_hms(2024, 1, 3, 15, 45, 0).unwrap();

        let buckets = DateBuckets::of(&dt);

        assert_eq!(buckets.iso, "2024-01-03T15:45:00.000Z");
        assert_eq!(buckets.year_month, "2024-01");
        assert_eq!(buckets.year_week, "2024-01");
        assert_eq!(buckets.week_start, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_iso_week_year_boundary() {
        // 2024-12-30 は ISO 2025年第1週
        let dt = Utc.with_ymd_and_hms(2024, 12, 30, 8, 0, 0).unwrap();

        let buckets = DateBuckets::of(&dt);

        assert_eq!(buckets.year_month, "2024-12");
        assert_eq!(buckets.year_week, "2025-01");
    }
}
