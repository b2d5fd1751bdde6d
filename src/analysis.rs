//! リードタイム・サイクルタイムの算出
//!
//! - リードタイム: 作成から解決まで
//! - サイクルタイム: 最初の「作業開始」遷移から解決まで
//!
//! 作業開始の判定は `TransitionRule` の集合で設定する。

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::history::{StatusTransition, status_transitions};
use crate::models::Issue;
use crate::time_filter::DateBuckets;

/// 作業開始とみなすステータス遷移
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionRule {
    pub from: String,
    pub to: String,
    /// 任意のラベル（例: `reopen`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TransitionRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn matches(&self, transition: &StatusTransition) -> bool {
        let from = transition.from_status.as_deref().map(str::trim);
        let to = transition.to_status.as_deref().map(str::trim);
        from == Some(self.from.trim()) && to == Some(self.to.trim())
    }
}

/// 集計設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 集計対象外の課題タイプ（エピックなどの入れ物）
    pub excluded_issue_types: Vec<String>,
    /// 集計対象外のステータス
    pub excluded_statuses: Vec<String>,
    pub work_started: Vec<TransitionRule>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let mut work_started: Vec<TransitionRule> =
            ["Uphill", "In Progress", "In Review", "Done", "Passed"]
                .into_iter()
                .map(|to| TransitionRule::new("To Do", to))
                .collect();
        work_started.extend(
            ["Uphill", "In Progress", "In Review"]
                .into_iter()
                .map(|to| TransitionRule::new("Cancelled", to).labeled("reopen")),
        );

        Self {
            excluded_issue_types: vec!["Epic".to_string()],
            excluded_statuses: vec!["Cancelled".to_string()],
            work_started,
        }
    }
}

impl AnalysisConfig {
    /// 起動時に一度だけ呼ぶ設定検証
    pub fn validate(&self) -> Result<()> {
        if self.work_started.is_empty() {
            return Err(Error::InvalidConfiguration(
                "at least one work-started transition rule is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.work_started {
            if rule.from.trim().is_empty() || rule.to.trim().is_empty() {
                return Err(Error::InvalidConfiguration(format!(
                    "transition rule has a blank status: {:?}",
                    rule
                )));
            }
            if rule.from.trim() == rule.to.trim() {
                return Err(Error::InvalidConfiguration(format!(
                    "transition rule goes from '{}' to itself",
                    rule.from
                )));
            }
            if !seen.insert((rule.from.trim(), rule.to.trim())) {
                return Err(Error::InvalidConfiguration(format!(
                    "duplicate transition rule '{}' -> '{}'",
                    rule.from, rule.to
                )));
            }
        }

        Ok(())
    }
}

/// 集計から除外した理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ExcludedType(String),
    ExcludedStatus(String),
    NoWorkStarted,
}

/// 1課題の判定結果
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    Included(Box<LeadCycleRecord>),
    Skipped(SkipReason),
}

/// CSVの1行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadCycleRecord {
    pub project: String,
    pub key: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub summary: String,
    pub assignee: String,
    pub parent_key: String,
    pub parent_name: String,
    pub created: String,
    pub created_year_month: String,
    pub created_year_week: String,
    pub created_week_start: String,
    pub completed: String,
    pub completed_year_month: String,
    pub completed_year_week: String,
    pub completed_week_start: String,
    pub inprogress: String,
    pub inprogress_year_month: String,
    pub inprogress_year_week: String,
    pub inprogress_week_start: String,
    pub lead_time_days: i64,
    pub lead_time_business_days: i64,
    pub cycle_time_days: i64,
    pub cycle_time_business_days: i64,
}

/// 判定結果の件数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub included: usize,
    pub skipped_type: usize,
    pub skipped_status: usize,
    pub skipped_no_start: usize,
}

impl AnalysisSummary {
    pub fn record(&mut self, assessment: &Assessment) {
        match assessment {
            Assessment::Included(_) => self.included += 1,
            Assessment::Skipped(SkipReason::ExcludedType(_)) => self.skipped_type += 1,
            Assessment::Skipped(SkipReason::ExcludedStatus(_)) => self.skipped_status += 1,
            Assessment::Skipped(SkipReason::NoWorkStarted) => self.skipped_no_start += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_type + self.skipped_status + self.skipped_no_start
    }
}

#[derive(Debug)]
pub struct LeadCycleCalculator {
    config: AnalysisConfig,
}

impl LeadCycleCalculator {
    /// 設定を検証してから作成
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// 最初に作業開始ルールに一致した遷移
    pub fn work_started<'a>(&self, transitions: &'a [StatusTransition]) -> Option<&'a StatusTransition> {
        transitions
            .iter()
            .find(|t| self.config.work_started.iter().any(|rule| rule.matches(t)))
    }

    pub fn assess(&self, issue: &Issue) -> Assessment {
        let fields = &issue.fields;

        if contains_name(&self.config.excluded_issue_types, &fields.issue_type.name) {
            debug!(issue_key = %issue.key, issue_type = %fields.issue_type.name, "Skipping excluded issue type");
            return Assessment::Skipped(SkipReason::ExcludedType(fields.issue_type.name.clone()));
        }
        if self.config.excluded_statuses.iter().any(|name| fields.status.is_named(name)) {
            debug!(issue_key = %issue.key, status = %fields.status.name, "Skipping excluded status");
            return Assessment::Skipped(SkipReason::ExcludedStatus(fields.status.name.clone()));
        }

        let transitions = status_transitions(issue);
        let Some(started) = self.work_started(&transitions) else {
            debug!(issue_key = %issue.key, "Unable to find work-started transition");
            return Assessment::Skipped(SkipReason::NoWorkStarted);
        };
        debug!(issue_key = %issue.key, transition = %started.change_summary(), "Work started");

        let created = fields.created;
        let completed = fields.resolution_date;
        let inprogress = started.timestamp;

        let created_buckets = DateBuckets::of(&created);
        let completed_buckets = DateBuckets::of(&completed);
        let inprogress_buckets = DateBuckets::of(&inprogress);

        Assessment::Included(Box::new(LeadCycleRecord {
            project: fields.project.name.clone(),
            key: issue.key.clone(),
            issue_type: fields.issue_type.name.clone(),
            summary: fields.summary.clone(),
            assignee: issue.assignee_name().unwrap_or("Unassigned").to_string(),
            parent_key: fields
                .parent
                .as_ref()
                .map(|p| p.key.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            parent_name: fields
                .parent
                .as_ref()
                .map(|p| p.fields.summary.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            created: created_buckets.iso,
            created_year_month: created_buckets.year_month,
            created_year_week: created_buckets.year_week,
            created_week_start: created_buckets.week_start,
            completed: completed_buckets.iso,
            completed_year_month: completed_buckets.year_month,
            completed_year_week: completed_buckets.year_week,
            completed_week_start: completed_buckets.week_start,
            inprogress: inprogress_buckets.iso,
            inprogress_year_month: inprogress_buckets.year_month,
            inprogress_year_week: inprogress_buckets.year_week,
            inprogress_week_start: inprogress_buckets.week_start,
            lead_time_days: calendar_days_between(completed, created),
            lead_time_business_days: business_days_between(completed, created),
            cycle_time_days: calendar_days_between(completed, inprogress),
            cycle_time_business_days: business_days_between(completed, inprogress),
        }))
    }
}

fn contains_name(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n.trim() == name.trim())
}

/// 経過した丸一日の数（24時間単位、0方向に切り捨て）
pub fn calendar_days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_days()
}

/// 営業日数（土日を除く）
///
/// 早い日付を含み遅い日付を含まない範囲の平日を数える。逆順なら負になる。
pub fn business_days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    let later = later.date_naive();
    let earlier = earlier.date_naive();

    let diff = (later - earlier).num_days();
    let sign = if diff < 0 { -1 } else { 1 };
    let weeks = diff / 7;

    let mut result = weeks * 5;
    let mut moving = earlier + Duration::days(weeks * 7);
    while moving != later {
        if !is_weekend(moving) {
            result += sign;
        }
        moving += Duration::days(sign);
    }

    result
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
