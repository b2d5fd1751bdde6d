use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{IssueType, Project, Status, User};

/// 検証済みの課題
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    pub fields: IssueFields,
    pub changelog: Changelog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFields {
    pub summary: String,
    #[serde(rename = "issuetype")]
    pub issue_type: IssueType,
    pub project: Project,
    /// 親課題（ペイロードに存在しない場合がある）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    /// 担当者（キーは必須、値はnullを許容）
    #[serde(deserialize_with = "nullable")]
    pub assignee: Option<User>,
    pub resolution: Resolution,
    #[serde(with = "crate::time_filter::jira_datetime")]
    pub created: DateTime<Utc>,
    #[serde(rename = "resolutiondate")]
    #[serde(with = "crate::time_filter::jira_datetime")]
    pub resolution_date: DateTime<Utc>,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    pub key: String,
    pub fields: ParentFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentFields {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Changelog {
    #[serde(rename = "startAt")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u32>,
    #[serde(rename = "maxResults")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    pub histories: Vec<History>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub id: String,
    pub author: User,
    #[serde(with = "crate::time_filter::jira_datetime")]
    pub created: DateTime<Utc>,
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub field: String,
    #[serde(rename = "fieldtype")]
    pub field_type: String,
    #[serde(rename = "fieldId")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(rename = "fromString")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(rename = "toString")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_string: Option<String>,
}

impl Issue {
    /// 担当者の表示名
    pub fn assignee_name(&self) -> Option<&str> {
        self.fields.assignee.as_ref().map(|a| a.display_name.as_str())
    }
}

impl HistoryItem {
    pub fn is_status_change(&self) -> bool {
        self.field == "status"
    }
}

// `deserialize_with` を付けた Option はキー欠落時にエラーとなる
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}
