use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Issue;

/// 変更履歴から取り出したステータス遷移
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusTransition {
    pub issue_key: String,
    /// 変更履歴エントリのID
    pub change_id: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
}

impl StatusTransition {
    /// 変更の概要
    pub fn change_summary(&self) -> String {
        format!(
            "{}: {} changed status from '{}' to '{}'",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.author,
            self.from_status.as_deref().unwrap_or("None"),
            self.to_status.as_deref().unwrap_or("None"),
        )
    }
}

/// 課題の全ステータス遷移を時系列昇順で返す
///
/// 同時刻の遷移は変更履歴内の順序を保つ。
pub fn status_transitions(issue: &Issue) -> Vec<StatusTransition> {
    let mut transitions: Vec<StatusTransition> = issue
        .changelog
        .histories
        .iter()
        .flat_map(|history| {
            history
                .items
                .iter()
                .filter(|item| item.is_status_change())
                .map(move |item| StatusTransition {
                    issue_key: issue.key.clone(),
                    change_id: history.id.clone(),
                    timestamp: history.created,
                    author: history.author.display_name.clone(),
                    from_status: item.from_string.clone(),
                    to_status: item.to_string.clone(),
                })
        })
        .collect();

    transitions.sort_by_key(|t| t.timestamp);
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_status_transitions_sorted_and_filtered() {
        // 変更履歴は新しい順で返されることがある
        let issue: Issue = serde_json::from_value(json!({
            "key": "AB-1",
            "fields": {
                "summary": "S",
                "issuetype": { "name": "Story" },
                "project": { "key": "AB", "name": "Alpha Beta" },
                "assignee": null,
                "resolution": { "name": "Done" },
                "created": "2024-01-01T09:00:00.000+0000",
                "resolutiondate": "2024-01-10T09:00:00.000+0000",
                "status": { "name": "Done", "statusCategory": { "key": "done", "name": "Done" } }
            },
            "changelog": { "histories": [
                {
                    "id": "3",
                    "author": { "displayName": "Bob" },
                    "created": "2024-01-09T09:00:00.000+0000",
                    "items": [{ "field": "status", "fieldtype": "jira",
                                "fromString": "In Progress", "toString": "Done" }]
                },
                {
                    "id": "2",
                    "author": { "displayName": "Alice" },
                    "created": "2024-01-03T09:00:00.000+0000",
                    "items": [
                        { "field": "assignee", "fieldtype": "jira", "toString": "Alice" },
                        { "field": "status", "fieldtype": "jira",
                          "fromString": "To Do", "toString": "In Progress" }
                    ]
                }
            ]}
        }))
        .unwrap();

        let transitions = status_transitions(&issue);

        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].change_id, "2");
        assert_eq!(transitions[0].to_status.as_deref(), Some("In Progress"));
        assert_eq!(
            transitions[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap()
        );
        assert_eq!(transitions[1].to_status.as_deref(), Some("Done"));

        let summary = transitions[0].change_summary();
        assert!(summary.contains("Alice"));
        assert!(summary.contains("'To Do'"));
        assert!(summary.contains("'In Progress'"));
    }
}
