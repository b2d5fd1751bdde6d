//! 変更履歴の補完
//!
//! 検索結果に埋め込まれた changelog は `maxResults` 件で切り詰められる。
//! `total > maxResults` の課題は変更履歴エンドポイントから全件を取り直し、
//! 埋め込みの部分的な履歴を置き換える。

use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::source::IssueSource;

/// 埋め込みの変更履歴が切り詰められているか
pub fn needs_reconciliation(issue: &Value) -> bool {
    let Some(changelog) = issue.get("changelog") else {
        return false;
    };
    let total = changelog.get("total").and_then(Value::as_u64);
    let max_results = changelog.get("maxResults").and_then(Value::as_u64);

    matches!((total, max_results), (Some(total), Some(max)) if total > max)
}

/// ページ内の切り詰められた課題すべての変更履歴を補完し、補完した課題数を返す
pub async fn reconcile_page(
    source: &dyn IssueSource,
    issues: &mut [Value],
    page_delay: Duration,
) -> Result<usize> {
    let mut reconciled = 0;

    for issue in issues.iter_mut() {
        if !needs_reconciliation(issue) {
            continue;
        }
        let Some(key) = issue.get("key").and_then(Value::as_str).map(str::to_string) else {
            // キーのない課題は後段の検証で弾かれる
            continue;
        };

        let histories = fetch_full_changelog(source, &key, page_delay).await?;
        info!(issue_key = %key, histories = histories.len(), "Reconciled truncated changelog");
        replace_histories(issue, histories);
        reconciled += 1;
    }

    Ok(reconciled)
}

/// 1課題の変更履歴を全ページ取得して連結する
pub async fn fetch_full_changelog(
    source: &dyn IssueSource,
    issue_key: &str,
    page_delay: Duration,
) -> Result<Vec<Value>> {
    let mut histories = Vec::new();
    let mut start_at = 0u32;

    loop {
        let page = source.changelog_page(issue_key, start_at).await?;
        debug!(
            issue_key,
            start_at,
            received = page.values.len(),
            total = ?page.total,
            "Received changelog page"
        );

        // 要求した位置と違うページは既に取り込んだ履歴の繰り返しとみなす
        if page.start_at.is_some_and(|returned| returned != start_at) {
            warn!(issue_key, start_at, returned = ?page.start_at, "Changelog page does not match requested offset, stopping");
            break;
        }

        match page.next_start_at() {
            Some(next) if next <= start_at => {
                warn!(issue_key, start_at, next, "Changelog cursor did not advance, stopping");
                break;
            }
            Some(next) => {
                histories.extend(page.values);
                start_at = next;
                if !page_delay.is_zero() {
                    tokio::time::sleep(page_delay).await;
                }
            }
            None => {
                histories.extend(page.values);
                break;
            }
        }
    }

    Ok(histories)
}

fn replace_histories(issue: &mut Value, histories: Vec<Value>) {
    let count = histories.len();
    issue["changelog"] = json!({
        "startAt": 0,
        "maxResults": count,
        "total": count,
        "histories": histories,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangelogPage, SearchRequest, SearchResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Instant;

    /// startAt ごとに決まったページを返す変更履歴ソース
    struct PagedChangelog {
        total: u32,
        page_size: u32,
        requests: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait]
    impl IssueSource for PagedChangelog {
        async fn search_issues(&self, _request: &SearchRequest) -> Result<SearchResponse> {
            unreachable!("search is not used here")
        }

        async fn changelog_page(&self, issue_key: &str, start_at: u32) -> Result<ChangelogPage> {
            self.requests
                .lock()
                .unwrap()
                .push((issue_key.to_string(), start_at));
            let end = (start_at + self.page_size).min(self.total);
            let values = (start_at..end).map(|i| json!({ "id": i.to_string() })).collect();
            Ok(ChangelogPage {
                start_at: Some(start_at),
                max_results: Some(self.page_size),
                total: Some(self.total),
                is_last: Some(end >= self.total),
                values,
            })
        }
    }

    /// リクエスト時刻を記録する
    struct TimedChangelog {
        inner: PagedChangelog,
        times: Mutex<Vec<Instant>>,
    }

    impl TimedChangelog {
        fn new(inner: PagedChangelog) -> Self {
            Self {
                inner,
                times: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IssueSource for TimedChangelog {
        async fn search_issues(&self, request: &SearchRequest) -> Result<SearchResponse> {
            self.inner.search_issues(request).await
        }

        async fn changelog_page(&self, issue_key: &str, start_at: u32) -> Result<ChangelogPage> {
            self.times.lock().unwrap().push(Instant::now());
            self.inner.changelog_page(issue_key, start_at).await
        }
    }

    fn truncated_issue(key: &str, total: u32, max_results: u32) -> Value {
        let embedded: Vec<Value> = (0..max_results)
            .map(|i| json!({ "id": format!("embedded-{}", i) }))
            .collect();
        json!({
            "key": key,
            "changelog": {
                "startAt": 0,
                "maxResults": max_results,
                "total": total,
                "histories": embedded
            }
        })
    }

    #[test]
    fn test_needs_reconciliation() {
        assert!(needs_reconciliation(&truncated_issue("AB-1", 50, 20)));
        assert!(!needs_reconciliation(&truncated_issue("AB-1", 20, 20)));
        assert!(!needs_reconciliation(&json!({ "key": "AB-1" })));
        assert!(!needs_reconciliation(&json!({ "key": "AB-1", "changelog": { "histories": [] } })));
    }

    #[tokio::test]
    async fn test_reconcile_replaces_partial_history() {
        let source = PagedChangelog {
            total: 50,
            page_size: 20,
            requests: Mutex::new(Vec::new()),
        };
        let mut issues = vec![truncated_issue("AB-1", 50, 20), truncated_issue("AB-2", 3, 20)];

        let reconciled = reconcile_page(&source, &mut issues, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(reconciled, 1);
        let histories = issues[0]["changelog"]["histories"].as_array().unwrap();
        assert_eq!(histories.len(), 50);
        assert!(histories.iter().all(|h| !h["id"].as_str().unwrap().starts_with("embedded")));
        assert_eq!(issues[0]["changelog"]["total"], 50);
        assert_eq!(issues[1]["changelog"]["histories"].as_array().unwrap().len(), 20);

        let requests = source.requests.lock().unwrap();
        let starts: Vec<u32> = requests.iter().map(|(_, s)| *s).collect();
        assert_eq!(starts, vec![0, 20, 40]);
        assert!(requests.iter().all(|(k, _)| k == "AB-1"));
    }

    #[tokio::test]
    async fn test_fetch_stops_when_cursor_does_not_advance() {
        struct StuckSource;

        #[async_trait]
        impl IssueSource for StuckSource {
            async fn search_issues(&self, _request: &SearchRequest) -> Result<SearchResponse> {
                unreachable!()
            }

            async fn changelog_page(&self, _key: &str, _start_at: u32) -> Result<ChangelogPage> {
                // startAt を無視して常に先頭ページを返す
                Ok(ChangelogPage {
                    start_at: Some(0),
                    max_results: Some(1),
                    total: Some(10),
                    is_last: Some(false),
                    values: vec![json!({ "id": "0" })],
                })
            }
        }

        let histories = fetch_full_changelog(&StuckSource, "AB-1", Duration::ZERO)
            .await
            .unwrap();

        // 繰り返されたページは取り込まない
        assert_eq!(histories, vec![json!({ "id": "0" })]);
    }

    #[tokio::test]
    async fn test_fetch_waits_between_changelog_pages() {
        let source = TimedChangelog::new(PagedChangelog {
            total: 30,
            page_size: 10,
            requests: Mutex::new(Vec::new()),
        });

        let histories = fetch_full_changelog(&source, "AB-1", Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(histories.len(), 30);
        let times = source.times.lock().unwrap();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test]
    async fn test_single_changelog_page_does_not_wait() {
        let source = TimedChangelog::new(PagedChangelog {
            total: 5,
            page_size: 10,
            requests: Mutex::new(Vec::new()),
        });

        let started = Instant::now();
        let histories = fetch_full_changelog(&source, "AB-1", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(histories.len(), 5);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
