use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChangelogPage, SearchRequest, SearchResponse};

/// 課題データの取得元
///
/// `JiraClient` が本番実装。テストではメモリ上の実装に差し替える。
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// 課題を1ページ検索する
    ///
    /// HTTPステータスが成功以外でも `Ok` で返す。通信自体の失敗のみ `Err`。
    async fn search_issues(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// 課題の変更履歴を `start_at` から1ページ取得する
    async fn changelog_page(&self, issue_key: &str, start_at: u32) -> Result<ChangelogPage>;
}
