//! 課題検索のページング
//!
//! `IssuePager` は明示的な状態を持つプル型のページャ。`next_batch` を呼ぶたびに
//! 検索を1ページ進め、切り詰められた変更履歴を補完し、ページ全体を検証してから返す。
//!
//! 戻り値は3状態:
//! - `Ok(Some(batch))` 検証済みの課題
//! - `Ok(None)` データの終端
//! - `Err(e)` 取得・検証の失敗。以降は `Ok(None)` を返し続ける

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::changelog;
use crate::error::{Error, Result};
use crate::models::{Cursor, Issue, SearchRequest};
use crate::source::IssueSource;
use crate::validation;

pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// ページャの設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagerOptions {
    /// ページ間の固定待機時間
    pub page_delay: Duration,
    /// 1ページの最大件数（未指定ならサーバー既定）
    pub page_size: Option<u32>,
    pub fields: Vec<String>,
    pub expand: Vec<String>,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            page_delay: DEFAULT_PAGE_DELAY,
            page_size: None,
            fields: vec!["*all".to_string()],
            expand: vec!["changelog".to_string()],
        }
    }
}

impl PagerOptions {
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }
}

/// ページングが終了した理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// 最終ページまで取得した
    Exhausted,
    /// 成功以外のHTTPステータス
    HttpStatus(u16),
    /// レスポンスに課題一覧がない
    MissingIssues,
    /// ページの検証に失敗した
    Validation(String),
    /// 通信などの失敗
    Transport(String),
}

impl StopReason {
    /// サーバーが応答した上での失敗か（取得済みの課題で出力を続けてよい）
    ///
    /// 通信そのものの失敗は含まない。
    pub fn is_answered_failure(&self) -> bool {
        matches!(
            self,
            StopReason::HttpStatus(_) | StopReason::MissingIssues | StopReason::Validation(_)
        )
    }
}

/// ページャの取得統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerStats {
    pub pages: usize,
    pub issues: usize,
    pub reconciled_changelogs: usize,
}

#[derive(Debug)]
enum PagerState {
    /// 次の検索を待っている（`throttle` が真なら先に待機する）
    Pending { cursor: Option<Cursor>, throttle: bool },
    Finished(StopReason),
}

pub struct IssuePager {
    source: Arc<dyn IssueSource>,
    jql: String,
    options: PagerOptions,
    state: PagerState,
    stats: PagerStats,
}

impl std::fmt::Debug for IssuePager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuePager")
            .field("jql", &self.jql)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .field("source", &"<IssueSource>")
            .finish()
    }
}

impl IssuePager {
    pub fn new(source: Arc<dyn IssueSource>, jql: impl Into<String>, options: PagerOptions) -> Self {
        Self {
            source,
            jql: jql.into(),
            options,
            state: PagerState::Pending {
                cursor: None,
                throttle: false,
            },
            stats: PagerStats::default(),
        }
    }

    pub fn jql(&self) -> &str {
        &self.jql
    }

    pub fn stats(&self) -> &PagerStats {
        &self.stats
    }

    /// 終了していればその理由
    pub fn stop_reason(&self) -> Option<&StopReason> {
        match &self.state {
            PagerState::Finished(reason) => Some(reason),
            PagerState::Pending { .. } => None,
        }
    }


    /// 次の検証済みバッチを取得
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Issue>>> {
        let (cursor, throttle) = match &self.state {
            PagerState::Finished(_) => return Ok(None),
            PagerState::Pending { cursor, throttle } => (cursor.clone(), *throttle),
        };

        if throttle && !self.options.page_delay.is_zero() {
            debug!(delay_ms = self.options.page_delay.as_millis() as u64, "Waiting before next page");
            tokio::time::sleep(self.options.page_delay).await;
        }

        match self.fetch_page(cursor).await {
            Ok((issues, next)) => {
                self.stats.pages += 1;
                self.stats.issues += issues.len();
                self.state = match next {
                    Some(cursor) => PagerState::Pending {
                        cursor: Some(cursor),
                        throttle: true,
                    },
                    None => {
                        info!(
                            pages = self.stats.pages,
                            issues = self.stats.issues,
                            "Reached last page"
                        );
                        PagerState::Finished(StopReason::Exhausted)
                    }
                };
                Ok(Some(issues))
            }
            Err(e) => {
                let reason = match &e {
                    Error::ApiError { status, .. } => StopReason::HttpStatus(*status),
                    Error::Validation(v) => StopReason::Validation(v.to_string()),
                    Error::InvalidData(_) => StopReason::MissingIssues,
                    other => StopReason::Transport(other.to_string()),
                };
                warn!(reason = ?reason, pages = self.stats.pages, "Stopping issue pagination");
                self.state = PagerState::Finished(reason);
                Err(e)
            }
        }
    }

    async fn fetch_page(&mut self, cursor: Option<Cursor>) -> Result<(Vec<Issue>, Option<Cursor>)> {
        let mut request = SearchRequest::new(self.jql.clone())
            .cursor(cursor)
            .fields(self.options.fields.clone())
            .expand(self.options.expand.clone());
        if let Some(size) = self.options.page_size {
            request = request.max_results(size);
        }

        let response = self.source.search_issues(&request).await?;
        if !response.is_success() {
            return Err(Error::ApiError {
                status: response.status,
                message: "issue search returned a non-success status".to_string(),
            });
        }

        let page = response.page.unwrap_or_default();
        let next = page.next_cursor();
        if next.is_none() && !page.has_pagination_metadata() {
            debug!("No pagination metadata in search response, treating as last page");
        }
        let mut raw = page
            .issues
            .ok_or_else(|| Error::InvalidData("search response has no issue list".to_string()))?;
        info!(count = raw.len(), "Got issues");

        self.stats.reconciled_changelogs +=
            changelog::reconcile_page(self.source.as_ref(), &mut raw, self.options.page_delay).await?;

        let issues = validation::validate_issues(raw)?;
        Ok((issues, next))
    }

    /// `futures::Stream` に変換する。失敗時は `Err` を1つ流して終了する
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Issue>>> {
        futures::stream::unfold(self, |mut pager| async move {
            match pager.next_batch().await {
                Ok(Some(batch)) => Some((Ok(batch), pager)),
                Ok(None) => None,
                Err(e) => Some((Err(e), pager)),
            }
        })
    }
}
