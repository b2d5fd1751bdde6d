use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 検索結果ページのカーソル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    /// `/search/jql` の nextPageToken
    Token(String),
    /// 旧 `/search` の startAt
    Offset(u32),
}

/// 課題検索リクエスト
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub jql: String,
    pub cursor: Option<Cursor>,
    pub max_results: Option<u32>,
    pub fields: Vec<String>,
    pub expand: Vec<String>,
}

impl SearchRequest {
    pub fn new(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            ..Self::default()
        }
    }

    pub fn cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn expand(mut self, expand: Vec<String>) -> Self {
        self.expand = expand;
        self
    }

    /// クエリ文字列のパラメータ一覧
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("jql", self.jql.clone())];

        match &self.cursor {
            Some(Cursor::Token(token)) => pairs.push(("nextPageToken", token.clone())),
            Some(Cursor::Offset(start_at)) => pairs.push(("startAt", start_at.to_string())),
            None => {}
        }
        if let Some(max_results) = self.max_results {
            pairs.push(("maxResults", max_results.to_string()));
        }
        if !self.expand.is_empty() {
            pairs.push(("expand", self.expand.join(",")));
        }
        if !self.fields.is_empty() {
            pairs.push(("fields", self.fields.join(",")));
        }

        pairs
    }
}

/// 検索エンドポイントの生レスポンス
///
/// 課題は検証前の JSON のまま保持する。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Option<Vec<Value>>,

    #[serde(rename = "nextPageToken")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    #[serde(rename = "startAt")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u32>,

    #[serde(rename = "maxResults")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(rename = "isLast")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_last: Option<bool>,
}

impl SearchPage {
    /// 次ページのカーソル。`None` ならこれ以上ページはない
    pub fn next_cursor(&self) -> Option<Cursor> {
        if self.is_last == Some(true) {
            return None;
        }

        if let Some(token) = self.next_page_token.as_deref().filter(|t| !t.is_empty()) {
            return Some(Cursor::Token(token.to_string()));
        }

        match (self.start_at, self.max_results, self.total) {
            (Some(start_at), Some(max_results), Some(total)) if max_results > 0 => {
                let next = start_at.saturating_add(max_results);
                (next < total).then_some(Cursor::Offset(next))
            }
            _ => None,
        }
    }

    /// ページング情報が揃っているか
    pub fn has_pagination_metadata(&self) -> bool {
        self.next_page_token.is_some()
            || self.is_last.is_some()
            || (self.start_at.is_some() && self.max_results.is_some() && self.total.is_some())
    }
}

/// 検索レスポンス（ステータスコードとボディ）
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub status: u16,
    pub page: Option<SearchPage>,
}

impl SearchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 課題ごとの変更履歴エンドポイントのレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangelogPage {
    #[serde(rename = "startAt")]
    #[serde(default)]
    pub start_at: Option<u32>,

    #[serde(rename = "maxResults")]
    #[serde(default)]
    pub max_results: Option<u32>,

    #[serde(default)]
    pub total: Option<u32>,

    #[serde(rename = "isLast")]
    #[serde(default)]
    pub is_last: Option<bool>,

    #[serde(default)]
    pub values: Vec<Value>,
}

impl ChangelogPage {
    /// 次ページの startAt。`None` なら取得完了
    pub fn next_start_at(&self) -> Option<u32> {
        if self.values.is_empty() || self.is_last == Some(true) {
            return None;
        }

        let next = self
            .start_at
            .unwrap_or(0)
            .saturating_add(self.values.len() as u32);

        match self.total {
            Some(total) => (next < total).then_some(next),
            None => (self.is_last == Some(false)).then_some(next),
        }
    }
}
