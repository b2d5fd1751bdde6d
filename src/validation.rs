//! 課題ページのスキーマ検証
//!
//! 1ページ単位で全件を検証し、1件でも不正ならページ全体を不正とする。

use serde_json::Value;
use thiserror::Error;

use crate::models::Issue;

/// ページ検証エラー（最初に見つかった不正な課題）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("issue #{index}{}: {message}", key_suffix(.key))]
pub struct ValidationError {
    /// ページ内の位置
    pub index: usize,
    /// 読み取れた場合の課題キー
    pub key: Option<String>,
    pub message: String,
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref().map(|k| format!(" ({})", k)).unwrap_or_default()
}

/// 生の課題一覧を検証して型付きの課題一覧に変換
pub fn validate_issues(raw: Vec<Value>) -> Result<Vec<Issue>, ValidationError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| validate_issue(index, value))
        .collect()
}

fn validate_issue(index: usize, value: Value) -> Result<Issue, ValidationError> {
    let key = value
        .get("key")
        .and_then(Value::as_str)
        .map(str::to_string);

    serde_json::from_value(value).map_err(|e| ValidationError {
        index,
        key,
        message: e.to_string(),
    })
}
