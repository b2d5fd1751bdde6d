use serde::{Deserialize, Serialize};

/// 担当者・変更者（表示名のみ利用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "displayName")]
    pub display_name: String,
}
