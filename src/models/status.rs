use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
    #[serde(rename = "statusCategory")]
    pub status_category: StatusCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCategory {
    pub key: String,
    pub name: String,
}

impl Status {
    /// ステータス名が一致するか（前後の空白は無視）
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim() == name.trim()
    }
}
