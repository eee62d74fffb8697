use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillChainPhase {
    pub kill_chain_name: String,
    pub phase_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechniqueEntry {
    pub name: String,
    /// 保留給之後的戰術關聯，目前不參與比對
    pub kill_chain_phases: Vec<KillChainPhase>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TacticEntry {
    pub name: String,
}

/// 技術與戰術的查詢表，每次執行建立一次，之後唯讀
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub techniques: HashMap<String, TechniqueEntry>,
    pub tactics: HashMap<String, TacticEntry>,
}

impl Catalog {
    pub fn has_technique(&self, id: &str) -> bool {
        self.techniques.contains_key(id)
    }

    pub fn has_tactic(&self, id: &str) -> bool {
        self.tactics.contains_key(id)
    }

    pub fn technique_name(&self, id: &str) -> Option<&str> {
        self.techniques.get(id).map(|t| t.name.as_str())
    }

    pub fn tactic_name(&self, id: &str) -> Option<&str> {
        self.tactics.get(id).map(|t| t.name.as_str())
    }
}

/// 掃描結果：只記錄是否出現，不計次數
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundIdentifiers {
    pub techniques: BTreeSet<String>,
    pub tactics: BTreeSet<String>,
}

impl FoundIdentifiers {
    pub fn union(mut self, other: FoundIdentifiers) -> Self {
        self.techniques.extend(other.techniques);
        self.tactics.extend(other.tactics);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty() && self.tactics.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Text,
}

impl ParseMode {
    pub fn label(&self) -> &'static str {
        match self {
            ParseMode::Html => "HTML parsing",
            ParseMode::Text => "Text parsing",
        }
    }
}

/// 來源資訊，只用於輸出的 metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub url: Option<String>,
    pub title: Option<String>,
    pub html_mode_used: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// 已解析的 HTML 文件（擁有所有權，可跨 await 傳遞）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    pub title: Option<String>,
    pub links: Vec<Link>,
    pub visible_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Url(String),
    File(String),
    Text(String),
}

/// extract 階段取得的原始內容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    Html {
        url: Option<String>,
        body: String,
        title_hint: Option<String>,
    },
    Text {
        title: String,
        body: String,
    },
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub catalog: Catalog,
    pub content: RawContent,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub layer: crate::domain::layer::NavigatorLayer,
    pub found: FoundIdentifiers,
    pub catalog: Catalog,
    pub source: SourceInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedItem {
    pub id: String,
    pub name: String,
}

/// 一次執行的摘要，供 CLI 列印
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: String,
    pub techniques: Vec<MatchedItem>,
    pub tactics: Vec<MatchedItem>,
    pub html_mode_used: Option<bool>,
}

impl RunSummary {
    pub fn parsing_mode(&self) -> Option<ParseMode> {
        self.html_mode_used
            .map(|html| if html { ParseMode::Html } else { ParseMode::Text })
    }
}
