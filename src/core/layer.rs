//! Navigator layer builder. A pure transform: same inputs, same document.

use crate::domain::layer::{
    Gradient, LayerFilters, LayerLayout, LayerLink, LayerTechnique, LayerVersions, MetadataEntry,
    NavigatorLayer,
};
use crate::domain::model::{FoundIdentifiers, ParseMode, SourceInfo};

pub const DEFAULT_LAYER_NAME: &str = "TTP Analysis";
pub const NAVIGATOR_VERSION: &str = "4.9.1";
pub const LAYER_FORMAT_VERSION: &str = "4.5";

const PLATFORMS: [&str; 12] = [
    "Linux",
    "macOS",
    "Windows",
    "Azure AD",
    "Office 365",
    "SaaS",
    "IaaS",
    "Google Workspace",
    "PRE",
    "Network",
    "Containers",
    "Cloud",
];

#[derive(Debug, Clone)]
pub struct LayerBuilder {
    attack_version: String,
}

impl Default for LayerBuilder {
    fn default() -> Self {
        Self::new(17)
    }
}

impl LayerBuilder {
    pub fn new(attack_version: u32) -> Self {
        Self {
            attack_version: attack_version.to_string(),
        }
    }

    /// 分數不檢查範圍，任何整數都照寫
    pub fn build(
        &self,
        found: &FoundIdentifiers,
        score: i64,
        source: Option<&SourceInfo>,
    ) -> NavigatorLayer {
        let name = source
            .and_then(|s| s.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_LAYER_NAME.to_string());
        let url = source.and_then(|s| s.url.clone());

        let mut metadata = Vec::new();
        if let Some(url) = &url {
            metadata.push(MetadataEntry {
                name: "Source".to_string(),
                value: url.clone(),
            });
        }
        if let Some(html) = source.and_then(|s| s.html_mode_used) {
            let mode = if html { ParseMode::Html } else { ParseMode::Text };
            metadata.push(MetadataEntry {
                name: "Parsing Mode".to_string(),
                value: mode.label().to_string(),
            });
        }
        if !found.tactics.is_empty() {
            // BTreeSet 已排序
            let tactics: Vec<&str> = found.tactics.iter().map(String::as_str).collect();
            metadata.push(MetadataEntry {
                name: "Related Tactics".to_string(),
                value: tactics.join(", "),
            });
        }

        let techniques = found
            .techniques
            .iter()
            .map(|id| LayerTechnique {
                technique_id: id.clone(),
                score,
                color: String::new(),
                comment: String::new(),
                enabled: true,
                metadata: Vec::new(),
                links: Vec::new(),
                show_subtechniques: true,
            })
            .collect();

        NavigatorLayer {
            name,
            versions: LayerVersions {
                attack: self.attack_version.clone(),
                navigator: NAVIGATOR_VERSION.to_string(),
                layer: LAYER_FORMAT_VERSION.to_string(),
            },
            domain: "enterprise-attack".to_string(),
            description: "TTPs extracted from threat intelligence".to_string(),
            filters: LayerFilters {
                platforms: PLATFORMS.iter().map(|p| p.to_string()).collect(),
            },
            sorting: 0,
            layout: LayerLayout {
                layout: "side".to_string(),
                aggregate_function: "average".to_string(),
                show_id: true,
                show_name: true,
                show_aggregate_scores: true,
                count_unscored: false,
            },
            hide_disabled: false,
            techniques,
            gradient: Gradient {
                colors: vec!["#ffffff".to_string(), "#ff6666".to_string()],
                min_value: 0,
                max_value: 100,
            },
            legend_items: Vec::new(),
            metadata,
            show_tactic_row_background: false,
            tactic_row_background: "#dddddd".to_string(),
            select_techniques_across_tactics: true,
            select_subtechniques_with_parent: false,
            links: url.map(|url| {
                vec![LayerLink {
                    label: "Source Report".to_string(),
                    url,
                }]
            }),
        }
    }
}
