//! ATT&CK Navigator layer document (layer format 4.5).
//!
//! Field names follow the Navigator JSON schema, hence the camelCase renames.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorLayer {
    pub name: String,
    pub versions: LayerVersions,
    pub domain: String,
    pub description: String,
    pub filters: LayerFilters,
    pub sorting: u8,
    pub layout: LayerLayout,
    pub hide_disabled: bool,
    pub techniques: Vec<LayerTechnique>,
    pub gradient: Gradient,
    pub legend_items: Vec<serde_json::Value>,
    pub metadata: Vec<MetadataEntry>,
    pub show_tactic_row_background: bool,
    pub tactic_row_background: String,
    pub select_techniques_across_tactics: bool,
    pub select_subtechniques_with_parent: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub links: Option<Vec<LayerLink>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerVersions {
    pub attack: String,
    pub navigator: String,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFilters {
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerLayout {
    pub layout: String,
    pub aggregate_function: String,
    #[serde(rename = "showID")]
    pub show_id: bool,
    pub show_name: bool,
    pub show_aggregate_scores: bool,
    pub count_unscored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerTechnique {
    #[serde(rename = "techniqueID")]
    pub technique_id: String,
    pub score: i64,
    pub color: String,
    pub comment: String,
    pub enabled: bool,
    pub metadata: Vec<MetadataEntry>,
    pub links: Vec<LayerLink>,
    pub show_subtechniques: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    pub colors: Vec<String>,
    pub min_value: i64,
    pub max_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerLink {
    pub label: String,
    pub url: String,
}
