//! Catalog loader: turns the STIX bundle into technique/tactic lookup tables.

use crate::domain::model::{Catalog, KillChainPhase, TacticEntry, TechniqueEntry};
use crate::utils::error::{EtlError, Result};
use serde::Deserialize;

/// 權威命名空間，只收這個來源的 external_id
pub const AUTHORITATIVE_SOURCE: &str = "mitre-attack";

pub const DEFAULT_CATALOG_URL_TEMPLATE: &str =
    "https://raw.githubusercontent.com/mitre/cti/ATT%26CK-v{version}.0/enterprise-attack/enterprise-attack.json";

const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct Bundle {
    #[serde(default)]
    objects: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StixRecord {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    #[serde(default)]
    external_references: Vec<ExternalReference>,
    #[serde(default)]
    kill_chain_phases: Vec<KillChainPhase>,
}

#[derive(Debug, Deserialize)]
struct ExternalReference {
    source_name: Option<String>,
    external_id: Option<String>,
}

impl StixRecord {
    fn authoritative_id(&self) -> Option<&str> {
        self.external_references
            .iter()
            .find(|r| r.source_name.as_deref() == Some(AUTHORITATIVE_SOURCE))
            .and_then(|r| r.external_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }
}

pub fn catalog_url(template: &str, version: u32) -> String {
    template.replace("{version}", &version.to_string())
}

/// 解析目錄 JSON 文字；只有整份文件不是 JSON 時才回傳錯誤
pub fn parse_catalog_json(url: &str, body: &str) -> Result<Catalog> {
    let bundle: Bundle = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(100).collect();
        EtlError::CatalogParseError {
            url: url.to_string(),
            message: format!("{} (response starts with: {:?})", e, preview),
        }
    })?;

    Ok(build_catalog(bundle.objects))
}

pub fn build_catalog(objects: Vec<serde_json::Value>) -> Catalog {
    let mut catalog = Catalog::default();
    let mut skipped = 0usize;

    for object in objects {
        let record: StixRecord = match serde_json::from_value(object) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping malformed catalog record: {}", e);
                skipped += 1;
                continue;
            }
        };

        match record.kind.as_str() {
            "attack-pattern" => {
                let Some(id) = record.authoritative_id() else {
                    skipped += 1;
                    continue;
                };
                let entry = TechniqueEntry {
                    name: record.display_name(),
                    kill_chain_phases: record.kill_chain_phases.clone(),
                };
                catalog.techniques.insert(id.to_string(), entry);
            }
            "x-mitre-tactic" => {
                let Some(id) = record.authoritative_id() else {
                    skipped += 1;
                    continue;
                };
                catalog.tactics.insert(
                    id.to_string(),
                    TacticEntry {
                        name: record.display_name(),
                    },
                );
            }
            _ => {}
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} catalog records without a usable ATT&CK ID", skipped);
    }

    catalog
}
