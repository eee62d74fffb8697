use crate::core::Pipeline;
use crate::domain::model::{MatchedItem, RunSummary, TransformResult};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// 依序執行 extract → transform → load，任何一步失敗就不寫檔
    pub async fn run(&self) -> Result<RunSummary> {
        tracing::debug!("Starting TTP extraction run");

        let extraction = self.pipeline.extract().await?;
        let result = self.pipeline.transform(extraction).await?;
        let (techniques, tactics) = matched_items(&result);
        let html_mode_used = result.source.html_mode_used;

        let output_path = self.pipeline.load(result).await?;

        Ok(RunSummary {
            output_path,
            techniques,
            tactics,
            html_mode_used,
        })
    }
}

fn matched_items(result: &TransformResult) -> (Vec<MatchedItem>, Vec<MatchedItem>) {
    let techniques = result
        .found
        .techniques
        .iter()
        .map(|id| MatchedItem {
            id: id.clone(),
            name: result.catalog.technique_name(id).unwrap_or("Unknown").to_string(),
        })
        .collect();
    let tactics = result
        .found
        .tactics
        .iter()
        .map(|id| MatchedItem {
            id: id.clone(),
            name: result.catalog.tactic_name(id).unwrap_or("Unknown").to_string(),
        })
        .collect();
    (techniques, tactics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layer::LayerBuilder;
    use crate::core::scanner::tests::sample_catalog;
    use crate::domain::model::{Catalog, Extraction, FoundIdentifiers, RawContent, SourceInfo};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        fail_transform: bool,
        loaded: AtomicBool,
    }

    #[async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Extraction> {
            Ok(Extraction {
                catalog: sample_catalog(),
                content: RawContent::Text {
                    title: "stub".to_string(),
                    body: String::new(),
                },
            })
        }

        async fn transform(&self, data: Extraction) -> Result<TransformResult> {
            if self.fail_transform {
                return Err(EtlError::ConfigError {
                    message: "boom".to_string(),
                });
            }
            let mut found = FoundIdentifiers::default();
            found.techniques.insert("T1566".to_string());
            found.techniques.insert("T1059".to_string());
            found.tactics.insert("TA0001".to_string());
            Ok(TransformResult {
                layer: LayerBuilder::default().build(&found, 100, None),
                found,
                catalog: data.catalog,
                source: SourceInfo {
                    html_mode_used: Some(false),
                    ..SourceInfo::default()
                },
            })
        }

        async fn load(&self, _result: TransformResult) -> Result<String> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok("out.json".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_summarizes_sorted_matches() {
        let engine = EtlEngine::new(StubPipeline {
            fail_transform: false,
            loaded: AtomicBool::new(false),
        });

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.output_path, "out.json");
        let ids: Vec<&str> = summary.techniques.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1059", "T1566"]);
        assert_eq!(summary.techniques[1].name, "Phishing");
        assert_eq!(summary.tactics[0].name, "Initial Access");
        assert_eq!(summary.html_mode_used, Some(false));
    }

    #[tokio::test]
    async fn test_failed_transform_skips_load() {
        let pipeline = StubPipeline {
            fail_transform: true,
            loaded: AtomicBool::new(false),
        };
        let engine = EtlEngine::new(pipeline);

        assert!(engine.run().await.is_err());
        assert!(!engine.pipeline.loaded.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let mut found = FoundIdentifiers::default();
        found.techniques.insert("T0000".to_string());
        let result = TransformResult {
            layer: LayerBuilder::default().build(&found, 1, None),
            found,
            catalog: Catalog::default(),
            source: SourceInfo::default(),
        };

        let (techniques, tactics) = matched_items(&result);
        assert_eq!(techniques[0].name, "Unknown");
        assert!(tactics.is_empty());
    }
}
