pub mod toml_config;

use crate::adapters::http::BROWSER_USER_AGENT;
use crate::core::catalog::{catalog_url, DEFAULT_CATALOG_URL_TEMPLATE};
use crate::core::mode::DEFAULT_HTML_SITES;
use crate::core::ConfigProvider;
use crate::domain::model::ContentSource;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use clap::{ArgGroup, Parser};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_OUTPUT_PATH: &str = "attack_navigator_layer.json";
pub const DEFAULT_SCORE: i64 = 100;
pub const DEFAULT_ATTACK_VERSION: u32 = 17;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Parser)]
#[command(name = "ttp-etl")]
#[command(
    about = "Extract MITRE ATT&CK TTPs from threat intelligence and create an ATT&CK Navigator layer"
)]
#[command(group(ArgGroup::new("source").required(true).args(["url", "file", "text"])))]
pub struct CliConfig {
    /// URL of the threat intelligence blog/post
    #[arg(long)]
    pub url: Option<String>,

    /// Local file containing threat intelligence
    #[arg(long)]
    pub file: Option<String>,

    /// Direct text input containing threat intelligence
    #[arg(long)]
    pub text: Option<String>,

    /// Score to assign to found techniques (default: 100)
    #[arg(long, allow_negative_numbers = true)]
    pub score: Option<i64>,

    /// Custom title for the Navigator layer (overrides automatic title)
    #[arg(long)]
    pub title: Option<String>,

    /// Output file name (default: attack_navigator_layer.json)
    #[arg(long)]
    pub output: Option<String>,

    /// MITRE ATT&CK version to use (default: 17)
    #[arg(long)]
    pub attack_version: Option<u32>,

    /// Force hyperlink-based (HTML) parsing
    #[arg(long, conflicts_with = "force_text")]
    pub force_html: bool,

    /// Force plain-text parsing
    #[arg(long)]
    pub force_text: bool,

    /// Optional TOML configuration file
    #[arg(long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn content_source(&self) -> Result<ContentSource> {
        match (&self.url, &self.file, &self.text) {
            (Some(url), None, None) => Ok(ContentSource::Url(url.clone())),
            (None, Some(path), None) => Ok(ContentSource::File(path.clone())),
            (None, None, Some(text)) => Ok(ContentSource::Text(text.clone())),
            (None, None, None) => Err(EtlError::MissingConfigError {
                field: "--url, --file or --text".to_string(),
            }),
            _ => Err(EtlError::ConflictingOptions {
                message: "--url, --file and --text are mutually exclusive".to_string(),
            }),
        }
    }
}

/// 合併命令列、設定檔與預設值後的執行設定
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: ContentSource,
    pub score: i64,
    pub title: Option<String>,
    pub output_path: String,
    pub attack_version: u32,
    pub catalog_url_template: String,
    pub force_html: bool,
    pub force_text: bool,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub html_sites: Vec<String>,
}

impl Settings {
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                let config = TomlConfig::from_file(path)?;
                config.validate()?;
                Some(config)
            }
            None => None,
        };
        Self::resolve(cli, file.as_ref())
    }

    pub fn resolve(cli: &CliConfig, file: Option<&TomlConfig>) -> Result<Self> {
        let file = file.cloned().unwrap_or_default();

        Ok(Self {
            source: cli.content_source()?,
            score: cli.score.or(file.output.score).unwrap_or(DEFAULT_SCORE),
            title: cli.title.clone(),
            output_path: cli
                .output
                .clone()
                .or(file.output.path)
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string()),
            attack_version: cli
                .attack_version
                .or(file.catalog.version)
                .unwrap_or(DEFAULT_ATTACK_VERSION),
            catalog_url_template: file
                .catalog
                .url_template
                .unwrap_or_else(|| DEFAULT_CATALOG_URL_TEMPLATE.to_string()),
            force_html: cli.force_html,
            force_text: cli.force_text,
            timeout_seconds: file.fetch.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            user_agent: file
                .fetch
                .user_agent
                .unwrap_or_else(|| BROWSER_USER_AGENT.to_string()),
            html_sites: file
                .parsing
                .html_sites
                .unwrap_or_else(|| DEFAULT_HTML_SITES.iter().map(|s| s.to_string()).collect()),
        })
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        if self.force_html && self.force_text {
            return Err(EtlError::ConflictingOptions {
                message: "--force-html and --force-text cannot be used together".to_string(),
            });
        }

        match &self.source {
            ContentSource::Url(url) => validation::validate_url("--url", url)?,
            ContentSource::File(path) => validation::validate_path("--file", path)?,
            ContentSource::Text(_) => {}
        }

        validation::validate_path("--output", &self.output_path)?;
        validation::validate_url_template("catalog.url_template", &self.catalog_url_template)?;
        validation::validate_positive_number("fetch.timeout_seconds", self.timeout_seconds, 1)?;
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn content_source(&self) -> &ContentSource {
        &self.source
    }

    fn score(&self) -> i64 {
        self.score
    }

    fn title_override(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn attack_version(&self) -> u32 {
        self.attack_version
    }

    fn catalog_url(&self) -> String {
        catalog_url(&self.catalog_url_template, self.attack_version)
    }

    fn force_html(&self) -> bool {
        self.force_html
    }

    fn force_text(&self) -> bool {
        self.force_text
    }

    fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn html_sites(&self) -> &[String] {
        &self.html_sites
    }
}
