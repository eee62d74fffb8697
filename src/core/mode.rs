//! Parsing-mode selection for fetched pages.
//!
//! Rules are evaluated in order and the first affirmative one decides; the
//! matched rule is returned alongside the boolean so callers can log it.

use crate::core::hyperlink::{is_attack_link, path_technique_ids, scan_hyperlinked};
use crate::core::scanner::scan_text;
use crate::domain::model::{Catalog, FoundIdentifiers, HtmlDocument, ParseMode};

pub const DEFAULT_HTML_SITES: [&str; 4] = [
    "thedfirreport.com",
    "unit42.paloaltonetworks.com",
    "securelist.com",
    "blog.talosintelligence.com",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeReason {
    Forced(ParseMode),
    KnownSite(String),
    AttackLinks(usize),
    LinkDensity { link_ids: usize, text_ids: usize },
    TextDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDecision {
    pub html_mode: bool,
    pub reason: ModeReason,
}

impl ModeDecision {
    pub fn forced(mode: ParseMode) -> Self {
        Self {
            html_mode: mode == ParseMode::Html,
            reason: ModeReason::Forced(mode),
        }
    }

    pub fn mode(&self) -> ParseMode {
        if self.html_mode {
            ParseMode::Html
        } else {
            ParseMode::Text
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModeSelector {
    html_sites: Vec<String>,
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self::new(DEFAULT_HTML_SITES.iter().map(|s| s.to_string()).collect())
    }
}

/// 單一頁面的分析結果
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    pub text: String,
    pub title: Option<String>,
    pub found: FoundIdentifiers,
    pub decision: ModeDecision,
}

impl ModeSelector {
    pub fn new(html_sites: Vec<String>) -> Self {
        Self {
            html_sites: html_sites.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    fn host_is_known(&self, url: Option<&str>) -> Option<String> {
        let host = url
            .and_then(|u| url::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_lowercase))?;
        self.html_sites
            .iter()
            .any(|site| host == *site || host.ends_with(&format!(".{}", site)))
            .then_some(host)
    }

    pub fn decide(&self, url: Option<&str>, doc: &HtmlDocument, catalog: &Catalog) -> ModeDecision {
        if let Some(host) = self.host_is_known(url) {
            return ModeDecision {
                html_mode: true,
                reason: ModeReason::KnownSite(host),
            };
        }

        let attack_links = doc.links.iter().filter(|l| is_attack_link(&l.href)).count();
        if attack_links > 0 {
            return ModeDecision {
                html_mode: true,
                reason: ModeReason::AttackLinks(attack_links),
            };
        }

        // 只看 href 路徑，不用連結文字
        let link_ids = path_technique_ids(&doc.links, catalog);
        let text_ids = scan_text(&doc.visible_text, catalog).techniques.len();
        if link_ids.len() > text_ids {
            return ModeDecision {
                html_mode: true,
                reason: ModeReason::LinkDensity {
                    link_ids: link_ids.len(),
                    text_ids,
                },
            };
        }

        ModeDecision {
            html_mode: false,
            reason: ModeReason::TextDefault,
        }
    }

    /// 決定模式後執行對應的掃描
    pub fn analyze(
        &self,
        url: Option<&str>,
        doc: &HtmlDocument,
        catalog: &Catalog,
        forced: Option<ParseMode>,
    ) -> PageAnalysis {
        let decision = match forced {
            Some(mode) => ModeDecision::forced(mode),
            None => self.decide(url, doc, catalog),
        };
        tracing::debug!("Parsing mode decision: {:?}", decision);

        let found = if decision.html_mode {
            let mut found = scan_hyperlinked(&doc.links, &doc.visible_text, catalog);
            // 由連結密度判定時，觸發判定的路徑 ID 也要算進去
            if matches!(decision.reason, ModeReason::LinkDensity { .. }) {
                found
                    .techniques
                    .extend(path_technique_ids(&doc.links, catalog));
            }
            found
        } else {
            scan_text(&doc.visible_text, catalog)
        };

        PageAnalysis {
            text: doc.visible_text.clone(),
            title: doc.title.clone(),
            found,
            decision,
        }
    }
}
