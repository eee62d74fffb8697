//! Hyperlink scanner: pulls technique/tactic IDs out of ATT&CK links.

use crate::core::scanner::{scan_text, TACTIC_PATTERN, TECHNIQUE_PATTERN};
use crate::domain::model::{Catalog, FoundIdentifiers, Link};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const ATTACK_DOMAIN: &str = "attack.mitre.org";

const TECHNIQUE_SEGMENT: &str = "/techniques/";
const TACTIC_SEGMENT: &str = "/tactics/";

// 站上子技術的路徑是 /techniques/T1566/001，也接受 T1566.001
static TECHNIQUE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(T\d{4})(?:[./](\d{3}))?").expect("technique path pattern is valid")
});

static TACTIC_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(TA\d{4})").expect("tactic path pattern is valid"));

pub fn is_attack_link(href: &str) -> bool {
    href.contains(ATTACK_DOMAIN)
}

fn path_remainder<'a>(href: &'a str, segment: &str) -> Option<&'a str> {
    href.find(segment).map(|idx| &href[idx + segment.len()..])
}

/// 從 href 路徑取出技術 ID（不檢查目錄）
pub fn technique_id_from_href(href: &str) -> Option<String> {
    let rest = path_remainder(href, TECHNIQUE_SEGMENT)?;
    let caps = TECHNIQUE_PATH.captures(rest)?;
    Some(match caps.get(2) {
        Some(sub) => format!("{}.{}", &caps[1], sub.as_str()),
        None => caps[1].to_string(),
    })
}

pub fn tactic_id_from_href(href: &str) -> Option<String> {
    let rest = path_remainder(href, TACTIC_SEGMENT)?;
    TACTIC_PATH.captures(rest).map(|caps| caps[1].to_string())
}

/// 任何網域的 /techniques/ 路徑中、且在目錄裡的技術 ID（不看連結文字）
pub fn path_technique_ids(links: &[Link], catalog: &Catalog) -> BTreeSet<String> {
    links
        .iter()
        .filter_map(|l| technique_id_from_href(&l.href))
        .filter(|id| catalog.has_technique(id))
        .collect()
}

fn first_match(pattern: &Regex, text: &str) -> Option<String> {
    pattern.find(text).map(|m| m.as_str().to_string())
}

pub fn scan_links(links: &[Link], catalog: &Catalog) -> FoundIdentifiers {
    let mut found = FoundIdentifiers::default();

    for link in links.iter().filter(|l| is_attack_link(&l.href)) {
        if link.href.contains(TECHNIQUE_SEGMENT) {
            let id = technique_id_from_href(&link.href)
                .or_else(|| first_match(&TECHNIQUE_PATTERN, &link.text));
            if let Some(id) = id.filter(|id| catalog.has_technique(id)) {
                tracing::debug!("Technique {} from link {}", id, link.href);
                found.techniques.insert(id);
            }
        }

        if link.href.contains(TACTIC_SEGMENT) {
            let id = tactic_id_from_href(&link.href)
                .or_else(|| first_match(&TACTIC_PATTERN, &link.text));
            if let Some(id) = id.filter(|id| catalog.has_tactic(id)) {
                tracing::debug!("Tactic {} from link {}", id, link.href);
                found.tactics.insert(id);
            }
        }
    }

    found
}

/// 連結結果再併上全文掃描，連結只是補強
pub fn scan_hyperlinked(links: &[Link], visible_text: &str, catalog: &Catalog) -> FoundIdentifiers {
    scan_links(links, catalog).union(scan_text(visible_text, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::tests::sample_catalog;

    fn link(href: &str, text: &str) -> Link {
        Link {
            href: href.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_technique_id_from_href_layouts() {
        assert_eq!(
            technique_id_from_href("https://attack.mitre.org/techniques/T1566/001/").as_deref(),
            Some("T1566.001")
        );
        assert_eq!(
            technique_id_from_href("https://attack.mitre.org/techniques/T1566.001").as_deref(),
            Some("T1566.001")
        );
        assert_eq!(
            technique_id_from_href("https://attack.mitre.org/techniques/T1059/").as_deref(),
            Some("T1059")
        );
        assert_eq!(
            technique_id_from_href("https://attack.mitre.org/techniques/enterprise/"),
            None
        );
    }

    #[test]
    fn test_tactic_id_from_href() {
        assert_eq!(
            tactic_id_from_href("https://attack.mitre.org/tactics/TA0001/").as_deref(),
            Some("TA0001")
        );
        assert_eq!(tactic_id_from_href("https://attack.mitre.org/tactics/enterprise/"), None);
    }

    #[test]
    fn test_path_id_wins_over_link_text() {
        let catalog = sample_catalog();
        let links = vec![link(
            "https://attack.mitre.org/techniques/T1566.001",
            "Something else T1059",
        )];

        let found = scan_links(&links, &catalog);
        assert!(found.techniques.contains("T1566.001"));
        assert!(!found.techniques.contains("T1059"));
    }

    #[test]
    fn test_link_text_fallback_when_path_has_no_id() {
        let catalog = sample_catalog();
        let links = vec![
            link("https://attack.mitre.org/techniques/enterprise/", "T1071 Application Layer Protocol"),
            link("https://attack.mitre.org/tactics/enterprise/", "Execution (TA0002)"),
        ];

        let found = scan_links(&links, &catalog);
        assert!(found.techniques.contains("T1071"));
        assert!(found.tactics.contains("TA0002"));
    }

    #[test]
    fn test_non_attack_links_are_ignored() {
        let catalog = sample_catalog();
        let links = vec![link("https://example.com/techniques/T1566/", "T1566")];

        let found = scan_links(&links, &catalog);
        assert!(found.is_empty());
    }

    #[test]
    fn test_unknown_path_id_is_dropped() {
        let catalog = sample_catalog();
        let links = vec![link("https://attack.mitre.org/techniques/T9999/", "T1059")];

        let found = scan_links(&links, &catalog);
        assert!(found.techniques.is_empty());
    }

    #[test]
    fn test_path_technique_ids_any_domain_ignores_text() {
        let catalog = sample_catalog();
        let links = vec![
            link("https://mirror.example.org/techniques/T1566/001/", "x"),
            link("https://attack.mitre.org/techniques/T9999/", "T1059"),
            link("https://example.com/a", "T1071"),
        ];

        let ids = path_technique_ids(&links, &catalog);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["T1566.001"]);
    }

    #[test]
    fn test_scan_hyperlinked_unions_text_scan() {
        let catalog = sample_catalog();
        let links = vec![link("https://attack.mitre.org/techniques/T1566/001/", "Spearphishing")];

        let found = scan_hyperlinked(&links, "Later stages used T1059 under TA0002.", &catalog);
        assert!(found.techniques.contains("T1566.001"));
        assert!(found.techniques.contains("T1059"));
        assert!(found.tactics.contains("TA0002"));
    }
}
