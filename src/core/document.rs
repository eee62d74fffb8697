//! HTML → `HtmlDocument` conversion and visible-text normalization.

use crate::domain::model::{HtmlDocument, Link};
use scraper::{Html, Node, Selector};
use std::sync::LazyLock;

pub const DEFAULT_PAGE_TITLE: &str = "Threat Intelligence Report";

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector is valid"));

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));

const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

/// 解析 HTML，取出標題、連結與可見文字
pub fn parse_html(body: &str) -> HtmlDocument {
    let html = Html::parse_document(body);

    let title = html
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let links = html
        .select(&LINK_SELECTOR)
        .filter_map(|a| {
            a.value().attr("href").map(|href| Link {
                href: href.to_string(),
                text: a.text().collect::<Vec<_>>().join(" ").trim().to_string(),
            })
        })
        .collect();

    HtmlDocument {
        title,
        links,
        visible_text: normalize_whitespace(&raw_visible_text(&html)),
    }
}

fn raw_visible_text(html: &Html) -> String {
    let mut pieces = Vec::new();
    for node in html.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            pieces.push(&**text);
        }
    }
    pieces.join(" ")
}

/// 去掉每行首尾空白，以雙空白切段，再用單一空白接起來
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
