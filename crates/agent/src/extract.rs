use scraper::{ElementRef, Html, Node, Selector};

use curabot_core::{normalize_whitespace, truncate_content, ArticleContent};

const SKIPPED_ELEMENTS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];
const CONTENT_SELECTORS: [&str; 5] = ["article", "main", ".post-content", ".entry-content", "body"];
const FALLBACK_TITLE: &str = "Article";

/// Pulls a title and readable text out of an HTML document.
///
/// The returned content is whitespace-normalized and capped; it may be empty when the page has
/// no visible text.
pub fn extract_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);
    let title = extract_title(&document);
    let content = CONTENT_SELECTORS
        .iter()
        .map(|css| normalize_whitespace(&selected_text(&document, css)))
        .find(|text| !text.is_empty())
        .unwrap_or_default();

    ArticleContent::new(title, truncate_content(&content))
}

fn extract_title(document: &Html) -> String {
    if let Some(heading) = visible_matches(document, "h1").next() {
        let text = normalize_whitespace(&visible_text(heading));
        if !text.is_empty() {
            return text;
        }
    }

    let title = normalize_whitespace(&selected_text(document, "title"));
    if !title.is_empty() {
        return title;
    }

    visible_matches(document, r#"meta[property="og:title"]"#)
        .filter_map(|meta| meta.value().attr("content"))
        .map(normalize_whitespace)
        .find(|content| !content.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_owned())
}

fn selected_text(document: &Html, css: &str) -> String {
    let mut text = String::new();
    for element in visible_matches(document, css) {
        collect_text(element, &mut text);
        text.push(' ');
    }
    text
}

fn visible_matches<'a>(document: &'a Html, css: &str) -> impl Iterator<Item = ElementRef<'a>> {
    let selector = Selector::parse(css).ok();
    let matches: Vec<ElementRef<'a>> = match &selector {
        Some(selector) => document.select(selector).filter(|element| !is_skipped(*element)).collect(),
        None => Vec::new(),
    };
    matches.into_iter()
}

fn is_skipped(element: ElementRef<'_>) -> bool {
    SKIPPED_ELEMENTS.contains(&element.value().name())
        || element.ancestors().any(|node| {
            node.value().as_element().is_some_and(|parent| SKIPPED_ELEMENTS.contains(&parent.name()))
        })
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    text
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
            }
            Node::Element(inner) if SKIPPED_ELEMENTS.contains(&inner.name()) => {}
            Node::Element(_) => {
                if let Some(inner) = ElementRef::wrap(child) {
                    collect_text(inner, out);
                    // block boundaries would otherwise glue words together
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
