//! Markup cleaning: strips boilerplate and returns readable text.
//!
//! The document tree is walked once, skipping elements that never carry
//! main content (scripts, navigation, ads, cookie banners). The main
//! content area (`article`, `main`, `[role="main"]`) is preferred over the
//! whole body when it yields any text.

use scraper::{ElementRef, Html, Selector};

/// Marker appended to truncated text.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated]";

/// Elements dropped together with everything inside them.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe", "form",
    "template", "button", "select",
];

/// Class or id fragments marking ads, banners and consent dialogs.
const BOILERPLATE_MARKERS: &[&str] = &[
    "advert",
    "sponsor",
    "cookie",
    "consent",
    "banner",
    "popup",
    "newsletter",
    "promo",
];

/// Elements that never render as text.
const NON_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Elements that start a new line in the extracted text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4",
    "h5", "h6", "pre", "blockquote", "table", "tr", "dt", "dd", "figcaption",
];

const CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Extract readable text from `html`.
///
/// Returns an empty string when the page has no text outside boilerplate.
pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);

    for css in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = normalise_whitespace(&visible_text(element, is_boilerplate));
            if !text.is_empty() {
                return text;
            }
        }
    }

    normalise_whitespace(&visible_text(document.root_element(), is_boilerplate))
}

/// Everything a visitor would see on the page, title included, with only
/// scripts, styles and hidden elements removed. Unlike [`clean_html`] this
/// keeps forms, buttons and banners, where challenge pages put their text.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    normalise_whitespace(&visible_text(document.root_element(), is_non_text))
}

enum Walk<'a> {
    Enter(ElementRef<'a>),
    Text(&'a str),
    Break,
}

/// Text of `root` and its descendants, skipping subtrees for which `skip`
/// holds. Iterative so deeply nested markup cannot exhaust the stack.
fn visible_text(root: ElementRef<'_>, skip: fn(ElementRef<'_>) -> bool) -> String {
    let mut out = String::new();
    let mut stack = vec![Walk::Enter(root)];

    while let Some(item) = stack.pop() {
        match item {
            Walk::Text(text) => {
                // Newlines inside text nodes are ordinary whitespace.
                out.extend(text.chars().map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c }));
            }
            Walk::Break => out.push('\n'),
            Walk::Enter(element) => {
                if skip(element) {
                    continue;
                }
                if BLOCK_TAGS.contains(&element.value().name()) {
                    out.push('\n');
                    stack.push(Walk::Break);
                }
                for child in element.children().rev() {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        stack.push(Walk::Enter(child_element));
                    } else if let Some(text) = child.value().as_text() {
                        stack.push(Walk::Text(text));
                    }
                }
            }
        }
    }

    out
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true")
}

fn is_non_text(element: ElementRef<'_>) -> bool {
    NON_TEXT_TAGS.contains(&element.value().name()) || is_hidden(element)
}

fn is_boilerplate(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if SKIPPED_TAGS.contains(&value.name()) || is_hidden(element) {
        return true;
    }

    let id = value.attr("id").map(str::to_ascii_lowercase);
    value
        .classes()
        .map(str::to_ascii_lowercase)
        .chain(id)
        .any(|token| {
            token == "ad"
                || token == "ads"
                || token.starts_with("ad-")
                || token.starts_with("ads-")
                || BOILERPLATE_MARKERS.iter().any(|m| token.contains(m))
        })
}

/// Collapse runs of spaces to one and runs of blank lines to one blank line.
fn normalise_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 1 { "\n\n" } else { "\n" });
        }
        out.push_str(&line);
        blank_run = 0;
    }

    out
}

/// Truncate to `max_chars` characters and append [`TRUNCATION_MARKER`].
/// A limit of 0 leaves the text untouched.
pub fn truncate_chars(text: String, max_chars: usize) -> String {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => {
            let mut truncated = text[..end].to_owned();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text,
    }
}
