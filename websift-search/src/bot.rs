//! Bot-detection signatures shared by provider adapters and page extraction.

use crate::content::clean::page_text;

/// Status codes that mean the client was refused rather than the page missing.
pub const BLOCKING_STATUSES: &[u16] = &[401, 403, 429, 503];

/// Lowercase phrases shown on challenge and block pages.
const TEXT_MARKERS: &[&str] = &[
    "captcha",
    "unusual traffic",
    "are you a robot",
    "are you a human",
    "verify you are human",
    "checking your browser before accessing",
    "security of your connection",
    "access denied",
    "request blocked",
];

/// Block pages say little. Pages with more visible text than this are real
/// content even when they mention a captcha.
const BLOCK_PAGE_TEXT_LIMIT: usize = 1_000;

/// Markup beyond this size is not parsed for markers.
const MARKER_SCAN_LIMIT: usize = 512 * 1024;

/// Describe the bot-detection signature in a response, if any.
///
/// Markers are looked for in the visible text only, so a page that merely
/// loads a captcha widget script is not flagged.
pub fn bot_signature(status: u16, html: &str) -> Option<String> {
    if BLOCKING_STATUSES.contains(&status) {
        return Some(format!("HTTP {status}"));
    }
    if html.len() > MARKER_SCAN_LIMIT {
        return None;
    }
    challenge_in_text(&page_text(html))
}

fn challenge_in_text(text: &str) -> Option<String> {
    if text.chars().count() > BLOCK_PAGE_TEXT_LIMIT {
        return None;
    }
    let lower = text.to_lowercase();
    TEXT_MARKERS
        .iter()
        .find(|marker| lower.contains(*marker))
        .map(|marker| format!("page contains \"{marker}\""))
}
