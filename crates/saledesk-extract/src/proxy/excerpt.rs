//! HTML reduction before handing a page to the field extractor.
//!
//! Rendered retail pages routinely run to megabytes. Only the regions most
//! likely to carry offer fields are kept, in priority order, up to a fixed
//! character budget.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::url::absolutize_url;

/// Character budget for the excerpt sent to the model.
pub const MAX_EXCERPT_CHARS: usize = 50_000;

/// Bytes of markup kept after an opening tag that matched a slice pattern.
const ELEMENT_WINDOW: usize = 400;

static PRICE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<[a-z][a-z0-9]*\b[^>]*(?:class|id|data-[a-z0-9-]+|itemprop)\s*=\s*["'][^"']*(?:price|sale|was|compare|original|strike|discount)[^"']*["'][^>]*>"#)
        .expect("valid price tag regex")
});
static STRUCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(s|del|strike)\b[^>]*>.*?</(?:s|del|strike)>").expect("valid struck regex")
});
static PRODUCT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<[a-z][a-z0-9]*\b[^>]*(?:class|id|data-[a-z0-9-]+|itemprop)\s*=\s*["'][^"']*(?:product|brand|designer)[^"']*["'][^>]*>"#)
        .expect("valid product tag regex")
});
static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>.*?</script>"#)
        .expect("valid json-ld script regex")
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[12]\b[^>]*>.*?</h[12]>").expect("valid heading regex"));
static TEST_ID_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<[a-z][a-z0-9]*\b[^>]*(?:data-testid|data-test|data-qa|data-automation-id|data-auto-id)\s*=\s*["'][^"']+["'][^>]*>"#)
        .expect("valid test-id regex")
});
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b([a-z:_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attr regex")
});

/// Builds the model excerpt for `html`.
///
/// Slices are collected in this order, each deduplicated by byte range:
/// price-bearing elements, struck-through elements, product-bearing elements,
/// JSON-LD blocks, `h1`/`h2` headings, then test-id/data attributes. If nothing
/// matches, the head of the raw document is used instead. Both paths are
/// capped at `max_chars` characters.
#[must_use]
pub fn build_excerpt(html: &str, max_chars: usize) -> String {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut slices: Vec<&str> = Vec::new();

    let mut push = |start: usize, end: usize| {
        if seen.insert((start, end)) {
            slices.push(&html[start..end]);
        }
    };

    for m in PRICE_TAG_RE.find_iter(html) {
        let (start, end) = window(html, m.start(), m.end());
        push(start, end);
    }
    for m in STRUCK_RE.find_iter(html) {
        push(m.start(), m.end());
    }
    for m in PRODUCT_TAG_RE.find_iter(html) {
        let (start, end) = window(html, m.start(), m.end());
        push(start, end);
    }
    for m in JSON_LD_RE.find_iter(html) {
        push(m.start(), m.end());
    }
    for m in HEADING_RE.find_iter(html) {
        push(m.start(), m.end());
    }
    for m in TEST_ID_TAG_RE.find_iter(html) {
        let (start, end) = window(html, m.start(), m.end());
        push(start, end);
    }

    if slices.is_empty() {
        return html.chars().take(max_chars).collect();
    }

    let mut out = String::new();
    let mut used = 0usize;
    for slice in slices {
        let remaining = max_chars.saturating_sub(used);
        if remaining == 0 {
            break;
        }
        let taken: String = slice.chars().take(remaining).collect();
        used += taken.chars().count() + 1;
        out.push_str(&taken);
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}

/// Returns the `og:image` (or `twitter:image`) URL, resolved against
/// `page_url`, when the page declares one.
#[must_use]
pub fn find_image_hint(html: &str, page_url: &str) -> Option<String> {
    find_meta_content(html, "og:image")
        .or_else(|| find_meta_content(html, "og:image:secure_url"))
        .or_else(|| find_meta_content(html, "twitter:image"))
        .and_then(|raw| absolutize_url(page_url, &raw))
}

/// Extends an opening-tag match to cover the element's leading content.
fn window(html: &str, start: usize, end: usize) -> (usize, usize) {
    let candidate_end = (end + ELEMENT_WINDOW).min(html.len());
    let snapped_end = (candidate_end..=html.len())
        .find(|&i| html.is_char_boundary(i))
        .unwrap_or(html.len());
    (start, snapped_end)
}

/// Finds the `content` of a `<meta>` whose `property` or `name` equals `key`.
fn find_meta_content(html: &str, key: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let mut matched = false;
        let mut content = None;
        for cap in ATTR_RE.captures_iter(tag) {
            let name = cap.get(1).map_or("", |n| n.as_str());
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map_or("", |v| v.as_str())
                .trim();
            if (name.eq_ignore_ascii_case("property") || name.eq_ignore_ascii_case("name"))
                && value.eq_ignore_ascii_case(key)
            {
                matched = true;
            } else if name.eq_ignore_ascii_case("content") && !value.is_empty() {
                content = Some(value.to_string());
            }
        }
        if matched {
            content
        } else {
            None
        }
    })
}
