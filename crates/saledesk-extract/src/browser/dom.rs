//! Selector heuristics over a rendered product page.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::price::parse_price;

const NAME_SELECTORS: &[&str] = &[
    "h1",
    "[class*='product-title']",
    "[class*='product-name']",
    "[class*='pdp-title']",
    "[itemprop='name']",
];

const BRAND_SELECTORS: &[&str] = &[
    "[itemprop='brand']",
    "[class*='product-brand']",
    "[class*='brand-name']",
    "[data-testid*='brand']",
];

const IMAGE_CLASS_SELECTORS: &[&str] = &["img[class*='product']", "img[class*='main']"];

const SALE_PRICE_SELECTORS: &[&str] = &[
    "[class*='price'][class*='sale']",
    "[class*='current-price']",
    "[class*='price']",
    "[itemprop='price']",
];

const ORIGINAL_PRICE_SELECTORS: &[&str] = &[
    "[class*='price'][class*='original']",
    "[class*='regular-price']",
    "[class*='was-price']",
    "[class*='compare-at-price']",
    "[itemprop='highPrice']",
];

/// Class fragments marking an element as a reference price rather than the
/// price being charged.
const ORIGINAL_PRICE_HINTS: &[&str] = &[
    "original", "regular", "was", "compare", "strike", "strikethrough", "old", "list", "msrp",
];

/// What the probe found, plus which selector produced each field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbedPage {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub sale_price: Option<f64>,
    pub original_price: Option<f64>,
    pub matched: Vec<MatchedSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedSelector {
    pub field: &'static str,
    pub selector: &'static str,
}

/// Runs the field probes against serialized page HTML.
#[must_use]
pub fn probe(html: &str) -> ProbedPage {
    let doc = Html::parse_document(html);
    let mut page = ProbedPage::default();

    page.name = first_text(&doc, NAME_SELECTORS, 300)
        .or_else(|| meta_content(&doc, "og:title").map(|t| (t, "meta[og:title]")))
        .or_else(|| first_text(&doc, &["title"], 300))
        .map(|(text, sel)| {
            page.matched.push(MatchedSelector { field: "name", selector: sel });
            text
        });

    page.brand = BRAND_SELECTORS
        .iter()
        .find_map(|sel| {
            select_all(&doc, sel).find_map(|el| {
                el.value()
                    .attr("content")
                    .map(collapse_whitespace)
                    .or_else(|| Some(element_text(&el)))
                    .filter(|t| !t.is_empty() && t.chars().count() <= 80)
                    .map(|t| (t, *sel))
            })
        })
        .map(|(text, sel)| {
            page.matched.push(MatchedSelector { field: "brand", selector: sel });
            text
        });

    page.image_url = meta_content(&doc, "og:image")
        .map(|u| (u, "meta[og:image]"))
        .or_else(|| meta_content(&doc, "twitter:image").map(|u| (u, "meta[twitter:image]")))
        .or_else(|| {
            IMAGE_CLASS_SELECTORS.iter().find_map(|sel| {
                select_all(&doc, sel).find_map(|img| {
                    let value = img.value();
                    value
                        .attr("src")
                        .or_else(|| value.attr("data-src"))
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| (s.to_string(), *sel))
                })
            })
        })
        .map(|(url, sel)| {
            page.matched.push(MatchedSelector { field: "image", selector: sel });
            url
        });

    page.sale_price = SALE_PRICE_SELECTORS
        .iter()
        .find_map(|sel| {
            let generic = *sel == "[class*='price']";
            select_all(&doc, sel)
                .filter(|el| !generic || (!looks_like_original(el) && !has_nested_price(el)))
                .find_map(|el| price_of(&el))
                .map(|p| (p, *sel))
        })
        .map(|(price, sel)| {
            page.matched.push(MatchedSelector { field: "salePrice", selector: sel });
            price
        });

    page.original_price = ORIGINAL_PRICE_SELECTORS
        .iter()
        .find_map(|sel| select_all(&doc, sel).find_map(|el| price_of(&el)).map(|p| (p, *sel)))
        .map(|(price, sel)| {
            page.matched.push(MatchedSelector { field: "originalPrice", selector: sel });
            price
        });

    page
}

fn select_all<'a>(doc: &'a Html, selector: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let parsed = Selector::parse(selector).ok();
    let elements: Vec<ElementRef<'a>> = parsed
        .map(|sel| doc.select(&sel).collect())
        .unwrap_or_default();
    elements.into_iter()
}

fn first_text(doc: &Html, selectors: &[&'static str], max_chars: usize) -> Option<(String, &'static str)> {
    selectors.iter().find_map(|sel| {
        select_all(doc, sel)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty() && t.chars().count() <= max_chars)
            .map(|t| (t, *sel))
    })
}

/// Reads `<meta property|name=key content=...>`.
fn meta_content(doc: &Html, key: &str) -> Option<String> {
    select_all(doc, "meta").find_map(|meta| {
        let value = meta.value();
        let matches = value
            .attr("property")
            .or_else(|| value.attr("name"))
            .is_some_and(|k| k.trim().eq_ignore_ascii_case(key));
        if !matches {
            return None;
        }
        value
            .attr("content")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    })
}

fn price_of(el: &ElementRef<'_>) -> Option<f64> {
    el.value()
        .attr("content")
        .and_then(parse_price)
        .or_else(|| parse_price(&element_text(el)))
        .filter(|p| *p > 0.0)
}

fn looks_like_original(el: &ElementRef<'_>) -> bool {
    let tag = el.value().name();
    if matches!(tag, "s" | "del" | "strike") {
        return true;
    }
    el.value().classes().any(|class| {
        class_tokens(class).any(|token| ORIGINAL_PRICE_HINTS.contains(&token.as_str()))
    })
}

/// Lowercased words of a class name, split on `-`, `_` and camelCase humps.
/// `price-was` and `wasPrice` both yield `was`; `font-bold` never does.
fn class_tokens(class: &str) -> impl Iterator<Item = String> + '_ {
    class
        .split(|c: char| c == '-' || c == '_')
        .flat_map(split_camel_case)
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
}

fn split_camel_case(part: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut prev_lower = false;
    for (idx, ch) in part.char_indices() {
        if ch.is_ascii_uppercase() && prev_lower {
            words.push(&part[start..idx]);
            start = idx;
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
    }
    words.push(&part[start..]);
    words
}

/// True when a descendant also carries a price class, so `el` is a container
/// whose text would mix several prices.
fn has_nested_price(el: &ElementRef<'_>) -> bool {
    let Ok(sel) = Selector::parse("[class*='price']") else {
        return false;
    };
    el.select(&sel).any(|child| child.id() != el.id())
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ankle_boot_page() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://cdn.shop.test/boot.jpg">
            <title>Ankle Boot - Shop</title></head>
            <body><h1>Ankle Boot</h1><span class="price">$128.00</span></body></html>"#;
        let page = probe(html);
        assert_eq!(page.name.as_deref(), Some("Ankle Boot"));
        assert_eq!(page.image_url.as_deref(), Some("https://cdn.shop.test/boot.jpg"));
        assert_eq!(page.sale_price, Some(128.0));
        assert_eq!(page.original_price, None);
    }

    #[test]
    fn sale_and_original_prices_by_class() {
        let html = r#"<html><body>
            <h1 class="pdp-title">  Wool   Coat </h1>
            <div class="price-block">
              <span class="price original-price">$400.00</span>
              <span class="price sale-price">$200.00</span>
            </div></body></html>"#;
        let page = probe(html);
        assert_eq!(page.name.as_deref(), Some("Wool Coat"));
        assert_eq!(page.sale_price, Some(200.0));
        assert_eq!(page.original_price, Some(400.0));
    }

    #[test]
    fn generic_price_skips_reference_prices_and_containers() {
        let html = r#"<html><body><h1>Scarf</h1>
            <div class="product-price">
              <span class="price-was">$90.00</span>
              <span class="price-now">$45.00</span>
            </div></body></html>"#;
        let page = probe(html);
        assert_eq!(page.sale_price, Some(45.0));
    }

    #[test]
    fn generic_price_ignores_hint_fragments_inside_utility_classes() {
        let html = r#"<h1>Ankle Boot</h1><span class="price font-bold">$128.00</span>"#;
        assert_eq!(probe(html).sale_price, Some(128.0));

        let html = r#"<h1>Ankle Boot</h1><span class="product-price text-gold">$128.00</span>"#;
        assert_eq!(probe(html).sale_price, Some(128.0));

        let html = r#"<h1>Ankle Boot</h1><span class="price wishlist-badge">$128.00</span>"#;
        assert_eq!(probe(html).sale_price, Some(128.0));
    }

    #[test]
    fn generic_price_skips_camel_case_reference_classes() {
        let html = r#"<h1>Ankle Boot</h1>
            <span class="price wasPrice">$160.00</span>
            <span class="price nowPrice">$128.00</span>"#;
        assert_eq!(probe(html).sale_price, Some(128.0));
    }

    #[test]
    fn class_tokens_split_on_separators_and_humps() {
        let tokens: Vec<String> = class_tokens("pdp_compareAt-price").collect();
        assert_eq!(tokens, vec!["pdp", "compare", "at", "price"]);
        assert!(!class_tokens("font-bold").any(|t| t == "old"));
    }

    #[test]
    fn itemprop_price_content_attribute() {
        let html = r#"<html><body><h1>Lamp</h1>
            <meta itemprop="price" content="59.99">
            <meta itemprop="highPrice" content="79.99"></body></html>"#;
        let page = probe(html);
        assert_eq!(page.sale_price, Some(59.99));
        assert_eq!(page.original_price, Some(79.99));
    }

    #[test]
    fn falls_back_to_og_title_then_title() {
        let html = r#"<html><head><meta property="og:title" content="Leather Belt"><title>Belt | Shop</title></head><body></body></html>"#;
        assert_eq!(probe(html).name.as_deref(), Some("Leather Belt"));

        let html = "<html><head><title>Belt | Shop</title></head><body></body></html>";
        assert_eq!(probe(html).name.as_deref(), Some("Belt | Shop"));
    }

    #[test]
    fn image_from_product_img_class() {
        let html = r#"<html><body><img class="logo" src="/logo.png"><img class="product-hero" src="/img/hero.jpg"></body></html>"#;
        let page = probe(html);
        assert_eq!(page.image_url.as_deref(), Some("/img/hero.jpg"));
    }

    #[test]
    fn records_matched_selectors() {
        let html = r#"<html><body><h1>Boot</h1><span class="current-price">$10</span></body></html>"#;
        let page = probe(html);
        assert!(page.matched.contains(&MatchedSelector { field: "name", selector: "h1" }));
        assert!(page.matched.contains(&MatchedSelector {
            field: "salePrice",
            selector: "[class*='current-price']"
        }));
    }

    #[test]
    fn empty_page_finds_nothing() {
        let page = probe("<html><body><p>Nothing here</p></body></html>");
        assert_eq!(page, ProbedPage::default());
    }
}
