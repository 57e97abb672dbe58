//! URL host normalization and relative-URL resolution.

/// Returns the lowercased hostname of `url` with a leading `www.` removed.
///
/// Returns `None` when `url` is not an absolute URL with a host.
#[must_use]
pub fn normalize_host(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Resolves `candidate` against `base_url`, decoding `&amp;` entities left
/// over from attribute values.
///
/// Protocol-relative (`//cdn...`) and root-relative (`/img/...`) candidates
/// resolve against the base; absolute candidates pass through unchanged.
#[must_use]
pub fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim().replace("&amp;", "&");
    if candidate.is_empty() {
        return None;
    }
    if candidate.starts_with("data:") {
        return Some(candidate);
    }
    let base = reqwest::Url::parse(base_url).ok()?;
    base.join(&candidate).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_host_strips_www_and_case() {
        assert_eq!(
            normalize_host("https://WWW.Example-Store.com/p/1").as_deref(),
            Some("example-store.com")
        );
    }

    #[test]
    fn normalize_host_keeps_other_subdomains() {
        assert_eq!(
            normalize_host("https://shop.example.com/p/1").as_deref(),
            Some("shop.example.com")
        );
    }

    #[test]
    fn normalize_host_rejects_relative() {
        assert!(normalize_host("/products/1").is_none());
        assert!(normalize_host("not a url").is_none());
    }

    #[test]
    fn absolutize_root_relative() {
        assert_eq!(
            absolutize_url("https://shop.test/p/boot", "/img/boot.jpg").as_deref(),
            Some("https://shop.test/img/boot.jpg")
        );
    }

    #[test]
    fn absolutize_protocol_relative() {
        assert_eq!(
            absolutize_url("https://shop.test/p/boot", "//cdn.shop.test/boot.jpg").as_deref(),
            Some("https://cdn.shop.test/boot.jpg")
        );
    }

    #[test]
    fn absolutize_decodes_amp_entities() {
        assert_eq!(
            absolutize_url("https://shop.test/", "/i.jpg?w=1&amp;h=2").as_deref(),
            Some("https://shop.test/i.jpg?w=1&h=2")
        );
    }

    #[test]
    fn absolutize_passes_through_absolute() {
        assert_eq!(
            absolutize_url("https://shop.test/", "https://cdn.other.test/a.png").as_deref(),
            Some("https://cdn.other.test/a.png")
        );
    }
}
