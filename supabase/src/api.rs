//! Addressing of the backend API.

use url::Url;

use crate::error::{Result, SupabaseError};

/// Default address of the backend API.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Parses a backend base URL, rejecting URLs that cannot carry a path.
pub(crate) fn parse_base(base: &str) -> Result<Url> {
    let base = Url::parse(base.trim())?;
    if base.cannot_be_a_base() {
        return Err(SupabaseError::UnsupportedUrl(base.into()));
    }
    Ok(base)
}

/// `{base}/api/v1/{segments..}`, keeping any path prefix of `base`.
pub(crate) fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(["api", "v1"]).extend(segments);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_prefix_and_drops_query() {
        let base = parse_base("https://example.com/pdf-chat/?debug=1").unwrap();
        assert_eq!(
            endpoint(&base, ["chat"]).as_str(),
            "https://example.com/pdf-chat/api/v1/chat"
        );
    }

    #[test]
    fn opaque_urls_are_rejected() {
        assert!(matches!(
            parse_base("mailto:someone@example.com"),
            Err(SupabaseError::UnsupportedUrl(_))
        ));
    }
}
