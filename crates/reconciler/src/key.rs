//! Mapping between request URLs and manifest keys.

use shared::{ResourcePath, ROOT_PATH};

/// The part of `url` after `<origin>/`, or `None` for another origin
fn relative_path<'a>(url: &'a str, origin: &str) -> Option<&'a str> {
    let rest = url.strip_prefix(origin)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix('/')
}

/// Everything before the first `marker`
pub fn strip_version_query<'a>(key: &'a str, marker: &str) -> &'a str {
    if marker.is_empty() {
        return key;
    }
    key.split(marker).next().unwrap_or(key)
}

/// Manifest key of an entry already stored in a cache
pub fn content_key(url: &str, origin: &str) -> Option<ResourcePath> {
    let path = relative_path(url, origin)?;
    if path.is_empty() {
        Some(ResourcePath::root())
    } else {
        Some(ResourcePath::new(path))
    }
}

/// Manifest key an intercepted request resolves to.
///
/// The version marker is stripped, and the origin itself, an in-page
/// `#` navigation or an empty path all resolve to the root key.
pub fn request_key(url: &str, origin: &str, version_query: &str) -> Option<ResourcePath> {
    let path = strip_version_query(relative_path(url, origin)?, version_query);
    if path.is_empty() || path.starts_with('#') {
        Some(ResourcePath::root())
    } else {
        Some(ResourcePath::new(path))
    }
}

/// Absolute URL a manifest key is fetched from and cached under
pub fn resource_url(origin: &str, path: &ResourcePath) -> String {
    if path.is_root() {
        format!("{origin}{ROOT_PATH}")
    } else {
        format!("{origin}/{}", path.as_str().trim_start_matches('/'))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ORIGIN: &str = "https://app.test";

    fn key(url: &str) -> Option<String> {
        request_key(url, ORIGIN, "?v=").map(|k| k.as_str().to_string())
    }

    #[test]
    fn test_root_forms() {
        assert_eq!(key("https://app.test").as_deref(), Some("/"));
        assert_eq!(key("https://app.test/").as_deref(), Some("/"));
        assert_eq!(key("https://app.test/#/settings").as_deref(), Some("/"));
        assert_eq!(key("https://app.test/?v=42").as_deref(), Some("/"));
    }

    #[test]
    fn test_version_suffix_is_stripped() {
        assert_eq!(
            key("https://app.test/main.js?v=123").as_deref(),
            Some("main.js")
        );
        assert_eq!(key("https://app.test/main.js").as_deref(), Some("main.js"));

        let once = strip_version_query("main.js?v=1", "?v=");
        assert_eq!(strip_version_query(once, "?v="), once);
    }

    #[test]
    fn test_other_queries_are_kept() {
        assert_eq!(
            key("https://app.test/api/data?page=2").as_deref(),
            Some("api/data?page=2")
        );
    }

    #[test]
    fn test_foreign_origins_have_no_key() {
        assert_eq!(key("https://cdn.example/main.js"), None);
        assert_eq!(key("https://app.test.evil/main.js"), None);
        assert_eq!(content_key("https://app.testing/x", ORIGIN), None);
    }

    #[test]
    fn test_content_keys() {
        assert_eq!(
            content_key("https://app.test/", ORIGIN),
            Some(ResourcePath::root())
        );
        assert_eq!(
            content_key("https://app.test/assets/logo.png", ORIGIN),
            Some(ResourcePath::new("assets/logo.png"))
        );
    }

    #[test]
    fn test_resource_url_round_trips_through_content_key() {
        for path in ["/", "main.js", "assets/fonts/a.otf"] {
            let path = ResourcePath::new(path);
            let url = resource_url(ORIGIN, &path);
            assert_eq!(content_key(&url, ORIGIN), Some(path));
        }
    }
}
