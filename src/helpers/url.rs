//! URL helper functions

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hooks") // -> "/blog/post/hooks"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Map a document to its site path
///
/// Posts live under `/post/<uid>`; every other document resolves to the
/// home page.
pub fn link_resolver(doc_type: &str, uid: Option<&str>) -> String {
    match (doc_type, uid) {
        ("post", Some(uid)) if !uid.is_empty() => format!("/post/{}", uid),
        _ => "/".to_string(),
    }
}

/// Whether a redirect target stays on this site
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
