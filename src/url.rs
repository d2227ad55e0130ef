//! URL path helpers shared by the host and the extension registrar.

/// Join URL path pieces with exactly one `/` between them.
///
/// Leading and trailing slashes are stripped from every piece and empty
/// pieces are dropped. The result keeps a leading `/` when the first piece
/// had one, and a trailing `/` when the last piece had one.
///
/// ```rust,ignore
/// assert_eq!(url_path_join(&["/base/", "ext", "health"]), "/base/ext/health");
/// ```
pub fn url_path_join(pieces: &[&str]) -> String {
    let (Some(first), Some(last)) = (pieces.first(), pieces.last()) else {
        return String::new();
    };
    let initial = first.starts_with('/');
    let final_slash = last.ends_with('/');

    let joined = pieces
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    let mut result = String::with_capacity(joined.len() + 2);
    if initial {
        result.push('/');
    }
    result.push_str(&joined);
    if final_slash {
        result.push('/');
    }

    if result == "//" {
        result.truncate(1);
    }
    result
}

/// Normalise a mount prefix so it always starts and ends with `/` and
/// never contains an empty segment.
///
/// An empty prefix becomes `/`.
pub fn normalize_base_url(base_url: &str) -> String {
    let segments = base_url
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    if segments.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", segments.join("/"))
    }
}
