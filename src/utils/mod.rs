use std::path::{Component, Path};

use crate::errors::WikiError;

/// Escape HTML special characters
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Normalize request path
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject paths that could climb out of the directory they are joined onto
pub fn ensure_safe_path(req_path: &str) -> Result<(), WikiError> {
    for comp in Path::new(req_path).components() {
        match comp {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(WikiError::InvalidPath),
        }
    }
    Ok(())
}

/// Determine content type for a file based on its extension
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn normalizes_slashes() {
        assert_eq!(normalize_path("/css//site.css/"), "css/site.css");
        assert_eq!(normalize_path("./img/./logo.png"), "img/logo.png");
        assert_eq!(normalize_path("/"), "");
    }

    #[test]
    fn unsafe_paths_are_rejected() {
        assert!(ensure_safe_path("css/site.css").is_ok());
        assert!(matches!(ensure_safe_path("css/../../secret"), Err(WikiError::InvalidPath)));
        assert!(matches!(ensure_safe_path("/etc/passwd"), Err(WikiError::InvalidPath)));
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a/site.CSS")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Path::new("font/x.woff2")), "font/woff2");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }
}
