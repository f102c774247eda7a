use regex::Regex;

use crate::core::error::ServiceError;

lazy_static::lazy_static! {
    static ref HEX_COLOR: Regex =
        Regex::new(r"^#([A-Fa-f0-9]{3}|[A-Fa-f0-9]{6}|[A-Fa-f0-9]{8})$").expect("valid regex");
    static ref URL: Regex =
        Regex::new(r"^(?i)https?://[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*(:[0-9]{1,5})?(/[^\s]*)?$")
            .expect("valid regex");
    static ref EMAIL: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").expect("valid regex");
}

/// Image extensions accepted for portfolio imagery
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// Shorthand for a validation failure
pub fn invalid<T>(message: impl Into<String>) -> Result<T, ServiceError> {
    Err(ServiceError::validation(message))
}

/// Length in characters, so Thai text counts the way users see it
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

/// Required hex color with the shared error wording
pub fn validate_hex_color(value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("color is required".to_string());
    }
    if !is_hex_color(value) {
        return Err("invalid hex color format (must be #RGB, #RRGGBB, or #RRGGBBAA)".to_string());
    }
    Ok(())
}

pub fn is_url(value: &str) -> bool {
    URL.is_match(value)
}

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Absolute URL or a path served from our own uploads directory
pub fn is_url_or_upload_path(value: &str) -> bool {
    is_url(value) || (value.starts_with("/uploads/") && !value.contains(".."))
}

/// Whether the URL path ends in one of the given extensions, ignoring query and fragment
pub fn has_extension(url: &str, extensions: &[&str]) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let file = path.rsplit('/').next().unwrap_or("");
    match file.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_colors() {
        assert!(is_hex_color("#FFF"));
        assert!(is_hex_color("#1a2B3c"));
        assert!(is_hex_color("#11223344"));
        assert!(!is_hex_color("FFF"));
        assert!(!is_hex_color("#GGG"));
        assert!(!is_hex_color("#12345"));
        assert_eq!(validate_hex_color("  "), Err("color is required".to_string()));
    }

    #[test]
    fn test_urls() {
        assert!(is_url("https://example.com/a.png"));
        assert!(is_url("http://localhost:8080/uploads/1.png"));
        assert!(!is_url("example.com"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("https://exa mple.com"));
        assert!(is_url_or_upload_path("/uploads/123.png"));
        assert!(!is_url_or_upload_path("/uploads/../secret"));
    }

    #[test]
    fn test_extensions_ignore_query_and_case() {
        assert!(has_extension("https://cdn.example.com/pic.JPG?size=large", &IMAGE_EXTENSIONS));
        assert!(has_extension("/uploads/1700000000.webp", &IMAGE_EXTENSIONS));
        assert!(!has_extension("https://example.com/doc.pdf", &IMAGE_EXTENSIONS));
        assert!(!has_extension("https://example.com/", &IMAGE_EXTENSIONS));
    }

    #[test]
    fn test_char_len_counts_thai_characters() {
        assert_eq!(char_len("ผลงาน"), 5);
        assert_eq!(char_len("abc"), 3);
    }

    #[test]
    fn test_emails() {
        assert!(is_email("student@example.ac.th"));
        assert!(!is_email("student@"));
        assert!(!is_email("no-at-sign.com"));
    }
}
