use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::ServiceError;
use crate::models::appearance::{Colors, Font};
use crate::models::validation::{
    char_len, has_extension, invalid, is_hex_color, is_url_or_upload_path, IMAGE_EXTENSIONS,
};

/// Block kinds the editor knows how to render
pub const BLOCK_TYPES: [&str; 12] = [
    "activity", "text", "image", "gallery", "education", "skills", "awards", "experience",
    "contact", "header", "divider", "spacer",
];

pub const DEFAULT_BLOCK_TYPE: &str = "text";

const FONT_SIZES: [&str; 7] = ["xs", "sm", "md", "lg", "xl", "2xl", "3xl"];
const TEXT_ALIGNMENTS: [&str; 4] = ["left", "center", "right", "justify"];
const FONT_WEIGHTS: [&str; 13] = [
    "normal", "bold", "lighter", "bolder", "100", "200", "300", "400", "500", "600", "700", "800", "900",
];

lazy_static::lazy_static! {
    static ref CSS_SIZE: Regex = Regex::new(r"^\d+(\.\d+)?(px|rem)$").expect("valid regex");
}

/// Lifecycle of a portfolio. A student has at most one active portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortfolioStatus {
    Draft,
    Active,
    Archived,
}

impl PortfolioStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(PortfolioStatus::Draft),
            "active" => Some(PortfolioStatus::Active),
            "archived" => Some(PortfolioStatus::Archived),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PortfolioStatus::Draft => "draft",
            PortfolioStatus::Active => "active",
            PortfolioStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    #[serde(rename = "ID")]
    pub id: i64,
    pub portfolio_name: String,
    pub description: String,
    pub status: String,
    pub portfolio_style: Option<Value>,
    pub cover_image: String,
    pub content_description: String,
    pub template_id: Option<i64>,
    pub user_id: i64,
    pub colors_id: i64,
    pub font_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub colors: Option<Colors>,
    pub font: Option<Font>,
    pub portfolio_sections: Vec<PortfolioSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSection {
    #[serde(rename = "ID")]
    pub id: i64,
    pub section_port_key: String,
    pub section_title: String,
    pub is_enabled: bool,
    pub section_order: i64,
    pub section_style: Option<Value>,
    pub portfolio_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub portfolio_blocks: Vec<PortfolioBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioBlock {
    #[serde(rename = "ID")]
    pub id: i64,
    pub block_port_type: String,
    pub block_order: i64,
    pub block_style: Option<Value>,
    pub content: Option<Value>,
    pub portfolio_section_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePortfolio {
    #[serde(default)]
    pub portfolio_name: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<String>,
    pub portfolio_style: Option<Value>,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub content_description: String,
    pub colors_id: Option<i64>,
    pub font_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePortfolio {
    pub portfolio_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub portfolio_style: Option<Value>,
    pub cover_image: Option<String>,
    pub content_description: Option<String>,
    pub colors_id: Option<i64>,
    pub font_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSection {
    #[serde(default)]
    pub section_port_key: String,
    #[serde(default)]
    pub section_title: String,
    pub is_enabled: Option<bool>,
    pub section_order: Option<i64>,
    pub section_style: Option<Value>,
    pub portfolio_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSection {
    pub section_title: Option<String>,
    pub is_enabled: Option<bool>,
    pub section_order: Option<i64>,
    pub section_style: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBlock {
    pub block_port_type: Option<String>,
    pub block_order: Option<i64>,
    pub block_style: Option<Value>,
    pub content: Option<Value>,
    pub portfolio_section_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBlock {
    pub content: Option<Value>,
    pub block_order: Option<i64>,
    pub block_style: Option<Value>,
}

// Portfolio fields

pub fn validate_portfolio_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return invalid("portfolio name cannot be empty or whitespace only");
    }
    if char_len(name) > 100 {
        return invalid("portfolio name must be between 1 and 100 characters");
    }
    Ok(name.to_string())
}

pub fn validate_description(description: &str) -> Result<(), ServiceError> {
    if char_len(description) > 500 {
        return invalid("description must not exceed 500 characters");
    }
    Ok(())
}

pub fn validate_status(status: &str) -> Result<PortfolioStatus, ServiceError> {
    let status = status.trim();
    if status.is_empty() {
        return invalid("status is required");
    }
    PortfolioStatus::parse(status)
        .ok_or_else(|| ServiceError::validation("Status must be one of: draft, active, archived"))
}

pub fn validate_cover_image(url: &str) -> Result<(), ServiceError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(());
    }
    if !is_url_or_upload_path(url) {
        return invalid("cover image must be a valid URL");
    }
    if !has_extension(url, &IMAGE_EXTENSIONS) {
        return invalid("cover image must be a valid image file (jpg, jpeg, png, gif, webp, svg)");
    }
    Ok(())
}

pub fn validate_portfolio_style(style: &Value) -> Result<(), ServiceError> {
    match style {
        Value::Null | Value::Object(_) => Ok(()),
        _ => invalid("portfolio style must be a JSON object"),
    }
}

// Section fields

pub fn validate_section_key(key: &str) -> Result<String, ServiceError> {
    let key = key.trim();
    if key.is_empty() {
        return invalid("section key cannot be empty");
    }
    if char_len(key) > 50 {
        return invalid("section key must be between 1 and 50 characters");
    }
    Ok(key.to_string())
}

pub fn validate_section_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return invalid("section title cannot be empty");
    }
    if char_len(title) > 200 {
        return invalid("section title must be between 1 and 200 characters");
    }
    Ok(title.to_string())
}

pub fn validate_section_order(order: i64) -> Result<(), ServiceError> {
    if order < 0 {
        return invalid("section order must be a non-negative integer");
    }
    Ok(())
}

pub fn validate_section_style(style: &Value) -> Result<(), ServiceError> {
    const FORMAT: &str = "invalid section style JSON format";
    let obj = match style {
        Value::Null => return Ok(()),
        Value::Object(obj) => obj,
        _ => return invalid(FORMAT),
    };

    validate_style_colors(obj, FORMAT)?;
    if let Some(size) = string_field(obj, "font_size", FORMAT)? {
        if !FONT_SIZES.contains(&size) && !CSS_SIZE.is_match(size) {
            return invalid("invalid font size format, must be xs, sm, md, lg, xl, 2xl, 3xl or a valid CSS value");
        }
    }
    Ok(())
}

// Block fields

pub fn validate_block_type(block_type: &str) -> Result<String, ServiceError> {
    let block_type = block_type.trim();
    if block_type.is_empty() {
        return invalid("block type cannot be empty");
    }
    if !BLOCK_TYPES.contains(&block_type) {
        return invalid(format!("invalid block type, must be one of: {}", BLOCK_TYPES.join(", ")));
    }
    Ok(block_type.to_string())
}

pub fn validate_block_order(order: i64) -> Result<(), ServiceError> {
    if order < 0 {
        return invalid("block order must be a non-negative integer");
    }
    Ok(())
}

pub fn validate_block_style(style: &Value) -> Result<(), ServiceError> {
    const FORMAT: &str = "invalid block style JSON format";
    let obj = match style {
        Value::Null => return Ok(()),
        Value::Object(obj) => obj,
        _ => return invalid(FORMAT),
    };

    validate_style_colors(obj, FORMAT)?;
    if let Some(align) = string_field(obj, "text_align", FORMAT)? {
        if !TEXT_ALIGNMENTS.contains(&align) {
            return invalid("invalid text alignment, must be one of: left, center, right, justify");
        }
    }
    if let Some(weight) = string_field(obj, "font_weight", FORMAT)? {
        if !FONT_WEIGHTS.contains(&weight) {
            return invalid("invalid font weight");
        }
    }
    Ok(())
}

/// Content rules depend on the block type
pub fn validate_block_content(block_type: &str, content: &Value) -> Result<(), ServiceError> {
    if content.is_null() {
        return Ok(());
    }
    match block_type {
        "activity" => match content {
            Value::Object(obj) => validate_activity(obj),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(obj) => validate_activity(obj)?,
                        _ => return invalid("invalid activity content format"),
                    }
                }
                Ok(())
            }
            _ => invalid("invalid activity content format"),
        },
        "text" => {
            const FORMAT: &str = "invalid text content format";
            let obj = content.as_object().ok_or_else(|| ServiceError::validation(FORMAT))?;
            if let Some(text) = string_field(obj, "text", FORMAT)? {
                if char_len(text) > 10_000 {
                    return invalid("text content must not exceed 10000 characters");
                }
            }
            if let Some(align) = string_field(obj, "text_align", FORMAT)? {
                if !TEXT_ALIGNMENTS.contains(&align) {
                    return invalid("invalid text alignment in content");
                }
            }
            Ok(())
        }
        "image" => {
            const FORMAT: &str = "invalid image content format";
            let obj = content.as_object().ok_or_else(|| ServiceError::validation(FORMAT))?;
            if let Some(url) = string_field(obj, "image_url", FORMAT)? {
                if !is_url_or_upload_path(url) {
                    return invalid("invalid image URL format");
                }
                if !has_extension(url, &IMAGE_EXTENSIONS) {
                    return invalid("image URL must point to a valid image file (jpg, jpeg, png, gif, webp, svg)");
                }
            }
            if let Some(alt) = string_field(obj, "alt_text", FORMAT)? {
                if char_len(alt) > 200 {
                    return invalid("alt text must not exceed 200 characters");
                }
            }
            if let Some(caption) = string_field(obj, "caption", FORMAT)? {
                if char_len(caption) > 500 {
                    return invalid("caption must not exceed 500 characters");
                }
            }
            Ok(())
        }
        _ => match content {
            Value::Object(_) => Ok(()),
            _ => invalid("invalid content JSON format"),
        },
    }
}

fn validate_activity(obj: &Map<String, Value>) -> Result<(), ServiceError> {
    const FORMAT: &str = "invalid activity content format";
    if let Some(name) = string_field(obj, "activity_name", FORMAT)? {
        if char_len(name) > 200 {
            return invalid("activity name must not exceed 200 characters");
        }
    }
    if let Some(description) = string_field(obj, "description", FORMAT)? {
        if char_len(description) > 2000 {
            return invalid("activity description must not exceed 2000 characters");
        }
    }
    if let Some(url) = string_field(obj, "image_url", FORMAT)? {
        if !is_url_or_upload_path(url) {
            return invalid("invalid activity image URL format");
        }
    }
    match obj.get("hours") {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) => {
            if n.as_f64().unwrap_or(0.0) < 0.0 {
                return invalid("activity hours cannot be negative");
            }
        }
        Some(_) => return invalid(FORMAT),
    }
    if let Some(location) = string_field(obj, "location", FORMAT)? {
        if char_len(location) > 200 {
            return invalid("activity location must not exceed 200 characters");
        }
    }
    Ok(())
}

fn validate_style_colors(obj: &Map<String, Value>, format_error: &str) -> Result<(), ServiceError> {
    if let Some(color) = string_field(obj, "background_color", format_error)? {
        if !is_hex_color(color) {
            return invalid("invalid background color format, must be valid hex color");
        }
    }
    if let Some(color) = string_field(obj, "text_color", format_error)? {
        if !is_hex_color(color) {
            return invalid("invalid text color format, must be valid hex color");
        }
    }
    Ok(())
}

/// Non-empty string value of `key`; other JSON types are a format error
fn string_field<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    format_error: &str,
) -> Result<Option<&'a str>, ServiceError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => invalid(format_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message<T: std::fmt::Debug>(result: Result<T, ServiceError>) -> String {
        match result {
            Err(ServiceError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_portfolio_name_rules() {
        assert_eq!(validate_portfolio_name("  My Work  ").unwrap(), "My Work");
        assert_eq!(
            message(validate_portfolio_name("   ")),
            "portfolio name cannot be empty or whitespace only"
        );
        assert_eq!(
            message(validate_portfolio_name(&"ก".repeat(101))),
            "portfolio name must be between 1 and 100 characters"
        );
        assert!(validate_portfolio_name(&"ก".repeat(100)).is_ok());
    }

    #[test]
    fn test_status_rules() {
        assert_eq!(validate_status("active").unwrap(), PortfolioStatus::Active);
        assert_eq!(message(validate_status("")), "status is required");
        assert_eq!(message(validate_status("published")), "Status must be one of: draft, active, archived");
    }

    #[test]
    fn test_cover_image_rules() {
        assert!(validate_cover_image("").is_ok());
        assert!(validate_cover_image("https://cdn.example.com/cover.png").is_ok());
        assert!(validate_cover_image("/uploads/1700000000.jpg").is_ok());
        assert_eq!(message(validate_cover_image("cover.png")), "cover image must be a valid URL");
        assert_eq!(
            message(validate_cover_image("https://cdn.example.com/cover.pdf")),
            "cover image must be a valid image file (jpg, jpeg, png, gif, webp, svg)"
        );
    }

    #[test]
    fn test_description_and_style() {
        assert!(validate_description(&"a".repeat(500)).is_ok());
        assert_eq!(
            message(validate_description(&"a".repeat(501))),
            "description must not exceed 500 characters"
        );
        assert!(validate_portfolio_style(&json!({"layout": "grid"})).is_ok());
        assert_eq!(
            message(validate_portfolio_style(&json!([1, 2]))),
            "portfolio style must be a JSON object"
        );
    }

    #[test]
    fn test_section_rules() {
        assert_eq!(message(validate_section_key(" ")), "section key cannot be empty");
        assert_eq!(message(validate_section_title("")), "section title cannot be empty");
        assert_eq!(
            message(validate_section_title(&"x".repeat(201))),
            "section title must be between 1 and 200 characters"
        );
        assert_eq!(
            message(validate_section_order(-1)),
            "section order must be a non-negative integer"
        );
        assert!(validate_section_order(0).is_ok());
    }

    #[test]
    fn test_section_style_rules() {
        assert!(validate_section_style(&json!({"background_color": "#fff", "font_size": "lg"})).is_ok());
        assert!(validate_section_style(&json!({"font_size": "18px"})).is_ok());
        assert!(validate_section_style(&json!({"font_size": "1.5rem"})).is_ok());
        assert_eq!(
            message(validate_section_style(&json!("red"))),
            "invalid section style JSON format"
        );
        assert_eq!(
            message(validate_section_style(&json!({"background_color": "white"}))),
            "invalid background color format, must be valid hex color"
        );
        assert_eq!(
            message(validate_section_style(&json!({"text_color": "#12"}))),
            "invalid text color format, must be valid hex color"
        );
        assert_eq!(
            message(validate_section_style(&json!({"font_size": "huge"}))),
            "invalid font size format, must be xs, sm, md, lg, xl, 2xl, 3xl or a valid CSS value"
        );
    }

    #[test]
    fn test_block_type_rules() {
        assert_eq!(validate_block_type("gallery").unwrap(), "gallery");
        assert_eq!(message(validate_block_type("")), "block type cannot be empty");
        let msg = message(validate_block_type("video"));
        assert!(msg.starts_with("invalid block type, must be one of: activity, text, image"));
        assert_eq!(message(validate_block_order(-3)), "block order must be a non-negative integer");
    }

    #[test]
    fn test_block_style_rules() {
        assert!(validate_block_style(&json!({"text_align": "center", "font_weight": "700"})).is_ok());
        assert_eq!(
            message(validate_block_style(&json!({"text_align": "middle"}))),
            "invalid text alignment, must be one of: left, center, right, justify"
        );
        assert_eq!(
            message(validate_block_style(&json!({"font_weight": "650"}))),
            "invalid font weight"
        );
        assert_eq!(
            message(validate_block_style(&json!({"font_weight": 700}))),
            "invalid block style JSON format"
        );
    }

    #[test]
    fn test_activity_content() {
        let single = json!({"activity_name": "Robotics camp", "hours": 12, "image_url": "/uploads/1.png"});
        assert!(validate_block_content("activity", &single).is_ok());
        let many = json!([{"activity_name": "A"}, {"activity_name": "B", "location": "Korat"}]);
        assert!(validate_block_content("activity", &many).is_ok());

        assert_eq!(
            message(validate_block_content("activity", &json!({"hours": -1}))),
            "activity hours cannot be negative"
        );
        assert_eq!(
            message(validate_block_content("activity", &json!({"activity_name": "x".repeat(201)}))),
            "activity name must not exceed 200 characters"
        );
        assert_eq!(
            message(validate_block_content("activity", &json!({"image_url": "nope"}))),
            "invalid activity image URL format"
        );
    }

    #[test]
    fn test_text_content() {
        assert!(validate_block_content("text", &json!({"text": "hello", "text_align": "left"})).is_ok());
        assert_eq!(
            message(validate_block_content("text", &json!({"text": "x".repeat(10_001)}))),
            "text content must not exceed 10000 characters"
        );
        assert_eq!(
            message(validate_block_content("text", &json!({"text_align": "top"}))),
            "invalid text alignment in content"
        );
        assert_eq!(
            message(validate_block_content("text", &json!("plain"))),
            "invalid text content format"
        );
    }

    #[test]
    fn test_image_content() {
        assert!(validate_block_content("image", &json!({"image_url": "https://x.com/a.png"})).is_ok());
        assert_eq!(
            message(validate_block_content("image", &json!({"image_url": "a.png"}))),
            "invalid image URL format"
        );
        assert_eq!(
            message(validate_block_content("image", &json!({"image_url": "https://x.com/a.txt"}))),
            "image URL must point to a valid image file (jpg, jpeg, png, gif, webp, svg)"
        );
        assert_eq!(
            message(validate_block_content("image", &json!({"caption": "c".repeat(501)}))),
            "caption must not exceed 500 characters"
        );
    }

    #[test]
    fn test_other_content_must_be_object() {
        assert!(validate_block_content("skills", &json!({"items": ["Rust"]})).is_ok());
        assert!(validate_block_content("divider", &Value::Null).is_ok());
        assert_eq!(
            message(validate_block_content("skills", &json!(["Rust"]))),
            "invalid content JSON format"
        );
    }
}
