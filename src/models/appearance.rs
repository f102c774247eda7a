use serde::{Deserialize, Serialize};

use crate::core::error::ServiceError;
use crate::models::validation::{char_len, invalid, is_url, validate_hex_color};

pub const FONT_CATEGORIES: [&str; 5] = ["serif", "sans-serif", "monospace", "display", "handwriting"];

/// A color theme a portfolio can use
#[derive(Debug, Clone, Serialize)]
pub struct Colors {
    #[serde(rename = "ID")]
    pub id: i64,
    pub colors_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub hex_value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColorsInput {
    #[serde(default)]
    pub colors_name: String,
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub secondary_color: String,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub hex_value: String,
}

impl ColorsInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let name = self.colors_name.trim();
        if name.is_empty() {
            return invalid("Colors name cannot be empty");
        }
        if char_len(name) > 50 {
            return invalid("Colors name must be between 1 and 50 characters");
        }
        let checks = [
            ("Primary color", &self.primary_color),
            ("Secondary color", &self.secondary_color),
            ("Background color", &self.background_color),
        ];
        for (label, value) in checks {
            if let Err(msg) = validate_hex_color(value) {
                return invalid(format!("{}: {}", label, msg));
            }
        }
        if !self.hex_value.trim().is_empty() {
            if let Err(msg) = validate_hex_color(&self.hex_value) {
                return invalid(format!("hex value: {}", msg));
            }
        }
        Ok(())
    }
}

/// A font a portfolio can use
#[derive(Debug, Clone, Serialize)]
pub struct Font {
    #[serde(rename = "ID")]
    pub id: i64,
    pub font_name: String,
    /// CSS font-family value
    pub font_family: String,
    pub font_category: String,
    pub font_variant: String,
    pub font_url: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FontInput {
    #[serde(default)]
    pub font_name: String,
    #[serde(default)]
    pub font_family: String,
    #[serde(default)]
    pub font_category: String,
    #[serde(default)]
    pub font_variant: String,
    #[serde(default)]
    pub font_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl FontInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let name = self.font_name.trim();
        if name.is_empty() {
            return invalid("font name cannot be empty");
        }
        if char_len(name) > 100 {
            return invalid("font name must be between 1 and 100 characters");
        }
        let family = self.font_family.trim();
        if family.is_empty() {
            return invalid("font family cannot be empty");
        }
        if char_len(family) > 100 {
            return invalid("font family must be between 1 and 100 characters");
        }
        let category = self.font_category.trim();
        if !category.is_empty() && !FONT_CATEGORIES.contains(&category) {
            return invalid(format!("font category must be one of: {}", FONT_CATEGORIES.join(", ")));
        }
        if char_len(&self.font_variant) > 50 {
            return invalid("font variant must not exceed 50 characters");
        }
        let url = self.font_url.trim();
        if !url.is_empty() && !is_url(url) {
            return invalid("font URL must be a valid URL");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> ColorsInput {
        ColorsInput {
            colors_name: "Sunset".to_string(),
            primary_color: "#E66A0A".to_string(),
            secondary_color: "#fff".to_string(),
            background_color: "#FFFFFF80".to_string(),
            hex_value: String::new(),
        }
    }

    fn font() -> FontInput {
        FontInput {
            font_name: "Prompt".to_string(),
            font_family: "Prompt, sans-serif".to_string(),
            font_category: "sans-serif".to_string(),
            font_variant: String::new(),
            font_url: String::new(),
            is_active: true,
        }
    }

    fn message(result: Result<(), ServiceError>) -> String {
        match result {
            Err(ServiceError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_colors() {
        assert!(colors().validate().is_ok());
    }

    #[test]
    fn test_colors_name_rules() {
        let input = ColorsInput { colors_name: "   ".to_string(), ..colors() };
        assert_eq!(message(input.validate()), "Colors name cannot be empty");
        let input = ColorsInput { colors_name: "x".repeat(51), ..colors() };
        assert_eq!(message(input.validate()), "Colors name must be between 1 and 50 characters");
    }

    #[test]
    fn test_color_errors_are_prefixed() {
        let input = ColorsInput { primary_color: String::new(), ..colors() };
        assert_eq!(message(input.validate()), "Primary color: color is required");
        let input = ColorsInput { background_color: "red".to_string(), ..colors() };
        assert_eq!(
            message(input.validate()),
            "Background color: invalid hex color format (must be #RGB, #RRGGBB, or #RRGGBBAA)"
        );
        let input = ColorsInput { hex_value: "#12".to_string(), ..colors() };
        assert!(message(input.validate()).starts_with("hex value: "));
    }

    #[test]
    fn test_font_rules() {
        assert!(font().validate().is_ok());

        let input = FontInput { font_name: " ".to_string(), ..font() };
        assert_eq!(message(input.validate()), "font name cannot be empty");

        let input = FontInput { font_family: String::new(), ..font() };
        assert_eq!(message(input.validate()), "font family cannot be empty");

        let input = FontInput { font_category: "cursive".to_string(), ..font() };
        assert_eq!(
            message(input.validate()),
            "font category must be one of: serif, sans-serif, monospace, display, handwriting"
        );

        let input = FontInput { font_url: "fonts/prompt".to_string(), ..font() };
        assert_eq!(message(input.validate()), "font URL must be a valid URL");
    }
}
