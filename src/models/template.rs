use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::ServiceError;
use crate::models::portfolio::{validate_block_content, validate_block_style, validate_block_type};
use crate::models::validation::{char_len, invalid};

/// Starting layout a student can copy into a new portfolio
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    #[serde(rename = "ID")]
    pub id: i64,
    pub template_name: String,
    pub description: String,
    pub thumbnail: String,
    pub created_at: DateTime<Utc>,
    pub sections: Vec<TemplateSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSection {
    #[serde(rename = "ID")]
    pub id: i64,
    pub section_name: String,
    pub order_index: i64,
    pub blocks: Vec<TemplateBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateBlock {
    #[serde(rename = "ID")]
    pub id: i64,
    pub block_name: String,
    pub block_type: String,
    pub default_content: Option<Value>,
    pub default_style: Option<Value>,
    pub order_index: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateInput {
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub sections: Vec<TemplateSectionInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateSectionInput {
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub blocks: Vec<TemplateBlockInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateBlockInput {
    #[serde(default)]
    pub block_name: String,
    #[serde(default)]
    pub block_type: String,
    pub default_content: Option<Value>,
    pub default_style: Option<Value>,
    #[serde(default)]
    pub order_index: i64,
}

impl TemplateInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let name = self.template_name.trim();
        if name.is_empty() {
            return invalid("template name is required");
        }
        if char_len(name) > 100 {
            return invalid("template name must be between 1 and 100 characters");
        }
        for section in &self.sections {
            let section_name = section.section_name.trim();
            if section_name.is_empty() {
                return invalid("template section name is required");
            }
            if char_len(section_name) > 50 {
                return invalid("template section name must be between 1 and 50 characters");
            }
            if section.order_index < 0 {
                return invalid("section order must be a non-negative integer");
            }
            for block in &section.blocks {
                let block_type = validate_block_type(&block.block_type)?;
                if block.order_index < 0 {
                    return invalid("block order must be a non-negative integer");
                }
                if let Some(style) = &block.default_style {
                    validate_block_style(style)?;
                }
                if let Some(content) = &block.default_content {
                    validate_block_content(&block_type, content)?;
                }
            }
        }
        Ok(())
    }
}
