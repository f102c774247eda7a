use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::ServiceError;
use crate::db::now;
use crate::models::template::{Template, TemplateBlock, TemplateInput, TemplateSection};
use crate::services::json_param;

fn load_sections(conn: &Connection, template_id: i64) -> Result<Vec<TemplateSection>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, section_name, order_index FROM template_sections
         WHERE template_id = ?1 ORDER BY order_index, id",
    )?;
    let mut sections = stmt
        .query_map(params![template_id], |row| {
            Ok(TemplateSection {
                id: row.get(0)?,
                section_name: row.get(1)?,
                order_index: row.get(2)?,
                blocks: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut blocks = conn.prepare(
        "SELECT id, block_name, block_type, default_content, default_style, order_index
         FROM template_blocks WHERE template_section_id = ?1 ORDER BY order_index, id",
    )?;
    for section in &mut sections {
        section.blocks = blocks
            .query_map(params![section.id], |row| {
                Ok(TemplateBlock {
                    id: row.get(0)?,
                    block_name: row.get(1)?,
                    block_type: row.get(2)?,
                    default_content: row.get(3)?,
                    default_style: row.get(4)?,
                    order_index: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
    }
    Ok(sections)
}

pub fn get_template(conn: &Connection, id: i64) -> Result<Template, ServiceError> {
    let mut template = conn
        .query_row(
            "SELECT id, template_name, description, thumbnail, created_at FROM templates WHERE id = ?1",
            params![id],
            |row| {
                Ok(Template {
                    id: row.get(0)?,
                    template_name: row.get(1)?,
                    description: row.get(2)?,
                    thumbnail: row.get(3)?,
                    created_at: row.get(4)?,
                    sections: Vec::new(),
                })
            },
        )
        .optional()?
        .ok_or_else(|| ServiceError::not_found("Template not found"))?;
    template.sections = load_sections(conn, id)?;
    Ok(template)
}

pub fn list_templates(conn: &Connection) -> Result<Vec<Template>, ServiceError> {
    let ids = {
        let mut stmt = conn.prepare("SELECT id FROM templates ORDER BY id")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<i64>, _>>()?;
        ids
    };
    ids.into_iter().map(|id| get_template(conn, id)).collect()
}

/// Store a template with its sections and blocks in one transaction
pub fn create_template(conn: &mut Connection, input: &TemplateInput) -> Result<Template, ServiceError> {
    input.validate()?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO templates (template_name, description, thumbnail, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![input.template_name.trim(), input.description.trim(), input.thumbnail.trim(), now()],
    )?;
    let template_id = tx.last_insert_rowid();

    for section in &input.sections {
        tx.execute(
            "INSERT INTO template_sections (template_id, section_name, order_index) VALUES (?1, ?2, ?3)",
            params![template_id, section.section_name.trim(), section.order_index],
        )?;
        let section_id = tx.last_insert_rowid();
        for block in &section.blocks {
            tx.execute(
                "INSERT INTO template_blocks (template_section_id, block_name, block_type, default_content,
                                              default_style, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    section_id,
                    block.block_name.trim(),
                    block.block_type.trim(),
                    json_param(block.default_content.as_ref()),
                    json_param(block.default_style.as_ref()),
                    block.order_index,
                ],
            )?;
        }
    }
    tx.commit()?;

    info!("Created template {} with {} sections", template_id, input.sections.len());
    get_template(conn, template_id)
}

pub fn delete_template(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn.execute("DELETE FROM templates WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(ServiceError::not_found("Template not found"));
    }
    info!("Deleted template {}", id);
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    /// Two sections given out of order, each with blocks
    pub fn classic(conn: &mut Connection) -> Template {
        let input: TemplateInput = serde_json::from_value(json!({
            "template_name": "Classic",
            "description": "Two sections",
            "sections": [
                {"section_name": "activities", "order_index": 2, "blocks": [
                    {"block_type": "activity", "order_index": 1}
                ]},
                {"section_name": "about", "order_index": 1, "blocks": [
                    {"block_type": "text", "default_content": {"text": "World"}, "order_index": 2},
                    {"block_type": "header", "default_content": {"title": "Hello"}, "order_index": 1}
                ]}
            ]
        }))
        .unwrap();
        create_template(conn, &input).unwrap()
    }
}
