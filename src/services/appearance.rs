use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::{map_constraint, ServiceError};
use crate::models::appearance::{Colors, ColorsInput, Font, FontInput};

const COLORS_COLUMNS: &str = "id, colors_name, primary_color, secondary_color, background_color, hex_value";
const FONT_COLUMNS: &str = "id, font_name, font_family, font_category, font_variant, font_url, is_active";

fn colors_from_row(row: &Row) -> rusqlite::Result<Colors> {
    Ok(Colors {
        id: row.get(0)?,
        colors_name: row.get(1)?,
        primary_color: row.get(2)?,
        secondary_color: row.get(3)?,
        background_color: row.get(4)?,
        hex_value: row.get(5)?,
    })
}

fn font_from_row(row: &Row) -> rusqlite::Result<Font> {
    Ok(Font {
        id: row.get(0)?,
        font_name: row.get(1)?,
        font_family: row.get(2)?,
        font_category: row.get(3)?,
        font_variant: row.get(4)?,
        font_url: row.get(5)?,
        is_active: row.get(6)?,
    })
}

pub fn list_colors(conn: &Connection) -> Result<Vec<Colors>, ServiceError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM colors ORDER BY id", COLORS_COLUMNS))?;
    let colors = stmt.query_map([], colors_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(colors)
}

pub fn find_colors(conn: &Connection, id: i64) -> Result<Option<Colors>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM colors WHERE id = ?1", COLORS_COLUMNS),
            params![id],
            colors_from_row,
        )
        .optional()?)
}

pub fn get_colors(conn: &Connection, id: i64) -> Result<Colors, ServiceError> {
    find_colors(conn, id)?.ok_or_else(|| ServiceError::not_found("Colors not found"))
}

/// Lowest-id theme, used when a portfolio asks for "any"
pub fn first_colors(conn: &Connection) -> Result<Option<Colors>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM colors ORDER BY id LIMIT 1", COLORS_COLUMNS),
            [],
            colors_from_row,
        )
        .optional()?)
}

pub fn create_colors(conn: &Connection, input: &ColorsInput) -> Result<Colors, ServiceError> {
    input.validate()?;
    conn.execute(
        "INSERT INTO colors (colors_name, primary_color, secondary_color, background_color, hex_value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            input.colors_name.trim(),
            input.primary_color.trim(),
            input.secondary_color.trim(),
            input.background_color.trim(),
            input.hex_value.trim(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!("Created color theme {}", id);
    get_colors(conn, id)
}

pub fn update_colors(conn: &Connection, id: i64, input: &ColorsInput) -> Result<Colors, ServiceError> {
    input.validate()?;
    let affected = conn.execute(
        "UPDATE colors SET colors_name = ?1, primary_color = ?2, secondary_color = ?3,
                background_color = ?4, hex_value = ?5
         WHERE id = ?6",
        params![
            input.colors_name.trim(),
            input.primary_color.trim(),
            input.secondary_color.trim(),
            input.background_color.trim(),
            input.hex_value.trim(),
            id,
        ],
    )?;
    if affected == 0 {
        return Err(ServiceError::not_found("Colors not found"));
    }
    get_colors(conn, id)
}

pub fn delete_colors(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn
        .execute("DELETE FROM colors WHERE id = ?1", params![id])
        .map_err(|e| map_constraint(e, "colors already exist"))?;
    if affected == 0 {
        return Err(ServiceError::not_found("Colors not found"));
    }
    Ok(())
}

/// Fonts for the editor; admins also see inactive ones
pub fn list_fonts(conn: &Connection, include_inactive: bool) -> Result<Vec<Font>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM fonts WHERE ?1 OR is_active = 1 ORDER BY id",
        FONT_COLUMNS
    ))?;
    let fonts = stmt
        .query_map(params![include_inactive], font_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fonts)
}

pub fn find_font(conn: &Connection, id: i64) -> Result<Option<Font>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM fonts WHERE id = ?1", FONT_COLUMNS),
            params![id],
            font_from_row,
        )
        .optional()?)
}

pub fn get_font(conn: &Connection, id: i64) -> Result<Font, ServiceError> {
    find_font(conn, id)?.ok_or_else(|| ServiceError::not_found("Font not found"))
}

pub fn first_active_font(conn: &Connection) -> Result<Option<Font>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM fonts WHERE is_active = 1 ORDER BY id LIMIT 1", FONT_COLUMNS),
            [],
            font_from_row,
        )
        .optional()?)
}

pub fn create_font(conn: &Connection, input: &FontInput) -> Result<Font, ServiceError> {
    input.validate()?;
    conn.execute(
        "INSERT INTO fonts (font_name, font_family, font_category, font_variant, font_url, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.font_name.trim(),
            input.font_family.trim(),
            input.font_category.trim(),
            input.font_variant.trim(),
            input.font_url.trim(),
            input.is_active,
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!("Created font {}", id);
    get_font(conn, id)
}

pub fn update_font(conn: &Connection, id: i64, input: &FontInput) -> Result<Font, ServiceError> {
    input.validate()?;
    let affected = conn.execute(
        "UPDATE fonts SET font_name = ?1, font_family = ?2, font_category = ?3, font_variant = ?4,
                font_url = ?5, is_active = ?6
         WHERE id = ?7",
        params![
            input.font_name.trim(),
            input.font_family.trim(),
            input.font_category.trim(),
            input.font_variant.trim(),
            input.font_url.trim(),
            input.is_active,
            id,
        ],
    )?;
    if affected == 0 {
        return Err(ServiceError::not_found("Font not found"));
    }
    get_font(conn, id)
}

pub fn delete_font(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn
        .execute("DELETE FROM fonts WHERE id = ?1", params![id])
        .map_err(|e| map_constraint(e, "font already exists"))?;
    if affected == 0 {
        return Err(ServiceError::not_found("Font not found"));
    }
    Ok(())
}
