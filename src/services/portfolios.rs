use std::collections::HashSet;

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::{map_constraint, ServiceError};
use crate::db::now;
use crate::models::appearance::{Colors, Font};
use crate::models::portfolio::{
    validate_block_content, validate_block_order, validate_block_style, validate_block_type,
    validate_cover_image, validate_description, validate_portfolio_name, validate_portfolio_style,
    validate_section_key, validate_section_order, validate_section_style, validate_section_title,
    validate_status, CreateBlock, CreatePortfolio, CreateSection, Portfolio, PortfolioBlock,
    PortfolioSection, PortfolioStatus, UpdateBlock, UpdatePortfolio, UpdateSection, DEFAULT_BLOCK_TYPE,
};
use crate::models::validation::invalid;
use crate::services::appearance::{find_colors, find_font, first_active_font, first_colors};
use crate::services::templates::get_template;
use crate::services::{json_param, Page};

pub const DEFAULT_SECTION_KEY: &str = "my_works";
pub const DEFAULT_SECTION_TITLE: &str = "ผลงานของฉัน";
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 50;

const NOT_FOUND: &str = "Portfolio not found";
const SECTION_NOT_FOUND: &str = "Section not found";
const BLOCK_NOT_FOUND: &str = "Block not found";
const DUPLICATE_KEY: &str = "section key already exists in this portfolio";

const PORTFOLIO_COLUMNS: &str = "id, portfolio_name, description, status, portfolio_style, cover_image, \
     content_description, template_id, user_id, colors_id, font_id, created_at, updated_at";

fn portfolio_from_row(row: &Row) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        id: row.get(0)?,
        portfolio_name: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        portfolio_style: row.get(4)?,
        cover_image: row.get(5)?,
        content_description: row.get(6)?,
        template_id: row.get(7)?,
        user_id: row.get(8)?,
        colors_id: row.get(9)?,
        font_id: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        colors: None,
        font: None,
        portfolio_sections: Vec::new(),
    })
}

fn section_from_row(row: &Row) -> rusqlite::Result<PortfolioSection> {
    Ok(PortfolioSection {
        id: row.get(0)?,
        section_port_key: row.get(1)?,
        section_title: row.get(2)?,
        is_enabled: row.get(3)?,
        section_order: row.get(4)?,
        section_style: row.get(5)?,
        portfolio_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        portfolio_blocks: Vec::new(),
    })
}

fn block_from_row(row: &Row) -> rusqlite::Result<PortfolioBlock> {
    Ok(PortfolioBlock {
        id: row.get(0)?,
        block_port_type: row.get(1)?,
        block_order: row.get(2)?,
        block_style: row.get(3)?,
        content: row.get(4)?,
        portfolio_section_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const SECTION_COLUMNS: &str = "id, section_port_key, section_title, is_enabled, section_order, section_style, \
     portfolio_id, created_at, updated_at";
const BLOCK_COLUMNS: &str =
    "id, block_port_type, block_order, block_style, content, portfolio_section_id, created_at, updated_at";

/// Attach theme, font and ordered sections (optionally with blocks)
fn hydrate(conn: &Connection, mut portfolio: Portfolio, include_blocks: bool) -> Result<Portfolio, ServiceError> {
    portfolio.colors = find_colors(conn, portfolio.colors_id)?;
    portfolio.font = find_font(conn, portfolio.font_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM portfolio_sections WHERE portfolio_id = ?1 ORDER BY section_order, id",
        SECTION_COLUMNS
    ))?;
    let mut sections = stmt
        .query_map(params![portfolio.id], section_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    if include_blocks {
        let mut blocks = conn.prepare(&format!(
            "SELECT {} FROM portfolio_blocks WHERE portfolio_section_id = ?1 ORDER BY block_order, id",
            BLOCK_COLUMNS
        ))?;
        for section in &mut sections {
            section.portfolio_blocks = blocks
                .query_map(params![section.id], block_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
        }
    }
    portfolio.portfolio_sections = sections;
    Ok(portfolio)
}

fn find_portfolio(conn: &Connection, id: i64) -> Result<Option<Portfolio>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM portfolios WHERE id = ?1", PORTFOLIO_COLUMNS),
            params![id],
            portfolio_from_row,
        )
        .optional()?)
}

/// Owner of a portfolio, if it exists
pub fn portfolio_owner(conn: &Connection, id: i64) -> Result<Option<i64>, ServiceError> {
    Ok(conn
        .query_row("SELECT user_id FROM portfolios WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?)
}

/// Fetch a portfolio. `owner` restricts visibility to one user; reviewers pass None.
pub fn get_portfolio(
    conn: &Connection,
    id: i64,
    owner: Option<i64>,
    include_blocks: bool,
) -> Result<Portfolio, ServiceError> {
    let portfolio = find_portfolio(conn, id)?
        .filter(|p| owner.map_or(true, |user_id| p.user_id == user_id))
        .ok_or_else(|| ServiceError::not_found(NOT_FOUND))?;
    hydrate(conn, portfolio, include_blocks)
}

fn portfolio_count(conn: &Connection, user_id: i64) -> Result<i64, ServiceError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM portfolios WHERE user_id = ?1", params![user_id], |row| row.get(0))?)
}

fn demote_others(conn: &Connection, user_id: i64, keep_id: i64) -> Result<(), ServiceError> {
    conn.execute(
        "UPDATE portfolios SET status = 'draft' WHERE user_id = ?1 AND id <> ?2 AND status = 'active'",
        params![user_id, keep_id],
    )?;
    Ok(())
}

/// Make the most recently updated portfolio (other than `except`) active
fn promote_latest(conn: &Connection, user_id: i64, except: Option<i64>) -> Result<Option<i64>, ServiceError> {
    let next: Option<i64> = conn
        .query_row(
            "SELECT id FROM portfolios WHERE user_id = ?1 AND (?2 IS NULL OR id <> ?2)
             ORDER BY updated_at DESC, id DESC LIMIT 1",
            params![user_id, except],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = next {
        conn.execute("UPDATE portfolios SET status = 'active' WHERE id = ?1", params![id])?;
        debug!("Promoted portfolio {} to active for user {}", id, user_id);
    }
    Ok(next)
}

/// Theme for a new or edited portfolio; 0 or None picks the first one
fn resolve_colors(conn: &Connection, colors_id: Option<i64>) -> Result<Colors, ServiceError> {
    match colors_id.filter(|id| *id > 0) {
        Some(id) => find_colors(conn, id)?.ok_or_else(|| ServiceError::validation("selected color theme does not exist")),
        None => first_colors(conn)?.ok_or_else(|| ServiceError::validation("colors ID is required")),
    }
}

fn resolve_font(conn: &Connection, font_id: Option<i64>) -> Result<Font, ServiceError> {
    match font_id.filter(|id| *id > 0) {
        Some(id) => find_font(conn, id)?
            .filter(|f| f.is_active)
            .ok_or_else(|| ServiceError::validation("selected font is not available")),
        None => first_active_font(conn)?.ok_or_else(|| ServiceError::validation("font ID is required")),
    }
}

fn insert_section(
    conn: &Connection,
    portfolio_id: i64,
    key: &str,
    title: &str,
    enabled: bool,
    order: i64,
    style: Option<&serde_json::Value>,
) -> Result<i64, ServiceError> {
    let timestamp = now();
    conn.execute(
        "INSERT INTO portfolio_sections (section_port_key, section_title, is_enabled, section_order, section_style,
                                         portfolio_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![key, title, enabled, order, json_param(style), portfolio_id, timestamp],
    )
    .map_err(|e| map_constraint(e, DUPLICATE_KEY))?;
    Ok(conn.last_insert_rowid())
}

fn insert_block(
    conn: &Connection,
    section_id: i64,
    block_type: &str,
    order: i64,
    style: Option<&serde_json::Value>,
    content: Option<&serde_json::Value>,
) -> Result<i64, ServiceError> {
    let timestamp = now();
    conn.execute(
        "INSERT INTO portfolio_blocks (block_port_type, block_order, block_style, content, portfolio_section_id,
                                       created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![block_type, order, json_param(style), json_param(content), section_id, timestamp],
    )?;
    Ok(conn.last_insert_rowid())
}

fn touch(conn: &Connection, portfolio_id: i64) -> Result<(), ServiceError> {
    conn.execute("UPDATE portfolios SET updated_at = ?1 WHERE id = ?2", params![now(), portfolio_id])?;
    Ok(())
}

/// Create a portfolio with the default "my works" section
pub fn create_portfolio(conn: &mut Connection, user_id: i64, input: &CreatePortfolio) -> Result<Portfolio, ServiceError> {
    let name = validate_portfolio_name(&input.portfolio_name)?;
    validate_description(&input.description)?;
    let requested = match input.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(status) => validate_status(status)?,
        None => PortfolioStatus::Draft,
    };
    validate_cover_image(&input.cover_image)?;
    if let Some(style) = &input.portfolio_style {
        validate_portfolio_style(style)?;
    }
    let colors = resolve_colors(conn, input.colors_id)?;
    let font = resolve_font(conn, input.font_id)?;

    let tx = conn.transaction()?;
    let status = if portfolio_count(&tx, user_id)? == 0 {
        PortfolioStatus::Active
    } else {
        requested
    };
    let timestamp = now();
    tx.execute(
        "INSERT INTO portfolios (portfolio_name, description, status, portfolio_style, cover_image,
                                 content_description, user_id, colors_id, font_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            name,
            input.description.trim(),
            status.as_str(),
            json_param(input.portfolio_style.as_ref()),
            input.cover_image.trim(),
            input.content_description.trim(),
            user_id,
            colors.id,
            font.id,
            timestamp,
        ],
    )?;
    let id = tx.last_insert_rowid();
    if status == PortfolioStatus::Active {
        demote_others(&tx, user_id, id)?;
    }
    insert_section(&tx, id, DEFAULT_SECTION_KEY, DEFAULT_SECTION_TITLE, true, 1, None)?;
    tx.commit()?;

    info!("User {} created portfolio {} ({})", user_id, id, status.as_str());
    get_portfolio(conn, id, Some(user_id), true)
}

/// Fallback theme and font when an admin has not configured any
fn ensure_default_appearance(conn: &Connection) -> Result<(i64, i64), ServiceError> {
    let colors_id = match first_colors(conn)? {
        Some(colors) => colors.id,
        None => {
            conn.execute(
                "INSERT INTO colors (colors_name, primary_color, secondary_color, background_color, hex_value)
                 VALUES ('Default', '#000000', '#FFFFFF', '#F0F0F0', '#000000')",
                [],
            )?;
            conn.last_insert_rowid()
        }
    };
    let font_id = match first_active_font(conn)? {
        Some(font) => font.id,
        None => {
            conn.execute(
                "INSERT INTO fonts (font_name, font_family, font_category, is_active)
                 VALUES ('Roboto', 'Roboto, sans-serif', 'sans-serif', 1)",
                [],
            )?;
            conn.last_insert_rowid()
        }
    };
    Ok((colors_id, font_id))
}

/// Copy a template's sections and blocks into a fresh portfolio
pub fn create_from_template(
    conn: &mut Connection,
    user_id: i64,
    template_id: i64,
    portfolio_name: Option<&str>,
) -> Result<Portfolio, ServiceError> {
    let template = get_template(conn, template_id)?;
    let name = match portfolio_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => validate_portfolio_name(name)?,
        None => format!("My Portfolio from {}", template.template_name),
    };

    let tx = conn.transaction()?;
    let status = if portfolio_count(&tx, user_id)? == 0 {
        PortfolioStatus::Active
    } else {
        PortfolioStatus::Draft
    };
    let (colors_id, font_id) = ensure_default_appearance(&tx)?;
    let timestamp = now();
    tx.execute(
        "INSERT INTO portfolios (portfolio_name, status, template_id, user_id, colors_id, font_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![name, status.as_str(), template.id, user_id, colors_id, font_id, timestamp],
    )?;
    let id = tx.last_insert_rowid();
    if status == PortfolioStatus::Active {
        demote_others(&tx, user_id, id)?;
    }

    let mut used_keys = HashSet::new();
    for section in &template.sections {
        let mut key = section.section_name.clone();
        let mut suffix = 2;
        while !used_keys.insert(key.clone()) {
            key = format!("{}_{}", section.section_name, suffix);
            suffix += 1;
        }
        let section_id = insert_section(&tx, id, &key, &section.section_name, true, section.order_index, None)?;
        for block in &section.blocks {
            insert_block(
                &tx,
                section_id,
                &block.block_type,
                block.order_index,
                block.default_style.as_ref(),
                block.default_content.as_ref(),
            )?;
        }
    }
    tx.commit()?;

    info!("User {} created portfolio {} from template {}", user_id, id, template.id);
    get_portfolio(conn, id, Some(user_id), true)
}

/// One page of a user's portfolios, most recently updated first, with the total count
pub fn list_mine(
    conn: &Connection,
    user_id: i64,
    page: Page,
    include_blocks: bool,
) -> Result<(Vec<Portfolio>, i64), ServiceError> {
    let total = portfolio_count(conn, user_id)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM portfolios WHERE user_id = ?1 ORDER BY updated_at DESC, id DESC LIMIT ?2 OFFSET ?3",
        PORTFOLIO_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![user_id, page.limit, page.offset()], portfolio_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    let portfolios = rows
        .into_iter()
        .map(|p| hydrate(conn, p, include_blocks))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((portfolios, total))
}

pub fn get_active(conn: &Connection, user_id: i64) -> Result<Option<Portfolio>, ServiceError> {
    let active = conn
        .query_row(
            &format!(
                "SELECT {} FROM portfolios WHERE user_id = ?1 AND status = 'active' ORDER BY updated_at DESC LIMIT 1",
                PORTFOLIO_COLUMNS
            ),
            params![user_id],
            portfolio_from_row,
        )
        .optional()?;
    active.map(|p| hydrate(conn, p, true)).transpose()
}

/// Partial update; keeps at most one active portfolio per user
pub fn update_portfolio(
    conn: &mut Connection,
    user_id: i64,
    id: i64,
    update: &UpdatePortfolio,
) -> Result<Portfolio, ServiceError> {
    let mut portfolio = find_portfolio(conn, id)?
        .filter(|p| p.user_id == user_id)
        .ok_or_else(|| ServiceError::not_found(NOT_FOUND))?;
    let previous_status = PortfolioStatus::parse(&portfolio.status);

    if let Some(name) = &update.portfolio_name {
        portfolio.portfolio_name = validate_portfolio_name(name)?;
    }
    if let Some(description) = &update.description {
        validate_description(description)?;
        portfolio.description = description.trim().to_string();
    }
    let new_status = match &update.status {
        Some(status) => Some(validate_status(status)?),
        None => None,
    };
    if let Some(style) = &update.portfolio_style {
        validate_portfolio_style(style)?;
        portfolio.portfolio_style = Some(style.clone()).filter(|v| !v.is_null());
    }
    if let Some(cover) = &update.cover_image {
        validate_cover_image(cover)?;
        portfolio.cover_image = cover.trim().to_string();
    }
    if let Some(content) = &update.content_description {
        portfolio.content_description = content.trim().to_string();
    }
    if update.colors_id.is_some() {
        portfolio.colors_id = resolve_colors(conn, update.colors_id)?.id;
    }
    if update.font_id.is_some() {
        portfolio.font_id = resolve_font(conn, update.font_id)?.id;
    }
    if let Some(status) = new_status {
        portfolio.status = status.as_str().to_string();
    }

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE portfolios SET portfolio_name = ?1, description = ?2, status = ?3, portfolio_style = ?4,
                cover_image = ?5, content_description = ?6, colors_id = ?7, font_id = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            portfolio.portfolio_name,
            portfolio.description,
            portfolio.status,
            portfolio.portfolio_style,
            portfolio.cover_image,
            portfolio.content_description,
            portfolio.colors_id,
            portfolio.font_id,
            now(),
            id,
        ],
    )?;
    match new_status {
        Some(PortfolioStatus::Active) => demote_others(&tx, user_id, id)?,
        Some(_) if previous_status == Some(PortfolioStatus::Active) => {
            promote_latest(&tx, user_id, Some(id))?;
        }
        _ => {}
    }
    tx.commit()?;

    get_portfolio(conn, id, Some(user_id), true)
}

/// Delete a portfolio and everything under it; another one takes over as active
pub fn delete_portfolio(conn: &mut Connection, user_id: i64, id: i64) -> Result<(), ServiceError> {
    if portfolio_owner(conn, id)? != Some(user_id) {
        return Err(ServiceError::not_found(NOT_FOUND));
    }
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM portfolios WHERE id = ?1", params![id])?;
    let active: i64 = tx.query_row(
        "SELECT COUNT(*) FROM portfolios WHERE user_id = ?1 AND status = 'active'",
        params![user_id],
        |row| row.get(0),
    )?;
    if active == 0 {
        promote_latest(&tx, user_id, None)?;
    }
    tx.commit()?;
    info!("User {} deleted portfolio {}", user_id, id);
    Ok(())
}

// Sections

fn find_section(conn: &Connection, id: i64) -> Result<Option<PortfolioSection>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM portfolio_sections WHERE id = ?1", SECTION_COLUMNS),
            params![id],
            section_from_row,
        )
        .optional()?)
}

/// Section owned (through its portfolio) by the user
fn owned_section(conn: &Connection, user_id: i64, id: i64) -> Result<PortfolioSection, ServiceError> {
    let section = find_section(conn, id)?.ok_or_else(|| ServiceError::not_found(SECTION_NOT_FOUND))?;
    if portfolio_owner(conn, section.portfolio_id)? != Some(user_id) {
        return Err(ServiceError::not_found(SECTION_NOT_FOUND));
    }
    Ok(section)
}

fn load_section(conn: &Connection, id: i64) -> Result<PortfolioSection, ServiceError> {
    let mut section = find_section(conn, id)?.ok_or_else(|| ServiceError::not_found(SECTION_NOT_FOUND))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM portfolio_blocks WHERE portfolio_section_id = ?1 ORDER BY block_order, id",
        BLOCK_COLUMNS
    ))?;
    section.portfolio_blocks = stmt
        .query_map(params![id], block_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(section)
}

pub fn create_section(conn: &Connection, user_id: i64, input: &CreateSection) -> Result<PortfolioSection, ServiceError> {
    let key = validate_section_key(&input.section_port_key)?;
    let title = validate_section_title(&input.section_title)?;
    let order = input.section_order.unwrap_or(0);
    validate_section_order(order)?;
    let portfolio_id = match input.portfolio_id.filter(|id| *id > 0) {
        Some(id) => id,
        None => return invalid("portfolio ID is required"),
    };
    if let Some(style) = &input.section_style {
        validate_section_style(style)?;
    }
    if portfolio_owner(conn, portfolio_id)? != Some(user_id) {
        return Err(ServiceError::not_found(NOT_FOUND));
    }

    let id = insert_section(
        conn,
        portfolio_id,
        &key,
        &title,
        input.is_enabled.unwrap_or(true),
        order,
        input.section_style.as_ref(),
    )?;
    touch(conn, portfolio_id)?;
    load_section(conn, id)
}

pub fn update_section(
    conn: &Connection,
    user_id: i64,
    id: i64,
    update: &UpdateSection,
) -> Result<PortfolioSection, ServiceError> {
    let mut section = owned_section(conn, user_id, id)?;
    if let Some(title) = &update.section_title {
        section.section_title = validate_section_title(title)?;
    }
    if let Some(enabled) = update.is_enabled {
        section.is_enabled = enabled;
    }
    if let Some(order) = update.section_order {
        validate_section_order(order)?;
        section.section_order = order;
    }
    if let Some(style) = &update.section_style {
        validate_section_style(style)?;
        section.section_style = Some(style.clone()).filter(|v| !v.is_null());
    }

    conn.execute(
        "UPDATE portfolio_sections SET section_title = ?1, is_enabled = ?2, section_order = ?3, section_style = ?4,
                updated_at = ?5
         WHERE id = ?6",
        params![section.section_title, section.is_enabled, section.section_order, section.section_style, now(), id],
    )?;
    touch(conn, section.portfolio_id)?;
    load_section(conn, id)
}

pub fn delete_section(conn: &Connection, user_id: i64, id: i64) -> Result<(), ServiceError> {
    let section = owned_section(conn, user_id, id)?;
    conn.execute("DELETE FROM portfolio_sections WHERE id = ?1", params![id])?;
    touch(conn, section.portfolio_id)
}

// Blocks

fn find_block(conn: &Connection, id: i64) -> Result<Option<PortfolioBlock>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM portfolio_blocks WHERE id = ?1", BLOCK_COLUMNS),
            params![id],
            block_from_row,
        )
        .optional()?)
}

/// Block and the portfolio it belongs to, if the user owns that chain
fn owned_block(conn: &Connection, user_id: i64, id: i64) -> Result<(PortfolioBlock, i64), ServiceError> {
    let block = find_block(conn, id)?.ok_or_else(|| ServiceError::not_found(BLOCK_NOT_FOUND))?;
    let section =
        owned_section(conn, user_id, block.portfolio_section_id).map_err(|_| ServiceError::not_found(BLOCK_NOT_FOUND))?;
    Ok((block, section.portfolio_id))
}

pub fn create_block(conn: &Connection, user_id: i64, input: &CreateBlock) -> Result<PortfolioBlock, ServiceError> {
    let block_type = match input.block_port_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => validate_block_type(t)?,
        None => DEFAULT_BLOCK_TYPE.to_string(),
    };
    let order = input.block_order.unwrap_or(0);
    validate_block_order(order)?;
    let section_id = match input.portfolio_section_id.filter(|id| *id > 0) {
        Some(id) => id,
        None => return invalid("portfolio section ID is required"),
    };
    if let Some(style) = &input.block_style {
        validate_block_style(style)?;
    }
    if let Some(content) = &input.content {
        validate_block_content(&block_type, content)?;
    }
    let section = owned_section(conn, user_id, section_id)?;

    let id = insert_block(
        conn,
        section.id,
        &block_type,
        order,
        input.block_style.as_ref(),
        input.content.as_ref(),
    )?;
    touch(conn, section.portfolio_id)?;
    find_block(conn, id)?.ok_or_else(|| ServiceError::not_found(BLOCK_NOT_FOUND))
}

pub fn update_block(conn: &Connection, user_id: i64, id: i64, update: &UpdateBlock) -> Result<PortfolioBlock, ServiceError> {
    let (mut block, portfolio_id) = owned_block(conn, user_id, id)?;
    if let Some(content) = &update.content {
        validate_block_content(&block.block_port_type, content)?;
        block.content = Some(content.clone()).filter(|v| !v.is_null());
    }
    if let Some(order) = update.block_order {
        validate_block_order(order)?;
        block.block_order = order;
    }
    if let Some(style) = &update.block_style {
        validate_block_style(style)?;
        block.block_style = Some(style.clone()).filter(|v| !v.is_null());
    }

    conn.execute(
        "UPDATE portfolio_blocks SET content = ?1, block_order = ?2, block_style = ?3, updated_at = ?4 WHERE id = ?5",
        params![block.content, block.block_order, block.block_style, now(), id],
    )?;
    touch(conn, portfolio_id)?;
    find_block(conn, id)?.ok_or_else(|| ServiceError::not_found(BLOCK_NOT_FOUND))
}

pub fn delete_block(conn: &Connection, user_id: i64, id: i64) -> Result<(), ServiceError> {
    let (_, portfolio_id) = owned_block(conn, user_id, id)?;
    conn.execute("DELETE FROM portfolio_blocks WHERE id = ?1", params![id])?;
    touch(conn, portfolio_id)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn portfolio(conn: &mut Connection, user_id: i64, name: &str) -> Portfolio {
        let input = CreatePortfolio { portfolio_name: name.to_string(), ..Default::default() };
        create_portfolio(conn, user_id, &input).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::portfolio;
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::user::AccountType;
    use crate::services::users::fixtures::user;
    use serde_json::json;

    fn setup() -> (Connection, i64) {
        let conn = open_memory_database().unwrap();
        let student = user(&conn, "s@example.com", AccountType::Student);
        (conn, student.id)
    }

    fn status_of(conn: &Connection, id: i64) -> String {
        conn.query_row("SELECT status FROM portfolios WHERE id = ?1", params![id], |row| row.get(0))
            .unwrap()
    }

    fn backdate(conn: &Connection, id: i64, hours: i64) {
        conn.execute(
            "UPDATE portfolios SET updated_at = ?1 WHERE id = ?2",
            params![now() - chrono::Duration::hours(hours), id],
        )
        .unwrap();
    }

    #[test]
    fn test_first_portfolio_is_active_with_default_section() {
        let (mut conn, user_id) = setup();
        let first = portfolio(&mut conn, user_id, "  First  ");
        assert_eq!(first.portfolio_name, "First");
        assert_eq!(first.status, "active");
        assert_eq!(first.colors.as_ref().unwrap().colors_name, "Default");
        assert_eq!(first.font.as_ref().unwrap().font_name, "Roboto");
        assert_eq!(first.portfolio_sections.len(), 1);
        assert_eq!(first.portfolio_sections[0].section_port_key, "my_works");
        assert_eq!(first.portfolio_sections[0].section_title, "ผลงานของฉัน");

        let second = portfolio(&mut conn, user_id, "Second");
        assert_eq!(second.status, "draft");
    }

    #[test]
    fn test_creating_active_portfolio_demotes_others() {
        let (mut conn, user_id) = setup();
        let first = portfolio(&mut conn, user_id, "First");
        let input = CreatePortfolio {
            portfolio_name: "Second".to_string(),
            status: Some("active".to_string()),
            ..Default::default()
        };
        let second = create_portfolio(&mut conn, user_id, &input).unwrap();
        assert_eq!(second.status, "active");
        assert_eq!(status_of(&conn, first.id), "draft");
    }

    #[test]
    fn test_create_rejects_unknown_theme_and_inactive_font() {
        let (mut conn, user_id) = setup();
        let input = CreatePortfolio { portfolio_name: "P".into(), colors_id: Some(99), ..Default::default() };
        match create_portfolio(&mut conn, user_id, &input) {
            Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, "selected color theme does not exist"),
            other => panic!("unexpected result: {:?}", other.map(|p| p.id)),
        }

        conn.execute("UPDATE fonts SET is_active = 0 WHERE id = 2", []).unwrap();
        let input = CreatePortfolio { portfolio_name: "P".into(), font_id: Some(2), ..Default::default() };
        match create_portfolio(&mut conn, user_id, &input) {
            Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, "selected font is not available"),
            other => panic!("unexpected result: {:?}", other.map(|p| p.id)),
        }
    }

    #[test]
    fn test_deactivating_promotes_most_recent_other() {
        let (mut conn, user_id) = setup();
        let first = portfolio(&mut conn, user_id, "First");
        let older = portfolio(&mut conn, user_id, "Older");
        let newer = portfolio(&mut conn, user_id, "Newer");
        backdate(&conn, older.id, 2);
        backdate(&conn, newer.id, 1);

        let update = UpdatePortfolio { status: Some("archived".to_string()), ..Default::default() };
        let archived = update_portfolio(&mut conn, user_id, first.id, &update).unwrap();
        assert_eq!(archived.status, "archived");
        assert_eq!(status_of(&conn, newer.id), "active");
        assert_eq!(status_of(&conn, older.id), "draft");
    }

    #[test]
    fn test_lone_portfolio_keeps_requested_status() {
        let (mut conn, user_id) = setup();
        let only = portfolio(&mut conn, user_id, "Only");
        let update = UpdatePortfolio { status: Some("draft".to_string()), ..Default::default() };
        assert_eq!(update_portfolio(&mut conn, user_id, only.id, &update).unwrap().status, "draft");
    }

    #[test]
    fn test_activating_demotes_current_active() {
        let (mut conn, user_id) = setup();
        let first = portfolio(&mut conn, user_id, "First");
        let second = portfolio(&mut conn, user_id, "Second");
        let update = UpdatePortfolio { status: Some("active".to_string()), ..Default::default() };
        update_portfolio(&mut conn, user_id, second.id, &update).unwrap();
        assert_eq!(status_of(&conn, first.id), "draft");
        assert_eq!(get_active(&conn, user_id).unwrap().unwrap().id, second.id);
    }

    #[test]
    fn test_delete_active_reactivates_latest() {
        let (mut conn, user_id) = setup();
        let first = portfolio(&mut conn, user_id, "First");
        let second = portfolio(&mut conn, user_id, "Second");
        delete_portfolio(&mut conn, user_id, first.id).unwrap();
        assert_eq!(status_of(&conn, second.id), "active");

        delete_portfolio(&mut conn, user_id, second.id).unwrap();
        assert!(get_active(&conn, user_id).unwrap().is_none());
    }

    #[test]
    fn test_other_users_cannot_touch_portfolio() {
        let (mut conn, user_id) = setup();
        let other = user(&conn, "o@example.com", AccountType::Student);
        let mine = portfolio(&mut conn, user_id, "Mine");

        assert!(matches!(get_portfolio(&conn, mine.id, Some(other.id), true), Err(ServiceError::NotFound(_))));
        assert!(get_portfolio(&conn, mine.id, None, true).is_ok());
        assert!(matches!(delete_portfolio(&mut conn, other.id, mine.id), Err(ServiceError::NotFound(_))));

        let section_id = mine.portfolio_sections[0].id;
        let update = UpdateSection { section_title: Some("Hacked".into()), ..Default::default() };
        assert!(matches!(update_section(&conn, other.id, section_id, &update), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn test_list_mine_paginates_newest_first() {
        let (mut conn, user_id) = setup();
        for i in 0..3 {
            let p = portfolio(&mut conn, user_id, &format!("P{}", i));
            backdate(&conn, p.id, 10 - i);
        }
        let (page, total) = list_mine(&conn, user_id, Page::new(Some(1), Some(2), 10, 50), false).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].portfolio_name, "P2");
        assert!(page[0].portfolio_sections[0].portfolio_blocks.is_empty());
    }

    #[test]
    fn test_sections_and_blocks() {
        let (mut conn, user_id) = setup();
        let p = portfolio(&mut conn, user_id, "P");

        let duplicate = CreateSection {
            section_port_key: "my_works".into(),
            section_title: "Again".into(),
            portfolio_id: Some(p.id),
            ..Default::default()
        };
        match create_section(&conn, user_id, &duplicate) {
            Err(ServiceError::Conflict(msg)) => assert_eq!(msg, "section key already exists in this portfolio"),
            other => panic!("unexpected result: {:?}", other.map(|s| s.id)),
        }

        let section = create_section(
            &conn,
            user_id,
            &CreateSection {
                section_port_key: "about".into(),
                section_title: "About me".into(),
                section_order: Some(0),
                section_style: Some(json!({"background_color": "#FFFFFF", "font_size": "lg"})),
                portfolio_id: Some(p.id),
                ..Default::default()
            },
        )
        .unwrap();

        let block = create_block(
            &conn,
            user_id,
            &CreateBlock {
                content: Some(json!({"text": "hello"})),
                portfolio_section_id: Some(section.id),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(block.block_port_type, "text");

        let bad = UpdateBlock { content: Some(json!("plain string")), ..Default::default() };
        assert!(matches!(update_block(&conn, user_id, block.id, &bad), Err(ServiceError::ValidationError(_))));

        let moved = update_block(&conn, user_id, block.id, &UpdateBlock { block_order: Some(3), ..Default::default() })
            .unwrap();
        assert_eq!(moved.block_order, 3);
        assert_eq!(moved.content, Some(json!({"text": "hello"})));

        let loaded = get_portfolio(&conn, p.id, Some(user_id), true).unwrap();
        assert_eq!(loaded.portfolio_sections[0].section_port_key, "about");
        assert_eq!(loaded.portfolio_sections[0].portfolio_blocks.len(), 1);

        delete_section(&conn, user_id, section.id).unwrap();
        let blocks: i64 = conn.query_row("SELECT COUNT(*) FROM portfolio_blocks", [], |row| row.get(0)).unwrap();
        assert_eq!(blocks, 0);
    }

    #[test]
    fn test_block_requires_section() {
        let (conn, user_id) = setup();
        match create_block(&conn, user_id, &CreateBlock::default()) {
            Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, "portfolio section ID is required"),
            other => panic!("unexpected result: {:?}", other.map(|b| b.id)),
        }
    }

    #[test]
    fn test_use_template_copies_layout() {
        let (mut conn, user_id) = setup();
        let template = crate::services::templates::fixtures::classic(&mut conn);

        let created = create_from_template(&mut conn, user_id, template.id, None).unwrap();
        assert_eq!(created.portfolio_name, "My Portfolio from Classic");
        assert_eq!(created.status, "active");
        assert_eq!(created.template_id, Some(template.id));

        let keys: Vec<_> = created.portfolio_sections.iter().map(|s| s.section_port_key.as_str()).collect();
        assert_eq!(keys, vec!["about", "activities"]);
        let about = &created.portfolio_sections[0];
        assert_eq!(about.portfolio_blocks.len(), 2);
        assert_eq!(about.portfolio_blocks[0].block_port_type, "header");

        let named = create_from_template(&mut conn, user_id, template.id, Some("Mine")).unwrap();
        assert_eq!(named.portfolio_name, "Mine");
        assert_eq!(named.status, "draft");
    }

    #[test]
    fn test_use_template_creates_default_appearance_when_missing() {
        let (mut conn, user_id) = setup();
        let template = crate::services::templates::fixtures::classic(&mut conn);
        conn.execute_batch("DELETE FROM colors; DELETE FROM fonts;").unwrap();

        let created = create_from_template(&mut conn, user_id, template.id, None).unwrap();
        assert_eq!(created.colors.unwrap().background_color, "#F0F0F0");
        assert_eq!(created.font.unwrap().font_family, "Roboto, sans-serif");
    }
}
