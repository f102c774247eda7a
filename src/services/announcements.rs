use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::ServiceError;
use crate::core::notifier::NotificationHub;
use crate::db::now;
use crate::models::announcement::{
    Announcement, AnnouncementCategory, AnnouncementInput, AnnouncementStatus, Notification, NotificationInput,
};
use crate::services::notifications;
use crate::services::users::student_ids;

const NOT_FOUND: &str = "Announcement not found";
pub const ANNOUNCEMENT_NOTIFICATION_TYPE: &str = "announcement";
/// Longest announcement excerpt carried in a notification message
const EXCERPT_CHARS: usize = 200;

const SELECT: &str = "SELECT a.id, a.title, a.content, a.status, a.is_pinned, a.scheduled_publish_at, a.published_at,
        a.expires_at, a.user_id, a.category_id, c.name, a.created_at, a.updated_at
     FROM announcements a
     LEFT JOIN announcement_categories c ON c.id = a.category_id";

fn announcement_from_row(row: &Row) -> rusqlite::Result<Announcement> {
    let category_id: i64 = row.get(9)?;
    let category_name: Option<String> = row.get(10)?;
    Ok(Announcement {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        status: row.get(3)?,
        is_pinned: row.get(4)?,
        scheduled_publish_at: row.get(5)?,
        published_at: row.get(6)?,
        expires_at: row.get(7)?,
        user_id: row.get(8)?,
        category_id,
        category: category_name.map(|name| AnnouncementCategory { id: category_id, name }),
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn list_categories(conn: &Connection) -> Result<Vec<AnnouncementCategory>, ServiceError> {
    let mut stmt = conn.prepare("SELECT id, name FROM announcement_categories ORDER BY id")?;
    let categories = stmt
        .query_map([], |row| Ok(AnnouncementCategory { id: row.get(0)?, name: row.get(1)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

fn ensure_category(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM announcement_categories WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(ServiceError::validation("Category not found")),
    }
}

pub fn get_announcement(conn: &Connection, id: i64) -> Result<Announcement, ServiceError> {
    conn.query_row(&format!("{} WHERE a.id = ?1", SELECT), params![id], announcement_from_row)
        .optional()?
        .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
}

/// A published, unexpired announcement; anything else looks missing to the public
pub fn get_public(conn: &Connection, id: i64) -> Result<Announcement, ServiceError> {
    let announcement = get_announcement(conn, id)?;
    let expired = announcement.expires_at.map_or(false, |at| at <= now());
    if announcement.status != AnnouncementStatus::Published.as_str() || expired {
        return Err(ServiceError::not_found(NOT_FOUND));
    }
    Ok(announcement)
}

/// Published and unexpired, pinned first then newest
pub fn list_public(conn: &Connection) -> Result<Vec<Announcement>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE a.status = 'published' AND (a.expires_at IS NULL OR a.expires_at > ?1)
         ORDER BY a.is_pinned DESC, a.published_at DESC, a.id DESC",
        SELECT
    ))?;
    let announcements = stmt
        .query_map(params![now()], announcement_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(announcements)
}

pub fn list_all(conn: &Connection) -> Result<Vec<Announcement>, ServiceError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY a.created_at DESC, a.id DESC", SELECT))?;
    let announcements = stmt
        .query_map([], announcement_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(announcements)
}

fn excerpt(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() <= EXCERPT_CHARS {
        content.to_string()
    } else {
        let cut: String = content.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

/// Store one notification per student for a published announcement
fn fan_out(conn: &Connection, announcement: &Announcement) -> Result<Vec<Notification>, ServiceError> {
    let input = NotificationInput {
        notification_title: announcement.title.clone(),
        notification_message: excerpt(&announcement.content),
        notification_type: ANNOUNCEMENT_NOTIFICATION_TYPE.to_string(),
        announcement_id: Some(announcement.id),
    };
    student_ids(conn)?
        .into_iter()
        .map(|user_id| notifications::insert(conn, user_id, &input))
        .collect()
}

fn push_all(hub: &NotificationHub, created: &[Notification]) {
    for notification in created {
        notifications::push(hub, notification);
    }
}

pub fn create_announcement(
    conn: &mut Connection,
    hub: &NotificationHub,
    author_id: i64,
    input: &AnnouncementInput,
) -> Result<Announcement, ServiceError> {
    let status = input.validate()?;
    let category_id = input.category_id.unwrap_or_default();
    ensure_category(conn, category_id)?;

    let timestamp = now();
    let published_at = (status == AnnouncementStatus::Published).then_some(timestamp);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO announcements (title, content, status, is_pinned, scheduled_publish_at, published_at, expires_at,
                                    user_id, category_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            input.title.trim(),
            input.content.trim(),
            status.as_str(),
            input.is_pinned,
            input.scheduled_publish_at,
            published_at,
            input.expires_at,
            author_id,
            category_id,
            timestamp,
        ],
    )?;
    let announcement = get_announcement(&tx, tx.last_insert_rowid())?;
    let created = if input.send_notification && status == AnnouncementStatus::Published {
        fan_out(&tx, &announcement)?
    } else {
        Vec::new()
    };
    tx.commit()?;

    push_all(hub, &created);
    info!(
        "Announcement {} created by user {} ({}, {} notifications)",
        announcement.id,
        author_id,
        announcement.status,
        created.len()
    );
    Ok(announcement)
}

/// Replace an announcement; publishing for the first time stamps published_at
pub fn update_announcement(
    conn: &mut Connection,
    hub: &NotificationHub,
    id: i64,
    input: &AnnouncementInput,
) -> Result<Announcement, ServiceError> {
    let status = input.validate()?;
    let category_id = input.category_id.unwrap_or_default();
    let existing = get_announcement(conn, id)?;
    ensure_category(conn, category_id)?;

    let timestamp = now();
    let published_at = match status {
        AnnouncementStatus::Published => Some(existing.published_at.unwrap_or(timestamp)),
        _ => existing.published_at,
    };

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE announcements
         SET title = ?1, content = ?2, status = ?3, is_pinned = ?4, scheduled_publish_at = ?5, published_at = ?6,
             expires_at = ?7, category_id = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            input.title.trim(),
            input.content.trim(),
            status.as_str(),
            input.is_pinned,
            input.scheduled_publish_at,
            published_at,
            input.expires_at,
            category_id,
            timestamp,
            id,
        ],
    )?;
    let announcement = get_announcement(&tx, id)?;
    let created = if input.send_notification && status == AnnouncementStatus::Published {
        fan_out(&tx, &announcement)?
    } else {
        Vec::new()
    };
    tx.commit()?;

    push_all(hub, &created);
    info!("Announcement {} updated ({}, {} notifications)", id, announcement.status, created.len());
    Ok(announcement)
}

pub fn delete_announcement(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn.execute("DELETE FROM announcements WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(ServiceError::not_found(NOT_FOUND));
    }
    info!("Announcement {} deleted", id);
    Ok(())
}
