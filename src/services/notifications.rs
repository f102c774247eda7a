use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::ServiceError;
use crate::core::notifier::{NotificationHub, PushMessage};
use crate::db::now;
use crate::models::announcement::{Notification, NotificationInput, NotificationUpdate};
use crate::services::users::student_ids;

const NOT_FOUND: &str = "Notification not found";
const COLUMNS: &str = "id, title, message, notification_type, is_read, user_id, announcement_id, created_at";

fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        notification_title: row.get(1)?,
        notification_message: row.get(2)?,
        notification_type: row.get(3)?,
        is_read: row.get(4)?,
        user_id: row.get(5)?,
        announcement_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Store without pushing; callers inside a transaction push after commit
pub(crate) fn insert(conn: &Connection, user_id: i64, input: &NotificationInput) -> Result<Notification, ServiceError> {
    conn.execute(
        "INSERT INTO notifications (title, message, notification_type, is_read, user_id, announcement_id, created_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
        params![
            input.notification_title.trim(),
            input.notification_message.trim(),
            input.notification_type.trim(),
            user_id,
            input.announcement_id,
            now(),
        ],
    )?;
    find(conn, conn.last_insert_rowid())?.ok_or_else(|| ServiceError::not_found(NOT_FOUND))
}

fn find(conn: &Connection, id: i64) -> Result<Option<Notification>, ServiceError> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM notifications WHERE id = ?1", COLUMNS),
            params![id],
            notification_from_row,
        )
        .optional()?)
}

/// Deliver a stored notification to the user's live connection, if any
pub fn push(hub: &NotificationHub, notification: &Notification) {
    match serde_json::to_value(notification) {
        Ok(data) => {
            if hub.send_to_user(notification.user_id, &PushMessage::new("notification", data)) {
                debug!("Pushed notification {} to user {}", notification.id, notification.user_id);
            }
        }
        Err(e) => warn!("Could not encode notification {}: {}", notification.id, e),
    }
}

/// Store a notification for one user and push it
pub fn notify_user(
    conn: &Connection,
    hub: &NotificationHub,
    user_id: i64,
    input: &NotificationInput,
) -> Result<Notification, ServiceError> {
    input.validate()?;
    let notification = insert(conn, user_id, input)?;
    push(hub, &notification);
    Ok(notification)
}

/// Store one notification per student in a single transaction, then push them
pub fn notify_students(
    conn: &mut Connection,
    hub: &NotificationHub,
    input: &NotificationInput,
) -> Result<usize, ServiceError> {
    input.validate()?;
    let tx = conn.transaction()?;
    let mut created = Vec::new();
    for user_id in student_ids(&tx)? {
        created.push(insert(&tx, user_id, input)?);
    }
    tx.commit()?;

    for notification in &created {
        push(hub, notification);
    }
    info!("Sent notification '{}' to {} students", input.notification_title.trim(), created.len());
    Ok(created.len())
}

pub fn list_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Notification>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        COLUMNS
    ))?;
    let notifications = stmt
        .query_map(params![user_id], notification_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(notifications)
}

pub fn unread_count(conn: &Connection, user_id: i64) -> Result<i64, ServiceError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
        |row| row.get(0),
    )?)
}

/// A notification of the user; other users' rows look missing
pub fn get_own(conn: &Connection, user_id: i64, id: i64) -> Result<Notification, ServiceError> {
    find(conn, id)?
        .filter(|n| n.user_id == user_id)
        .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
}

pub fn update_own(
    conn: &Connection,
    user_id: i64,
    id: i64,
    update: &NotificationUpdate,
) -> Result<Notification, ServiceError> {
    let mut notification = get_own(conn, user_id, id)?;
    if let Some(title) = &update.notification_title {
        notification.notification_title = title.trim().to_string();
    }
    if let Some(message) = &update.notification_message {
        notification.notification_message = message.trim().to_string();
    }
    if let Some(kind) = &update.notification_type {
        notification.notification_type = kind.trim().to_string();
    }
    if let Some(is_read) = update.is_read {
        notification.is_read = is_read;
    }
    if notification.notification_title.is_empty() {
        return Err(ServiceError::validation("Notification title is required"));
    }
    if notification.notification_message.is_empty() {
        return Err(ServiceError::validation("Notification message is required"));
    }

    conn.execute(
        "UPDATE notifications SET title = ?1, message = ?2, notification_type = ?3, is_read = ?4 WHERE id = ?5",
        params![
            notification.notification_title,
            notification.notification_message,
            notification.notification_type,
            notification.is_read,
            id,
        ],
    )?;
    Ok(notification)
}

pub fn delete_own(conn: &Connection, user_id: i64, id: i64) -> Result<(), ServiceError> {
    let affected = conn.execute(
        "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if affected == 0 {
        return Err(ServiceError::not_found(NOT_FOUND));
    }
    Ok(())
}

pub fn mark_read(conn: &Connection, user_id: i64, id: i64) -> Result<Notification, ServiceError> {
    let affected = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if affected == 0 {
        return Err(ServiceError::not_found(NOT_FOUND));
    }
    get_own(conn, user_id, id)
}

/// Mark every unread notification of the user as read, returning how many changed
pub fn mark_all_read(conn: &Connection, user_id: i64) -> Result<usize, ServiceError> {
    Ok(conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::user::AccountType;
    use crate::services::users::fixtures::user;
    use tokio::sync::mpsc;

    fn input(title: &str) -> NotificationInput {
        NotificationInput {
            notification_title: title.to_string(),
            notification_message: "Details inside".to_string(),
            notification_type: "system".to_string(),
            announcement_id: None,
        }
    }

    #[test]
    fn test_notify_user_pushes_to_live_connection() {
        let conn = open_memory_database().unwrap();
        let hub = NotificationHub::new();
        let student = user(&conn, "s@example.com", AccountType::Student);
        let (tx, mut rx) = mpsc::channel(8);
        hub.register(student.id, tx);

        let created = notify_user(&conn, &hub, student.id, &input("Hello")).unwrap();
        assert!(!created.is_read);

        let pushed: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(pushed["type"], "notification");
        assert_eq!(pushed["data"]["notification_title"], "Hello");
        assert_eq!(pushed["data"]["ID"], created.id);
    }

    #[test]
    fn test_students_fan_out_skips_staff() {
        let mut conn = open_memory_database().unwrap();
        let hub = NotificationHub::new();
        let s1 = user(&conn, "s1@example.com", AccountType::Student);
        user(&conn, "s2@example.com", AccountType::Student);
        let teacher = user(&conn, "t@example.com", AccountType::Teacher);

        assert_eq!(notify_students(&mut conn, &hub, &input("Exam")).unwrap(), 2);
        assert_eq!(unread_count(&conn, s1.id).unwrap(), 1);
        assert!(list_for_user(&conn, teacher.id).unwrap().is_empty());
    }

    #[test]
    fn test_blank_notification_rejected() {
        let conn = open_memory_database().unwrap();
        let hub = NotificationHub::new();
        let student = user(&conn, "s@example.com", AccountType::Student);
        assert!(matches!(
            notify_user(&conn, &hub, student.id, &input("  ")),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_own_notifications_only() {
        let conn = open_memory_database().unwrap();
        let hub = NotificationHub::new();
        let owner = user(&conn, "a@example.com", AccountType::Student);
        let other = user(&conn, "b@example.com", AccountType::Student);
        let n = notify_user(&conn, &hub, owner.id, &input("Mine")).unwrap();

        assert!(matches!(get_own(&conn, other.id, n.id), Err(ServiceError::NotFound(_))));
        assert!(matches!(mark_read(&conn, other.id, n.id), Err(ServiceError::NotFound(_))));
        assert!(matches!(delete_own(&conn, other.id, n.id), Err(ServiceError::NotFound(_))));

        assert!(mark_read(&conn, owner.id, n.id).unwrap().is_read);
        delete_own(&conn, owner.id, n.id).unwrap();
        assert!(list_for_user(&conn, owner.id).unwrap().is_empty());
    }

    #[test]
    fn test_read_all_and_update() {
        let conn = open_memory_database().unwrap();
        let hub = NotificationHub::new();
        let owner = user(&conn, "a@example.com", AccountType::Student);
        let first = notify_user(&conn, &hub, owner.id, &input("One")).unwrap();
        notify_user(&conn, &hub, owner.id, &input("Two")).unwrap();

        let update = NotificationUpdate { notification_title: Some("Renamed".into()), ..Default::default() };
        assert_eq!(update_own(&conn, owner.id, first.id, &update).unwrap().notification_title, "Renamed");

        assert_eq!(mark_all_read(&conn, owner.id).unwrap(), 2);
        assert_eq!(unread_count(&conn, owner.id).unwrap(), 0);
        assert_eq!(mark_all_read(&conn, owner.id).unwrap(), 0);
    }
}
