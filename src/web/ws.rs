//! Live notification channel.
//!
//! A client opens `GET /ws?token=<session token>`. The connection is registered in the
//! [`NotificationHub`] under the session's user; anything the hub pushes for that user is
//! forwarded as a text frame. A text `ping` is answered with `pong`. Opening a second
//! connection for the same user drops the sender of the first, which ends its loop.

use actix_web::web::Bytes;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{CloseReason, Message, MessageStream, Session};
use futures::StreamExt;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::notifier::{NotificationHub, CLIENT_BUFFER};
use crate::services::auth::session_user;
use crate::web::models::WsQuery;
use crate::web::server::AppState;

pub async fn ws_connect(
    req: HttpRequest,
    body: web::Payload,
    data: web::Data<AppState>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = {
        let conn = data.db.lock().await;
        session_user(&conn, query.token.trim())?
    };

    let (response, session, stream) = actix_ws::handle(&req, body)?;
    actix_web::rt::spawn(run_session(data.hub.clone(), user.id, session, stream));
    Ok(response)
}

/// What the session loop does with one frame from the client
#[derive(Debug, PartialEq)]
enum Reply {
    Text(&'static str),
    Pong(Bytes),
    Close(Option<CloseReason>),
    Ignore,
}

fn reply_to(message: Message) -> Reply {
    match message {
        Message::Text(text) if text.trim() == "ping" => Reply::Text("pong"),
        Message::Ping(bytes) => Reply::Pong(bytes),
        Message::Close(reason) => Reply::Close(reason),
        _ => Reply::Ignore,
    }
}

async fn run_session(hub: Arc<NotificationHub>, user_id: i64, mut session: Session, mut stream: MessageStream) {
    let (tx, mut rx) = mpsc::channel::<String>(CLIENT_BUFFER);
    let connection_id = hub.register(user_id, tx);
    info!("Websocket connected for user {} ({} clients)", user_id, hub.connected_count());

    let reason: Option<CloseReason> = loop {
        tokio::select! {
            outgoing = rx.recv() => match outgoing {
                Some(text) => {
                    if session.text(text).await.is_err() {
                        warn!("Failed to push to user {}, dropping client", user_id);
                        break None;
                    }
                }
                None => {
                    debug!("Websocket for user {} replaced by a newer connection", user_id);
                    break None;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(message)) => match reply_to(message) {
                    Reply::Text(text) => {
                        if session.text(text).await.is_err() {
                            break None;
                        }
                    }
                    Reply::Pong(bytes) => {
                        if session.pong(&bytes).await.is_err() {
                            break None;
                        }
                    }
                    Reply::Close(reason) => break reason,
                    Reply::Ignore => {}
                },
                Some(Err(e)) => {
                    warn!("Websocket protocol error for user {}: {}", user_id, e);
                    break None;
                }
                None => break None,
            },
        }
    };

    hub.remove(user_id, connection_id);
    let _ = session.close(reason).await;
    info!("Websocket closed for user {}", user_id);
}
