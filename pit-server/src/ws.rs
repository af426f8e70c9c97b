use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::sink::SinkExt;
use futures_util::stream::{SplitSink, StreamExt};
use pit_core::types::{Asset, STARTING_ASSETS, STARTING_CASH, UserId};
use tokio::sync::broadcast::error::RecvError;

use crate::AppState;
use crate::messages::{IncomingMessage, MessageType, OutgoingMessage};

/// Upgrades `/asset/{name}` to the book's WebSocket feed.
pub async fn asset_ws(
    Path(asset_name): Path<String>,
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(asset) = Asset::from_route_name(&asset_name) else {
        return (StatusCode::NOT_FOUND, "no such asset").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(app, asset, socket))
}

async fn handle_socket(app: AppState, asset: Asset, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let mut feed = app.topics[asset.index()].subscribe();
    // The connection's authenticated user, set by its REGISTER message.
    let mut user: Option<UserId> = None;

    tracing::debug!(asset = %asset, "client connected");
    loop {
        tokio::select! {
            published = feed.recv() => match published {
                Ok(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // A slow client that missed events just keeps listening.
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(asset = %asset, missed, "client fell behind broadcast");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_message(&app, asset, &mut user, &mut sink, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::debug!(asset = %asset, %error, "client socket error");
                    break;
                }
            },
        }
    }
    tracing::debug!(asset = %asset, user_id = ?user, "client disconnected");
}

async fn handle_message(
    app: &AppState,
    asset: Asset,
    user: &mut Option<UserId>,
    sink: &mut SplitSink<WebSocket, Message>,
    text: &str,
) {
    let incoming: IncomingMessage = match serde_json::from_str(text) {
        Ok(incoming) => incoming,
        Err(error) => {
            reply(sink, &OutgoingMessage::error(error.to_string())).await;
            return;
        }
    };

    if let Some(named) = incoming.asset
        && named != asset
    {
        reply(
            sink,
            &OutgoingMessage::error(format!("this socket trades {asset}, not {named}")),
        )
        .await;
        return;
    }

    match incoming.kind {
        MessageType::Register => handle_register(app, asset, user, sink, &incoming).await,
        MessageType::Order => handle_order(app, asset, *user, sink, &incoming).await,
        MessageType::Cancel => handle_cancel(app, asset, *user, sink, &incoming).await,
        MessageType::Error => {}
    }
}

async fn handle_register(
    app: &AppState,
    asset: Asset,
    user: &mut Option<UserId>,
    sink: &mut SplitSink<WebSocket, Message>,
    incoming: &IncomingMessage,
) {
    if user.is_some() {
        return;
    }
    let Some(user_id) = incoming.user_id else {
        reply(
            sink,
            &OutgoingMessage::error("must include user_id when registering"),
        )
        .await;
        return;
    };

    let handle = app.handle(asset).clone();
    let joined = tokio::task::spawn_blocking(move || {
        handle.register(user_id, STARTING_CASH, STARTING_ASSETS);
    })
    .await;
    if joined.is_err() {
        reply(sink, &OutgoingMessage::error("registration failed")).await;
        return;
    }
    if let Some(username) = &incoming.username {
        app.registry.record_name(user_id, username);
    }

    *user = Some(user_id);
    reply(sink, &OutgoingMessage::registered(user_id, incoming.username.clone())).await;
}

async fn handle_order(
    app: &AppState,
    asset: Asset,
    user: Option<UserId>,
    sink: &mut SplitSink<WebSocket, Message>,
    incoming: &IncomingMessage,
) {
    if !app.accepting() {
        return;
    }
    let Some(user_id) = user else {
        reply(
            sink,
            &OutgoingMessage::error(format!("not registered on the {asset} book")),
        )
        .await;
        return;
    };
    let (Some(side), Some(price), Some(volume)) = (incoming.side, incoming.price, incoming.volume)
    else {
        reply(
            sink,
            &OutgoingMessage::error("an order needs side, price, and volume"),
        )
        .await;
        return;
    };

    let handle = app.handle(asset).clone();
    let placed = tokio::task::spawn_blocking(move || handle.place(side, user_id, price, volume)).await;
    let outgoing = match placed {
        Ok(Ok(result)) => OutgoingMessage::order(result),
        Ok(Err(rejection)) => OutgoingMessage::order_error(rejection.to_string()),
        Err(_) => OutgoingMessage::error("order failed"),
    };
    // Every order outcome goes to the whole book, the sender included.
    app.publish(asset, &outgoing);
}

async fn handle_cancel(
    app: &AppState,
    asset: Asset,
    user: Option<UserId>,
    sink: &mut SplitSink<WebSocket, Message>,
    incoming: &IncomingMessage,
) {
    if !app.accepting() {
        return;
    }
    if user.is_none() {
        reply(
            sink,
            &OutgoingMessage::error(format!("not registered on the {asset} book")),
        )
        .await;
        return;
    }
    let Some(order_id) = incoming.order_id else {
        reply(
            sink,
            &OutgoingMessage::error("must include order_id when cancelling"),
        )
        .await;
        return;
    };

    let handle = app.handle(asset).clone();
    let cancelled = tokio::task::spawn_blocking(move || handle.cancel(order_id)).await;
    match cancelled {
        Ok(Ok(())) => app.publish(asset, &OutgoingMessage::cancelled(order_id)),
        Ok(Err(rejection)) => reply(sink, &OutgoingMessage::error(rejection.to_string())).await,
        Err(_) => reply(sink, &OutgoingMessage::error("cancel failed")).await,
    }
}

async fn reply(sink: &mut SplitSink<WebSocket, Message>, outgoing: &OutgoingMessage) {
    let _ = sink.send(Message::Text(outgoing.to_json().into())).await;
}
