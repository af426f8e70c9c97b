use pit_core::types::{Asset, Order, OrderId, OrderResult, Price, Side, Trade, UserId, Volume};
use serde::{Deserialize, Serialize};

/// Wire message kinds, shared by both directions.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Register,
    Order,
    Cancel,
    Error,
}

/// IncomingMessage is any client message. Every field beyond the type
/// tag is optional so handlers can report exactly what is missing;
/// field order on the wire does not matter.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub asset: Option<Asset>,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub volume: Option<Volume>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// OutgoingMessage is any server message. Absent fields are omitted
/// from the JSON rather than sent as null.
#[derive(Debug, Serialize)]
pub struct OutgoingMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trades: Option<Vec<Trade>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched_order: Option<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutgoingMessage {
    fn new(kind: MessageType) -> Self {
        Self {
            kind,
            user_id: None,
            username: None,
            trades: None,
            unmatched_order: None,
            order_id: None,
            error: None,
        }
    }

    /// A free-form error reply.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            error: Some(text.into()),
            ..Self::new(MessageType::Error)
        }
    }

    /// Acknowledges a registration, echoing any display name.
    pub fn registered(user_id: UserId, username: Option<String>) -> Self {
        Self {
            user_id: Some(user_id),
            username,
            ..Self::new(MessageType::Register)
        }
    }

    /// The outcome of a placed order, fills and remainder included.
    pub fn order(result: OrderResult) -> Self {
        Self {
            trades: Some(result.trades),
            unmatched_order: result.unmatched,
            ..Self::new(MessageType::Order)
        }
    }

    /// A rejected order.
    pub fn order_error(text: impl Into<String>) -> Self {
        Self {
            error: Some(text.into()),
            ..Self::new(MessageType::Order)
        }
    }

    /// Acknowledges a cancellation.
    pub fn cancelled(order_id: OrderId) -> Self {
        Self {
            order_id: Some(order_id),
            ..Self::new(MessageType::Cancel)
        }
    }

    /// Encodes for the wire. Encoding a message we built cannot fail
    /// short of a serializer bug, in which case the client still gets a
    /// well-formed error.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"ERROR","error":"failed to encode message"}"#.into())
    }
}
