//! Client → server frames

use crate::WireError;
use types::ids::OrderId;
use types::order::{AssetType, OrderType, Side, Ticker};

/// Frame type discriminants
const TYPE_HEARTBEAT: u16 = 0;
const TYPE_NEW_ORDER: u16 = 1;
const TYPE_CANCEL_ORDER: u16 = 2;
const TYPE_LOG_BOOK: u16 = 3;

/// Length of the frame type prefix
pub const HEADER_LEN: usize = 2;
/// Fixed NewOrder body length, excluding the username bytes
pub const NEW_ORDER_BODY_LEN: usize = 2 + 2 + 4 + 8 + 8 + 1 + 1;
/// CancelOrder body length
pub const CANCEL_ORDER_BODY_LEN: usize = 2 + 16;

/// A decoded client frame
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Heartbeat,
    NewOrder(NewOrderMessage),
    CancelOrder(CancelOrderMessage),
    LogBook,
}

/// Body of a NewOrder frame
///
/// Layout (big-endian, after the 2-byte type prefix):
/// asset u16, order type u16, ticker `[u8; 4]`, limit price f64,
/// quantity u64, side u8, username_len u8, username bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderMessage {
    pub asset: AssetType,
    pub order_type: OrderType,
    pub ticker: Ticker,
    pub limit_price: f64,
    pub quantity: u64,
    pub side: Side,
    pub username: String,
}

/// Body of a CancelOrder frame: asset u16, then the 16 raw id bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOrderMessage {
    pub asset: AssetType,
    pub order_id: OrderId,
}

impl Message {
    /// Decode a single frame from a buffer
    pub fn parse(buf: &[u8]) -> Result<Message, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::TooShortForHeader);
        }

        let type_of = u16::from_be_bytes([buf[0], buf[1]]);
        let body = &buf[HEADER_LEN..];
        match type_of {
            TYPE_HEARTBEAT => Ok(Message::Heartbeat),
            TYPE_NEW_ORDER => parse_new_order(body).map(Message::NewOrder),
            TYPE_CANCEL_ORDER => parse_cancel_order(body).map(Message::CancelOrder),
            TYPE_LOG_BOOK => Ok(Message::LogBook),
            other => Err(WireError::InvalidMessageType(other)),
        }
    }

    /// Encode this frame for the wire
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Message::Heartbeat => TYPE_HEARTBEAT.to_be_bytes().to_vec(),
            Message::LogBook => TYPE_LOG_BOOK.to_be_bytes().to_vec(),
            Message::NewOrder(m) => m.encode(),
            Message::CancelOrder(m) => m.encode(),
        }
    }
}

fn parse_new_order(body: &[u8]) -> Result<NewOrderMessage, WireError> {
    if body.len() < NEW_ORDER_BODY_LEN {
        return Err(WireError::TooShortForBody);
    }

    let asset_raw = u16::from_be_bytes([body[0], body[1]]);
    let asset = AssetType::from_wire(asset_raw).ok_or(WireError::InvalidFieldValue {
        field: "asset_type",
        value: asset_raw,
    })?;

    let order_type_raw = u16::from_be_bytes([body[2], body[3]]);
    let order_type = OrderType::from_wire(order_type_raw).ok_or(WireError::InvalidFieldValue {
        field: "order_type",
        value: order_type_raw,
    })?;

    let mut ticker = [0u8; 4];
    ticker.copy_from_slice(&body[4..8]);

    let mut price_bits = [0u8; 8];
    price_bits.copy_from_slice(&body[8..16]);
    let limit_price = f64::from_bits(u64::from_be_bytes(price_bits));

    let mut qty = [0u8; 8];
    qty.copy_from_slice(&body[16..24]);
    let quantity = u64::from_be_bytes(qty);

    let side = Side::from_wire(body[24]).ok_or(WireError::InvalidFieldValue {
        field: "side",
        value: body[24] as u16,
    })?;

    let username_len = body[25] as usize;
    if body.len() < NEW_ORDER_BODY_LEN + username_len {
        return Err(WireError::TooShortForBody);
    }
    let username =
        String::from_utf8_lossy(&body[NEW_ORDER_BODY_LEN..NEW_ORDER_BODY_LEN + username_len]).into_owned();

    Ok(NewOrderMessage {
        asset,
        order_type,
        ticker: Ticker::from_wire(ticker),
        limit_price,
        quantity,
        side,
        username,
    })
}

fn parse_cancel_order(body: &[u8]) -> Result<CancelOrderMessage, WireError> {
    if body.len() < CANCEL_ORDER_BODY_LEN {
        return Err(WireError::TooShortForBody);
    }

    let asset_raw = u16::from_be_bytes([body[0], body[1]]);
    let asset = AssetType::from_wire(asset_raw).ok_or(WireError::InvalidFieldValue {
        field: "asset_type",
        value: asset_raw,
    })?;

    let mut id = [0u8; 16];
    id.copy_from_slice(&body[2..18]);

    Ok(CancelOrderMessage {
        asset,
        order_id: OrderId::from_bytes(id),
    })
}

impl NewOrderMessage {
    fn encode(&self) -> Vec<u8> {
        let username = self.username.as_bytes();
        let mut buf = vec![0u8; HEADER_LEN + NEW_ORDER_BODY_LEN + username.len()];

        buf[0..2].copy_from_slice(&TYPE_NEW_ORDER.to_be_bytes());
        buf[2..4].copy_from_slice(&self.asset.wire_value().to_be_bytes());
        buf[4..6].copy_from_slice(&self.order_type.wire_value().to_be_bytes());
        buf[6..10].copy_from_slice(self.ticker.as_bytes());
        buf[10..18].copy_from_slice(&self.limit_price.to_bits().to_be_bytes());
        buf[18..26].copy_from_slice(&self.quantity.to_be_bytes());
        buf[26] = self.side.wire_value();
        buf[27] = username.len() as u8;
        buf[28..].copy_from_slice(username);
        buf
    }
}

impl CancelOrderMessage {
    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + CANCEL_ORDER_BODY_LEN];
        buf[0..2].copy_from_slice(&TYPE_CANCEL_ORDER.to_be_bytes());
        buf[2..4].copy_from_slice(&self.asset.wire_value().to_be_bytes());
        buf[4..20].copy_from_slice(self.order_id.as_bytes());
        buf
    }
}
