//! Payload codec
//!
//! Turns raw input bytes into a [`DecodedAction`] and encodes outbound payloads.
//!
//! # Advance classification
//!
//! Shapes are tried in a fixed order, each producing exactly one variant:
//!
//! 1. UTF-8 JSON object with both `win` and `loss` → [`DecodedAction::Settle`]
//! 2. `{"action":"deposit", "sender", "amount"}` → [`DecodedAction::Deposit`]
//! 3. `{"action":"transfer", "from", "to", "amount"}` → [`DecodedAction::Transfer`]
//! 4. any other JSON value → [`DecodedAction::Unrecognized`]
//! 5. not JSON → 52-byte binary deposit: `recipient[20] || amount_be[32]`
//!
//! JSON input is never retried as a binary deposit.

use crate::{
    types::{Address, Balance, DecodedAction, RequestKind},
    Error, Result,
};
use serde_json::{Map, Value};

/// Minimum length of a binary deposit notification
pub const DEPOSIT_PAYLOAD_LEN: usize = Address::LEN + AMOUNT_LEN;

/// Width of an encoded amount
pub const AMOUNT_LEN: usize = 32;

/// Decode a payload received in `kind` context
pub fn decode(payload: &[u8], kind: RequestKind) -> Result<DecodedAction> {
    match kind {
        RequestKind::Inspect => {
            let text = std::str::from_utf8(payload)
                .map_err(|e| Error::MalformedInspectPayload(e.to_string()))?;
            let value: Value = serde_json::from_str(text)
                .map_err(|e| Error::MalformedInspectPayload(e.to_string()))?;
            classify_inspect(&value)
        }
        RequestKind::Advance => match parse_json(payload) {
            Some(value) => classify_advance(&value),
            None => decode_binary_deposit(payload),
        },
    }
}

/// Decode the fixed-layout deposit notification
pub fn decode_binary_deposit(payload: &[u8]) -> Result<DecodedAction> {
    if payload.len() < DEPOSIT_PAYLOAD_LEN {
        return Err(Error::PayloadTooShort {
            expected: DEPOSIT_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let recipient = Address::from_slice(&payload[..Address::LEN])?;
    let amount = Balance::from_big_endian(&payload[Address::LEN..DEPOSIT_PAYLOAD_LEN]);

    Ok(DecodedAction::Deposit {
        recipient,
        amount,
        binary: true,
    })
}

/// Encode an amount as a 32-byte big-endian unsigned integer
pub fn encode_amount(amount: Balance) -> [u8; AMOUNT_LEN] {
    let mut out = [0u8; AMOUNT_LEN];
    amount.to_big_endian(&mut out);
    out
}

/// Hex-encode bytes with a `0x` prefix
pub fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode `0x`-prefixed (or bare) hex
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    let body = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(body).map_err(|e| Error::Protocol(format!("invalid hex payload: {e}")))
}

/// Parse a JSON amount: non-negative integer, decimal string or `0x` hex string
pub fn parse_amount(value: &Value) -> Result<Balance> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(Balance::from)
            .ok_or_else(|| Error::InvalidAmount(n.to_string())),
        Value::String(s) => {
            let parsed = match s.strip_prefix("0x") {
                Some("") => None,
                Some(hex) => Balance::from_str_radix(hex, 16).ok(),
                None if s.is_empty() => None,
                None => Balance::from_dec_str(s).ok(),
            };
            parsed.ok_or_else(|| Error::InvalidAmount(s.clone()))
        }
        other => Err(Error::InvalidAmount(other.to_string())),
    }
}

fn parse_json(payload: &[u8]) -> Option<Value> {
    let text = std::str::from_utf8(payload).ok()?;
    serde_json::from_str(text).ok()
}

fn classify_advance(value: &Value) -> Result<DecodedAction> {
    let Some(obj) = value.as_object() else {
        return Ok(DecodedAction::Unrecognized);
    };

    if obj.contains_key("win") && obj.contains_key("loss") {
        return Ok(DecodedAction::Settle {
            winner: address_field(obj, "win")?,
            loser: address_field(obj, "loss")?,
        });
    }

    match obj.get("action").and_then(Value::as_str) {
        Some("deposit") => Ok(DecodedAction::Deposit {
            recipient: address_field(obj, "sender")?,
            amount: amount_field(obj, "amount")?,
            binary: false,
        }),
        Some("transfer") => Ok(DecodedAction::Transfer {
            from: address_field(obj, "from")?,
            to: address_field(obj, "to")?,
            amount: amount_field(obj, "amount")?,
        }),
        _ => Ok(DecodedAction::Unrecognized),
    }
}

fn classify_inspect(value: &Value) -> Result<DecodedAction> {
    let Some(obj) = value.as_object() else {
        return Ok(DecodedAction::Unrecognized);
    };

    match obj.get("action").and_then(Value::as_str) {
        Some("balance") => Ok(DecodedAction::BalanceQuery {
            user: address_field(obj, "user")?,
        }),
        _ => Ok(DecodedAction::Unrecognized),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(Error::MissingField(name)),
        Some(value) => Ok(value),
    }
}

fn address_field(obj: &Map<String, Value>, name: &'static str) -> Result<Address> {
    match field(obj, name)? {
        Value::String(s) => s.parse(),
        other => Err(Error::InvalidAddress(format!("{name}: {other}"))),
    }
}

fn amount_field(obj: &Map<String, Value>, name: &'static str) -> Result<Balance> {
    parse_amount(field(obj, name)?)
}
