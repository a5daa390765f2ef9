// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ProductId, RowId};

/// One inline field update, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub row: RowId,
    pub field: String,
    pub value: String,
    pub token: String,
}

impl UpdateRequest {
    /// `{"id": <row>, "<field>": <value>}`, keyed by the watched field name.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("id".to_owned(), Value::from(self.row.get()));
        body.insert(self.field.clone(), Value::from(self.value.clone()));
        Value::Object(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupRequest {
    pub product: ProductId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Text(String),
    Number(serde_json::Number),
}

impl RawPrice {
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LookupReply {
    #[serde(default)]
    pub price: Option<RawPrice>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("cannot reach {url}: {detail}")]
    Unreachable { url: String, detail: String },
    #[error("server answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode response from {url}: {detail}")]
    Decode { url: String, detail: String },
}

/// Network side of the update and lookup endpoints. Each call runs to
/// completion; there is no cancellation.
pub trait Transport {
    fn send_update(&self, request: &UpdateRequest) -> Result<UpdateReply, TransportError>;
    fn lookup_price(&self, request: &LookupRequest) -> Result<LookupReply, TransportError>;
    /// Follows a page-relative link the way a browser navigation would, such
    /// as the bulk renumber job URLs. Only the status is of interest.
    fn visit(&self, url: &str) -> Result<(), TransportError>;
}
