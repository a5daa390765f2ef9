// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::ids::*;

/// Name of a rendered form control, following the `prefix-index-field`
/// convention of list-editable admin tables (`form-0-status`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ControlName(String);

impl ControlName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text after the last `-`, or the whole name when there is no separator.
    pub fn field(&self) -> &str {
        match self.0.rsplit_once('-') {
            Some((_, field)) => field,
            None => &self.0,
        }
    }

    /// Everything before the field segment (`form-0` for `form-0-status`).
    pub fn row_prefix(&self) -> Option<&str> {
        self.0.rsplit_once('-').map(|(prefix, _)| prefix)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.row_prefix().is_some() && self.field() == field
    }

    /// Control in the same row holding `field`. `None` for names without a row prefix.
    pub fn sibling(&self, field: &str) -> Option<ControlName> {
        self.row_prefix()
            .map(|prefix| ControlName(format!("{prefix}-{field}")))
    }
}

impl fmt::Display for ControlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControlName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Created,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn rotate(self, delta: isize) -> Self {
        let current = Self::ALL
            .iter()
            .position(|status| *status == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Success,
    Error,
}

impl Severity {
    /// Background of the toast surface.
    pub const fn surface_color(self) -> &'static str {
        match self {
            Self::Success => "#28a745",
            Self::Error => "#dc3545",
        }
    }
}

/// Result flash painted behind a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tint {
    Success,
    Error,
}

impl Tint {
    pub const fn color(self) -> &'static str {
        match self {
            Self::Success => "#d4edda",
            Self::Error => "#f8d7da",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    Editable,
    Pending,
}

impl ControlState {
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Pending)
    }

    pub const fn opacity(self) -> f32 {
        match self {
            Self::Editable => 1.0,
            Self::Pending => 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableCell {
    pub row: RowId,
    pub field: String,
    pub value: String,
    pub pending: bool,
    pub last_known_good: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub expires_at: Duration,
}

/// A collapsible section as rendered, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView {
    pub index: usize,
    pub key: Option<String>,
    pub title: String,
    pub expanded: bool,
}
