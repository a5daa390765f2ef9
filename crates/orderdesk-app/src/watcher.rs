// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ControlName, HostPage, RowId};

/// A detected edit, resolved to the record it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub control: ControlName,
    pub row: RowId,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    #[error("no identity control {identity} in the row of {control}")]
    MissingIdentity {
        control: ControlName,
        identity: ControlName,
    },
    #[error("identity control {identity} holds {value:?}, which is not a record id")]
    InvalidIdentity {
        identity: ControlName,
        value: String,
    },
    #[error("control {control} is no longer rendered")]
    MissingControl { control: ControlName },
}

/// Watches one editable field of a list table and resolves the row identity
/// from the companion hidden control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWatcher {
    field: String,
    identity_field: String,
}

impl FieldWatcher {
    pub fn new(field: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            identity_field: identity_field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn watches(&self, control: &ControlName) -> bool {
        control.has_field(&self.field)
    }

    /// `Ok(None)` for controls this watcher does not own. Errors abort the
    /// handoff so that no request can target the wrong record.
    pub fn observe<P: HostPage + ?Sized>(
        &self,
        page: &P,
        control: &ControlName,
    ) -> Result<Option<FieldChange>, WatchError> {
        if !self.watches(control) {
            return Ok(None);
        }
        let Some(identity) = control.sibling(&self.identity_field) else {
            return Ok(None);
        };

        let Some(raw_id) = page.control_value(&identity) else {
            return Err(WatchError::MissingIdentity {
                control: control.clone(),
                identity,
            });
        };
        let row = RowId::parse(&raw_id).ok_or_else(|| WatchError::InvalidIdentity {
            identity: identity.clone(),
            value: raw_id.clone(),
        })?;

        let value = page
            .control_value(control)
            .ok_or_else(|| WatchError::MissingControl {
                control: control.clone(),
            })?;

        Ok(Some(FieldChange {
            control: control.clone(),
            row,
            field: self.field.clone(),
            value,
        }))
    }
}
