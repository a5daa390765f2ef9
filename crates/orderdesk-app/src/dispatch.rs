// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::{
    ControlName, ControlState, EditableCell, FeedbackPresenter, FieldChange, HostPage, Severity,
    Timers, Tint, TransportError, UpdateReply, UpdateRequest,
};

pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// An update that has been handed to the transport and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub ticket: u64,
    pub control: ControlName,
    pub request: UpdateRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("{control} already has an update in flight")]
    AlreadyPending { control: ControlName },
    #[error("anti-forgery field {field} is missing from the page")]
    MissingToken { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Saved { message: String },
    Rejected { error: String },
    Failed(TransportError),
}

#[derive(Debug)]
pub struct UpdateDispatcher {
    token_field: String,
    cells: BTreeMap<ControlName, EditableCell>,
    in_flight: BTreeMap<ControlName, u64>,
    next_ticket: u64,
}

impl UpdateDispatcher {
    pub fn new(token_field: impl Into<String>) -> Self {
        Self {
            token_field: token_field.into(),
            cells: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            next_ticket: 0,
        }
    }

    pub fn is_pending(&self, control: &ControlName) -> bool {
        self.in_flight.contains_key(control)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cell(&self, control: &ControlName) -> Option<&EditableCell> {
        self.cells.get(control)
    }

    /// Marks the control pending and builds the request. The token is read
    /// from the page on every call.
    pub fn submit<P: HostPage + ?Sized>(
        &mut self,
        page: &mut P,
        change: FieldChange,
    ) -> Result<PendingUpdate, DispatchError> {
        if self.is_pending(&change.control) {
            return Err(DispatchError::AlreadyPending {
                control: change.control,
            });
        }
        let token = page
            .hidden_value(&self.token_field)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DispatchError::MissingToken {
                field: self.token_field.clone(),
            })?;

        let cell = self
            .cells
            .entry(change.control.clone())
            .or_insert_with(|| EditableCell {
                row: change.row,
                field: change.field.clone(),
                value: change.value.clone(),
                pending: false,
                last_known_good: None,
            });
        cell.row = change.row;
        cell.value = change.value.clone();
        cell.pending = true;

        page.set_control_state(&change.control, ControlState::Pending);

        self.next_ticket = self.next_ticket.wrapping_add(1);
        let ticket = self.next_ticket;
        self.in_flight.insert(change.control.clone(), ticket);

        Ok(PendingUpdate {
            ticket,
            control: change.control,
            request: UpdateRequest {
                row: change.row,
                field: change.field,
                value: change.value,
                token,
            },
        })
    }

    /// Applies the server's answer. The control is re-enabled on every path;
    /// the operator's value stays on screen even when the update failed.
    /// Returns `None` for a ticket that is not in flight.
    pub fn resolve<P: HostPage + ?Sized>(
        &mut self,
        page: &mut P,
        feedback: &mut FeedbackPresenter,
        timers: &mut Timers,
        pending: PendingUpdate,
        result: Result<UpdateReply, TransportError>,
    ) -> Option<UpdateOutcome> {
        match self.in_flight.get(&pending.control) {
            Some(ticket) if *ticket == pending.ticket => {
                self.in_flight.remove(&pending.control);
            }
            _ => return None,
        }

        page.set_control_state(&pending.control, ControlState::Editable);
        let cell = self.cells.get_mut(&pending.control);

        let outcome = match result {
            Ok(reply) if reply.success => {
                let message = reply.message.unwrap_or_else(|| "Saved".to_owned());
                if let Some(cell) = cell {
                    cell.pending = false;
                    cell.last_known_good = Some(pending.request.value.clone());
                }
                info!(
                    control = %pending.control,
                    row = %pending.request.row,
                    value = %pending.request.value,
                    "update saved"
                );
                feedback.flash(page, timers, &pending.control, Tint::Success);
                feedback.notify(page, timers, format!("✔ {message}"), Severity::Success);
                UpdateOutcome::Saved { message }
            }
            Ok(reply) => {
                let error = reply.error.unwrap_or_else(|| "update rejected".to_owned());
                if let Some(cell) = cell {
                    cell.pending = false;
                }
                info!(control = %pending.control, row = %pending.request.row, %error, "update rejected");
                feedback.flash(page, timers, &pending.control, Tint::Error);
                feedback.notify(page, timers, format!("Error: {error}"), Severity::Error);
                UpdateOutcome::Rejected { error }
            }
            Err(error) => {
                if let Some(cell) = cell {
                    cell.pending = false;
                }
                warn!(control = %pending.control, row = %pending.request.row, %error, "update failed");
                feedback.notify(page, timers, NETWORK_ERROR_MESSAGE, Severity::Error);
                UpdateOutcome::Failed(error)
            }
        };
        Some(outcome)
    }
}
