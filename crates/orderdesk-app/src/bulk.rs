// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{info, warn};

use crate::{FeedbackPresenter, HostPage, NETWORK_ERROR_MESSAGE, Severity, Timers, TransportError};

/// Destructive catalog-wide renumbering jobs run by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenumberAction {
    Skus,
    Orders,
}

impl RenumberAction {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Skus => "run-fix-skus/",
            Self::Orders => "run-fix-orders/",
        }
    }

    pub fn prompt(self, start: u64) -> String {
        match self {
            Self::Skus => format!(
                "Renumber the SKUs of all products starting from {start}?\n\nThis cannot be undone."
            ),
            Self::Orders => format!(
                "This changes the numbers of ALL existing orders.\n\nThey will be renumbered starting from {start}.\nPress OK to continue."
            ),
        }
    }

    pub fn url(self, start: u64) -> String {
        format!("{}?val={start}", self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkError {
    #[error("start number {raw:?} must be a non-negative integer")]
    InvalidStartNumber { raw: String },
}

/// Asks the operator to confirm, then navigates to the job URL. Returns the
/// URL when the job was started, `None` when the operator declined.
pub fn request_renumber<P: HostPage + ?Sized>(
    page: &mut P,
    action: RenumberAction,
    raw_start: &str,
) -> Result<Option<String>, BulkError> {
    let start = raw_start
        .trim()
        .parse::<u64>()
        .map_err(|_| BulkError::InvalidStartNumber {
            raw: raw_start.to_owned(),
        })?;

    if !page.confirm(&action.prompt(start)) {
        return Ok(None);
    }
    let url = action.url(start);
    info!(%url, "starting renumber job");
    page.navigate(&url);
    Ok(Some(url))
}

/// Tells the operator whether the server accepted a job URL the page
/// navigated to. Returns true when it did.
pub fn report_visit<P: HostPage + ?Sized>(
    page: &mut P,
    feedback: &mut FeedbackPresenter,
    timers: &mut Timers,
    url: &str,
    result: Result<(), TransportError>,
) -> bool {
    match result {
        Ok(()) => {
            info!(%url, "server job accepted");
            let message = format!("✔ Started {url}");
            feedback.notify(page, timers, message, Severity::Success);
            true
        }
        Err(err) => {
            warn!(%url, error = %err, "server job not started");
            feedback.notify(page, timers, NETWORK_ERROR_MESSAGE, Severity::Error);
            false
        }
    }
}
