// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use orderdesk_app::{
    HostPage, LookupReply, LookupRequest, OrderStatus, RawPrice, Transport, TransportError,
    UpdateReply, UpdateRequest,
};
use orderdesk_tui::{ConsolePage, demo_price};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::debug;

const DEMO_URL: &str = "demo://orderdesk/";
const DEMO_JOBS: &[&str] = &["run-fix-orders/", "run-fix-skus/"];

/// In-process stand-in for the admin server behind `--demo`. Answers the
/// update and lookup endpoints from the rows of the demo page, after a short
/// delay so the pending state is visible.
pub struct DemoTransport {
    status_field: String,
    orders: Mutex<BTreeMap<i64, OrderStatus>>,
    latency: Duration,
}

impl DemoTransport {
    pub fn new(status_field: &str, latency: Duration) -> Self {
        Self {
            status_field: status_field.to_owned(),
            orders: Mutex::new(BTreeMap::new()),
            latency,
        }
    }

    /// Seeds the order table from the rows rendered on `page`.
    pub fn with_page_orders(self, page: &ConsolePage) -> Self {
        let mut seeded = BTreeMap::new();
        for row in 0..page.row_count() {
            let id = page
                .control_value(&page.identity_control(row))
                .and_then(|raw| raw.trim().parse::<i64>().ok());
            let status = page
                .control_value(&page.status_control(row))
                .and_then(|raw| OrderStatus::parse(&raw));
            if let (Some(id), Some(status)) = (id, status) {
                seeded.insert(id, status);
            }
        }
        Self {
            orders: Mutex::new(seeded),
            ..self
        }
    }

    pub fn status_of(&self, id: i64) -> Option<OrderStatus> {
        self.orders
            .lock()
            .ok()
            .and_then(|orders| orders.get(&id).copied())
    }

    fn apply(&self, request: &UpdateRequest) -> UpdateReply {
        if request.field != self.status_field {
            return rejected(format!("field {:?} is not editable here", request.field));
        }
        let Some(next) = OrderStatus::parse(request.value.trim()) else {
            return rejected(format!("unknown status {:?}", request.value));
        };
        let Ok(mut orders) = self.orders.lock() else {
            return rejected("order table unavailable".to_owned());
        };
        let Some(current) = orders.get_mut(&request.row.get()) else {
            return rejected(format!("order {} not found", request.row));
        };
        if *current != next && matches!(*current, OrderStatus::Delivered | OrderStatus::Cancelled) {
            return rejected(format!("order is already {}", current.label().to_lowercase()));
        }
        *current = next;
        UpdateReply {
            success: true,
            message: Some(format!("Order #{} is now {}", request.row, next.label())),
            error: None,
        }
    }
}

impl Transport for DemoTransport {
    fn send_update(&self, request: &UpdateRequest) -> Result<UpdateReply, TransportError> {
        thread::sleep(self.latency);
        if request.token.trim().is_empty() {
            return Err(TransportError::Status {
                status: 403,
                body: "CSRF verification failed".to_owned(),
            });
        }
        let reply = self.apply(request);
        debug!(row = %request.row, success = reply.success, "demo update answered");
        Ok(reply)
    }

    fn lookup_price(&self, request: &LookupRequest) -> Result<LookupReply, TransportError> {
        thread::sleep(self.latency);
        match demo_price(request.product.get()) {
            Some(price) => Ok(LookupReply {
                price: Some(RawPrice::Text(price.to_owned())),
            }),
            None => Err(TransportError::Status {
                status: 404,
                body: format!("product {} not found at {DEMO_URL}", request.product),
            }),
        }
    }

    fn visit(&self, url: &str) -> Result<(), TransportError> {
        thread::sleep(self.latency);
        let start = DEMO_JOBS
            .iter()
            .find_map(|job| url.strip_prefix(*job))
            .and_then(|query| query.strip_prefix("?val="))
            .and_then(|start| start.parse::<u64>().ok());
        match start {
            Some(start) => {
                debug!(url, start, "demo renumber job started");
                Ok(())
            }
            None => Err(TransportError::Status {
                status: 404,
                body: format!("no job at {DEMO_URL}{url}"),
            }),
        }
    }
}

fn rejected(error: String) -> UpdateReply {
    UpdateReply {
        success: false,
        message: None,
        error: Some(error),
    }
}
