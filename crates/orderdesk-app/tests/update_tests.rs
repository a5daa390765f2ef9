// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use orderdesk_app::{
    ControlName, ControlState, DispatchError, FeedbackPresenter, FieldWatcher,
    NETWORK_ERROR_MESSAGE, OrderStatus, PendingUpdate, RowId, Severity, TimerKey, Timers, Tint,
    TransportError, UpdateDispatcher, UpdateOutcome, UpdateReply, WatchError,
};
use orderdesk_testkit::{FIXTURE_TOKEN, FakePage, OrderFaker, rejected, saved, unreachable_error};
use std::time::Duration;

type UpdateResult = Result<UpdateReply, TransportError>;

struct Harness {
    page: FakePage,
    watcher: FieldWatcher,
    dispatcher: UpdateDispatcher,
    feedback: FeedbackPresenter,
    timers: Timers,
}

impl Harness {
    fn new(page: FakePage) -> Self {
        Self {
            page,
            watcher: FieldWatcher::new("status", "id"),
            dispatcher: UpdateDispatcher::new("csrfmiddlewaretoken"),
            feedback: FeedbackPresenter::new(),
            timers: Timers::new(),
        }
    }

    /// Order list with every row in `created`.
    fn created(ids: &[i64]) -> Self {
        let rows = ids
            .iter()
            .map(|id| (*id, OrderStatus::Created))
            .collect::<Vec<_>>();
        Self::new(FakePage::order_list(&rows))
    }

    fn edit(&mut self, control: &str, value: &str) -> Result<PendingUpdate> {
        let control = self.page.edit(control, value);
        let change = self
            .watcher
            .observe(&self.page, &control)?
            .ok_or_else(|| anyhow!("{control} is not watched"))?;
        Ok(self.dispatcher.submit(&mut self.page, change)?)
    }

    fn resolve(&mut self, pending: PendingUpdate, reply: UpdateResult) -> Option<UpdateOutcome> {
        let dispatcher = &mut self.dispatcher;
        let page = &mut self.page;
        let (feedback, timers) = (&mut self.feedback, &mut self.timers);
        dispatcher.resolve(page, feedback, timers, pending, reply)
    }

    fn state(&self, control: &str) -> Option<ControlState> {
        self.page.control(control).map(|control| control.state)
    }

    fn toast_message(&self) -> Option<&str> {
        let toast = self.page.last_toast()?;
        Some(toast.message.as_str())
    }
}

#[test]
fn successful_update_flashes_and_announces_server_message() -> Result<()> {
    let mut h = Harness::created(&[42]);

    let pending = h.edit("form-0-status", "shipped")?;
    assert_eq!(pending.request.row, RowId::new(42));
    assert_eq!(pending.request.value, "shipped");
    assert_eq!(pending.request.token, FIXTURE_TOKEN);
    assert_eq!(h.state("form-0-status"), Some(ControlState::Pending));

    let outcome = h.resolve(pending, saved("Updated"));
    let message = "Updated".to_owned();
    assert_eq!(outcome, Some(UpdateOutcome::Saved { message }));

    let control = h.page.control("form-0-status").expect("status control");
    assert_eq!(control.state, ControlState::Editable);
    assert_eq!(control.tint, Some(Tint::Success));
    let toast = h.page.last_toast().expect("toast rendered");
    assert_eq!(toast.message, "✔ Updated");
    assert_eq!(toast.severity, Severity::Success);
    assert!(toast.visible);

    let due = h.timers.advance(Duration::from_millis(1000));
    let flash = TimerKey::ClearFlash(ControlName::new("form-0-status"));
    assert_eq!(due, vec![flash]);
    Ok(())
}

#[test]
fn control_is_disabled_exactly_while_request_is_in_flight() -> Result<()> {
    let mut h = Harness::created(&[1, 2, 3]);
    let replies = [saved("ok"), rejected("nope"), Err(unreachable_error())];

    for (index, reply) in replies.into_iter().enumerate() {
        let name = format!("form-{index}-status");
        let control = ControlName::new(name.as_str());
        let pending = h.edit(&name, "processing")?;
        assert!(h.dispatcher.is_pending(&control));
        h.resolve(pending, reply);

        let history = &h.page.control(&name).expect("control").state_history;
        let expected = vec![ControlState::Pending, ControlState::Editable];
        assert_eq!(history, &expected, "{name}");
        assert!(!h.dispatcher.is_pending(&control));
    }
    assert_eq!(h.dispatcher.in_flight_count(), 0);
    Ok(())
}

#[test]
fn rejected_update_keeps_operator_value_and_persistent_error_tint() -> Result<()> {
    let mut h = Harness::created(&[7]);

    let pending = h.edit("form-0-status", "delivered")?;
    let outcome = h.resolve(pending, rejected("order is cancelled"));
    let error = "order is cancelled".to_owned();
    assert_eq!(outcome, Some(UpdateOutcome::Rejected { error }));

    assert_eq!(h.page.value("form-0-status"), Some("delivered"));
    let control = h.page.control("form-0-status").expect("control");
    assert_eq!(control.tint, Some(Tint::Error));
    assert_eq!(h.toast_message(), Some("Error: order is cancelled"));

    h.timers.advance(Duration::from_secs(10));
    let status = ControlName::new("form-0-status");
    let flash = TimerKey::ClearFlash(status.clone());
    assert!(!h.timers.is_armed(&flash));
    let cell = h.dispatcher.cell(&status).expect("cell tracked");
    assert_eq!(cell.value, "delivered");
    assert_eq!(cell.last_known_good, None);
    Ok(())
}

#[test]
fn transport_failure_shows_generic_notice_without_flash() -> Result<()> {
    let mut h = Harness::new(FakePage::order_list(&[(9, OrderStatus::Processing)]));

    let pending = h.edit("form-0-status", "shipped")?;
    let outcome = h.resolve(pending, Err(unreachable_error()));
    let failure = UpdateOutcome::Failed(unreachable_error());
    assert_eq!(outcome, Some(failure));

    let control = h.page.control("form-0-status").expect("control");
    assert_eq!(control.state, ControlState::Editable);
    assert!(control.tint_history.is_empty());
    assert_eq!(h.page.value("form-0-status"), Some("shipped"));
    assert_eq!(h.toast_message(), Some(NETWORK_ERROR_MESSAGE));
    Ok(())
}

#[test]
fn second_edit_on_pending_control_is_rejected() -> Result<()> {
    let mut h = Harness::created(&[42]);

    let first = h.edit("form-0-status", "processing")?;
    let error = h
        .edit("form-0-status", "shipped")
        .expect_err("overlapping update must be refused");
    let control = ControlName::new("form-0-status");
    let expected = DispatchError::AlreadyPending { control };
    assert_eq!(error.downcast_ref::<DispatchError>(), Some(&expected));

    h.resolve(first, saved("ok"));
    let again = h.edit("form-0-status", "shipped")?;
    assert_eq!(again.request.value, "shipped");
    Ok(())
}

#[test]
fn different_rows_may_be_in_flight_together() -> Result<()> {
    let (page, orders) = OrderFaker::new(11).order_page(3);
    let mut h = Harness::new(page);

    let first = h.edit("form-0-status", "shipped")?;
    let third = h.edit("form-2-status", "cancelled")?;
    assert_eq!(h.dispatcher.in_flight_count(), 2);
    assert_eq!(third.request.row, RowId::new(orders[2].id));

    h.resolve(third, saved("b"));
    h.resolve(first, saved("a"));
    assert_eq!(h.dispatcher.in_flight_count(), 0);
    Ok(())
}

#[test]
fn stale_ticket_resolves_to_nothing() -> Result<()> {
    let mut h = Harness::created(&[42]);

    let pending = h.edit("form-0-status", "processing")?;
    let duplicate = pending.clone();
    assert!(h.resolve(pending, saved("ok")).is_some());
    assert_eq!(h.resolve(duplicate, saved("ok")), None);
    assert_eq!(h.page.toasts.len(), 1);
    Ok(())
}

#[test]
fn missing_identity_control_aborts_before_any_request() {
    let mut page = FakePage::order_list(&[(42, OrderStatus::Created)]);
    page.remove_control("form-0-id");
    let control = page.edit("form-0-status", "shipped");

    let error = FieldWatcher::new("status", "id")
        .observe(&page, &control)
        .expect_err("missing identity must abort");
    assert_eq!(
        error,
        WatchError::MissingIdentity {
            control: ControlName::new("form-0-status"),
            identity: ControlName::new("form-0-id"),
        }
    );
    let status = page.control("form-0-status").expect("status control");
    assert!(status.state_history.is_empty());
}

#[test]
fn non_numeric_identity_is_refused() {
    let page = FakePage::order_list(&[(42, OrderStatus::Created)]);
    let page = page.with_control("form-0-id", "");
    let status = ControlName::new("form-0-status");
    let error = FieldWatcher::new("status", "id")
        .observe(&page, &status)
        .expect_err("blank identity must abort");
    assert!(matches!(error, WatchError::InvalidIdentity { .. }));
}

#[test]
fn unwatched_controls_are_ignored() -> Result<()> {
    let page = FakePage::order_list(&[(42, OrderStatus::Created)]);
    let page = page.with_control("form-0-paid", "on");
    let paid = ControlName::new("form-0-paid");
    let change = FieldWatcher::new("status", "id").observe(&page, &paid)?;
    assert_eq!(change, None);
    Ok(())
}

#[test]
fn missing_token_is_a_local_error() -> Result<()> {
    let mut page = FakePage::order_list(&[(42, OrderStatus::Created)]);
    page.hidden.clear();
    let control = page.edit("form-0-status", "shipped");
    let change = FieldWatcher::new("status", "id")
        .observe(&page, &control)?
        .ok_or_else(|| anyhow!("status should be watched"))?;

    let mut dispatcher = UpdateDispatcher::new("csrfmiddlewaretoken");
    let error = dispatcher
        .submit(&mut page, change)
        .expect_err("token is required");
    assert!(matches!(error, DispatchError::MissingToken { .. }));
    assert!(!dispatcher.is_pending(&control));
    let status = page.control("form-0-status").expect("status control");
    assert_eq!(status.state, ControlState::Editable);
    Ok(())
}

#[test]
fn token_is_read_fresh_on_every_submit() -> Result<()> {
    let mut h = Harness::created(&[1, 2]);
    let first = h.edit("form-0-status", "shipped")?;
    h.page = h.page.clone().with_token("rotated");
    let second = h.edit("form-1-status", "shipped")?;

    assert_eq!(first.request.token, FIXTURE_TOKEN);
    assert_eq!(second.request.token, "rotated");
    Ok(())
}
