// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use orderdesk_app::{
    ControlName, FeedbackPresenter, LOOKUP_FAILED_MESSAGE, LookupOutcome, LookupReply,
    PendingLookup, ProductId, RawPrice, RelatedFieldResolver, ResolveError, SelectionStep,
    Severity, Timers, Tint, TransportError,
};
use orderdesk_testkit::{FakePage, priced, unreachable_error};

type Selection = Result<Option<SelectionStep>, ResolveError>;
type LookupResult = Result<LookupReply, TransportError>;

/// An order change page with two item rows, wired to one resolver.
struct ItemForm {
    page: FakePage,
    resolver: RelatedFieldResolver,
    feedback: FeedbackPresenter,
    timers: Timers,
}

impl ItemForm {
    fn new() -> Self {
        let page = FakePage::new("/admin/orders/order/5/change/")
            .with_item_row(0, Some(3), "10.00")
            .with_item_row(1, None, "");
        Self {
            page,
            resolver: RelatedFieldResolver::new("product", "price"),
            feedback: FeedbackPresenter::new(),
            timers: Timers::new(),
        }
    }

    fn select(&mut self, name: &str, value: &str) -> Selection {
        let control = self.page.edit(name, value);
        self.resolver
            .on_selection(&mut self.page, &mut self.feedback, &control)
    }

    fn lookup(&mut self, name: &str, value: &str) -> Result<PendingLookup> {
        match self.select(name, value)? {
            Some(SelectionStep::Lookup(lookup)) => Ok(lookup),
            other => bail!("expected a lookup, got {other:?}"),
        }
    }

    fn answer(&mut self, lookup: PendingLookup, reply: LookupResult) -> LookupOutcome {
        let resolver = &mut self.resolver;
        let page = &mut self.page;
        let (feedback, timers) = (&mut self.feedback, &mut self.timers);
        resolver.resolve(page, feedback, timers, lookup, reply)
    }

    fn price(&self, row: usize) -> Option<&str> {
        self.page.value(&format!("items-{row}-price"))
    }

    fn price_tint(&self, row: usize) -> Option<Tint> {
        let name = format!("items-{row}-price");
        self.page.control(&name).and_then(|control| control.tint)
    }
}

#[test]
fn selection_issues_lookup_and_writes_normalized_price() -> Result<()> {
    let mut form = ItemForm::new();

    let lookup = form.lookup("items-0-product", "12")?;
    assert_eq!(lookup.request.product, ProductId::new(12));
    assert_eq!(lookup.target, ControlName::new("items-0-price"));

    let outcome = form.answer(lookup, priced("123,45"));
    assert_eq!(
        outcome,
        LookupOutcome::Filled {
            value: "123.45".to_owned()
        }
    );
    assert_eq!(form.price(0), Some("123.45"));
    assert!(form.page.toasts.is_empty());
    Ok(())
}

#[test]
fn numeric_price_is_written_as_text() -> Result<()> {
    let mut form = ItemForm::new();
    let lookup = form.lookup("items-0-product", "4")?;
    let reply: LookupReply = serde_json::from_str(r#"{"price": 15.5}"#)?;
    form.answer(lookup, Ok(reply));
    assert_eq!(form.price(0), Some("15.5"));
    Ok(())
}

#[test]
fn clearing_selection_clears_price_without_request() -> Result<()> {
    let mut form = ItemForm::new();

    let step = form.select("items-0-product", "")?;
    let target = ControlName::new("items-0-price");
    assert_eq!(step, Some(SelectionStep::Cleared { target }));
    assert_eq!(form.price(0), Some(""));
    Ok(())
}

#[test]
fn failed_lookup_clears_and_flags_the_price() -> Result<()> {
    let mut form = ItemForm::new();

    let lookup = form.lookup("items-0-product", "8")?;
    let outcome = form.answer(lookup, Err(unreachable_error()));
    assert!(matches!(outcome, LookupOutcome::Failed { .. }));
    assert_eq!(form.price(0), Some(""));
    assert_eq!(form.price_tint(0), Some(Tint::Error));

    let toast = form.page.last_toast().expect("toast");
    assert_eq!(toast.message, LOOKUP_FAILED_MESSAGE);
    assert_eq!(toast.severity, Severity::Error);
    Ok(())
}

#[test]
fn clearing_selection_drops_the_failure_flag() -> Result<()> {
    let mut form = ItemForm::new();
    let lookup = form.lookup("items-0-product", "8")?;
    form.answer(lookup, Err(unreachable_error()));
    assert_eq!(form.price_tint(0), Some(Tint::Error));

    form.select("items-0-product", "")?;
    assert_eq!(form.price(0), Some(""));
    assert_eq!(form.price_tint(0), None);
    Ok(())
}

#[test]
fn reply_without_usable_price_is_a_failure() -> Result<()> {
    let unusable = LookupReply {
        price: Some(RawPrice::Text("call us".to_owned())),
    };
    for reply in [LookupReply { price: None }, unusable] {
        let mut form = ItemForm::new();
        let lookup = form.lookup("items-0-product", "8")?;
        let outcome = form.answer(lookup, Ok(reply));
        assert!(matches!(outcome, LookupOutcome::Failed { .. }));
        assert_eq!(form.price(0), Some(""));
    }
    Ok(())
}

#[test]
fn superseded_lookup_is_dropped() -> Result<()> {
    let mut form = ItemForm::new();

    let stale = form.lookup("items-0-product", "1")?;
    let fresh = form.lookup("items-0-product", "2")?;

    let late = form.answer(stale, priced("1,00"));
    assert_eq!(late, LookupOutcome::Superseded);
    form.answer(fresh, priced("2,50"));
    assert_eq!(form.price(0), Some("2.50"));
    Ok(())
}

#[test]
fn lookups_in_other_rows_do_not_supersede_each_other() -> Result<()> {
    let mut form = ItemForm::new();

    let first = form.lookup("items-0-product", "1")?;
    let second = form.lookup("items-1-product", "2")?;

    form.answer(second, priced("5"));
    form.answer(first, priced("6"));
    assert_eq!(form.price(0), Some("6"));
    assert_eq!(form.price(1), Some("5"));
    Ok(())
}

#[test]
fn non_numeric_selection_is_refused() {
    let mut form = ItemForm::new();
    let error = form
        .select("items-0-product", "tulips")
        .expect_err("selection must be an id");
    assert!(matches!(error, ResolveError::InvalidSelection { .. }));
}

#[test]
fn refused_selection_does_not_leave_the_old_price_behind() -> Result<()> {
    let mut form = ItemForm::new();
    let lookup = form.lookup("items-0-product", "8")?;
    form.answer(lookup, Err(unreachable_error()));

    form.select("items-0-product", "tulips")
        .expect_err("selection must be an id");
    assert_eq!(form.price(0), Some(""));
    assert_eq!(form.price_tint(0), None);

    let mut fresh = ItemForm::new();
    assert_eq!(fresh.price(0), Some("10.00"));
    fresh
        .select("items-0-product", "n/a")
        .expect_err("selection must be an id");
    assert_eq!(fresh.price(0), Some(""));
    Ok(())
}
