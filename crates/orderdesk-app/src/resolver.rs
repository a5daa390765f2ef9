// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    ControlName, FeedbackPresenter, HostPage, LookupReply, LookupRequest, ProductId, Severity,
    Timers, Tint, TransportError,
};

pub const LOOKUP_FAILED_MESSAGE: &str = "Price lookup failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLookup {
    pub target: ControlName,
    pub request: LookupRequest,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStep {
    /// Nothing selected; the derived field was cleared without a request.
    Cleared { target: ControlName },
    Lookup(PendingLookup),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("selection {value:?} in {control} is not a product id")]
    InvalidSelection {
        control: ControlName,
        value: String,
    },
    #[error("control {control} is no longer rendered")]
    MissingControl { control: ControlName },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Filled { value: String },
    Failed { reason: String },
    /// The selection changed after this lookup was issued.
    Superseded,
}

/// Fills a row's derived price from its product selection.
#[derive(Debug)]
pub struct RelatedFieldResolver {
    source_field: String,
    target_field: String,
    generations: BTreeMap<ControlName, u64>,
}

impl RelatedFieldResolver {
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: target_field.into(),
            generations: BTreeMap::new(),
        }
    }

    pub fn watches(&self, control: &ControlName) -> bool {
        control.has_field(&self.source_field)
    }

    /// `Ok(None)` for controls that are not product selectors. An empty or
    /// unusable selection clears the derived field and any tint left on it.
    pub fn on_selection<P: HostPage + ?Sized>(
        &mut self,
        page: &mut P,
        feedback: &mut FeedbackPresenter,
        control: &ControlName,
    ) -> Result<Option<SelectionStep>, ResolveError> {
        if !self.watches(control) {
            return Ok(None);
        }
        let Some(target) = control.sibling(&self.target_field) else {
            return Ok(None);
        };
        let selected = page
            .control_value(control)
            .ok_or_else(|| ResolveError::MissingControl {
                control: control.clone(),
            })?;

        let generation = self.bump(&target);
        if selected.trim().is_empty() {
            page.set_control_value(&target, "");
            feedback.clear_flash(page, &target);
            return Ok(Some(SelectionStep::Cleared { target }));
        }

        let Some(product) = ProductId::parse(&selected) else {
            page.set_control_value(&target, "");
            feedback.clear_flash(page, &target);
            return Err(ResolveError::InvalidSelection {
                control: control.clone(),
                value: selected,
            });
        };
        Ok(Some(SelectionStep::Lookup(PendingLookup {
            target,
            request: LookupRequest { product },
            generation,
        })))
    }

    /// Writes the looked-up value, or clears and flags the target when the
    /// lookup produced no usable price.
    pub fn resolve<P: HostPage + ?Sized>(
        &mut self,
        page: &mut P,
        feedback: &mut FeedbackPresenter,
        timers: &mut Timers,
        lookup: PendingLookup,
        result: Result<LookupReply, TransportError>,
    ) -> LookupOutcome {
        if self.generations.get(&lookup.target) != Some(&lookup.generation) {
            debug!(control = %lookup.target, product = %lookup.request.product, "dropping superseded price lookup");
            return LookupOutcome::Superseded;
        }

        let reason = match result {
            Ok(reply) => match reply.price.map(|price| normalize_decimal(&price.as_text())) {
                Some(value) if is_decimal(&value) => {
                    page.set_control_value(&lookup.target, &value);
                    feedback.clear_flash(page, &lookup.target);
                    return LookupOutcome::Filled { value };
                }
                Some(value) => format!("price {value:?} is not a decimal"),
                None => "response carried no price".to_owned(),
            },
            Err(error) => error.to_string(),
        };

        warn!(control = %lookup.target, product = %lookup.request.product, %reason, "price lookup failed");
        page.set_control_value(&lookup.target, "");
        feedback.flash(page, timers, &lookup.target, Tint::Error);
        feedback.notify(page, timers, LOOKUP_FAILED_MESSAGE, Severity::Error);
        LookupOutcome::Failed { reason }
    }

    fn bump(&mut self, target: &ControlName) -> u64 {
        let generation = self.generations.entry(target.clone()).or_insert(0);
        *generation = generation.wrapping_add(1);
        *generation
    }
}

/// Accepts either decimal separator: `"123,45"` becomes `"123.45"`.
pub fn normalize_decimal(raw: &str) -> String {
    raw.trim().replace(',', ".")
}

fn is_decimal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    let all_digits = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
    !whole.is_empty()
        && all_digits(whole)
        && fraction.is_none_or(|part| !part.is_empty() && all_digits(part))
}

#[cfg(test)]
mod tests {
    use super::{is_decimal, normalize_decimal};

    #[test]
    fn normalize_decimal_swaps_comma_separator() {
        assert_eq!(normalize_decimal("123,45"), "123.45");
        assert_eq!(normalize_decimal(" 99.90 "), "99.90");
    }

    #[test]
    fn decimal_check_rejects_garbage() {
        assert!(is_decimal("123.45"));
        assert!(is_decimal("7"));
        assert!(is_decimal("-1.5"));
        assert!(!is_decimal(""));
        assert!(!is_decimal("1.2.3"));
        assert!(!is_decimal("12."));
        assert!(!is_decimal("abc"));
    }
}
