// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use orderdesk_app::{
    ClockPreview, ControlName, ControlState, HostPage, KNOWN_ZONES, OrderStatus, SectionView,
    SessionConfig, Tint, ToastView,
};
use std::collections::BTreeMap;

/// Products offered by the demo catalog: `(id, name, price as served)`.
/// Some prices are served with the comma separator.
pub const DEMO_PRODUCTS: &[(i64, &str, &str)] = &[
    (11, "Spring Tulips", "1450,00"),
    (12, "Red Roses x25", "3990.00"),
    (13, "Peony Cloud", "5200,50"),
    (14, "Wildflower Basket", "2750"),
    (15, "Orchid Pot", "4100,00"),
];

const DEMO_ORDERS: &[(i64, &str, OrderStatus, Option<i64>)] = &[
    (1041, "Avery", OrderStatus::Created, Some(11)),
    (1042, "Jordan", OrderStatus::Processing, Some(13)),
    (1043, "Taylor", OrderStatus::Shipped, Some(12)),
    (1044, "Riley", OrderStatus::Created, None),
    (1045, "Morgan", OrderStatus::Delivered, Some(15)),
    (1046, "Casey", OrderStatus::Cancelled, Some(14)),
    (1047, "Quinn", OrderStatus::Processing, Some(11)),
];

/// Sections of the order change form.
pub const ORDER_SECTIONS: &[(Option<&str>, &str)] = &[
    (Some("customer"), "Customer"),
    (Some("delivery"), "Delivery"),
    (None, "Items"),
    (Some("payment"), "Payment"),
    (None, "Notes"),
];

pub const DEMO_TOKEN: &str = "demo-csrf-token";
pub const DEMO_TIME_ZONE: &str = "Europe/Moscow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    pub id: i64,
    pub customer: String,
    pub status: OrderStatus,
    pub product: Option<i64>,
    /// Price as the server rendered it; either decimal separator.
    pub price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsoleControl {
    pub value: String,
    pub state: ControlState,
    pub tint: Option<Tint>,
}

/// Terminal rendition of the admin change-list: one grid row per order, each
/// with identity, status, product and price controls under `form-N-`.
#[derive(Debug, Clone)]
pub struct ConsolePage {
    path: String,
    fields: SessionConfig,
    customers: Vec<String>,
    catalog: Vec<(i64, String)>,
    controls: BTreeMap<ControlName, ConsoleControl>,
    hidden: BTreeMap<String, String>,
    sections: Vec<SectionView>,
    toast_mounted: bool,
    toast: Option<ToastView>,
    armed_confirm: Option<bool>,
    prompts: Vec<String>,
    navigations: Vec<String>,
    time_zone: Option<String>,
    clock: Option<ClockPreview>,
}

impl ConsolePage {
    pub fn new(path: &str, fields: &SessionConfig) -> Self {
        Self {
            path: path.to_owned(),
            fields: fields.clone(),
            customers: Vec::new(),
            catalog: Vec::new(),
            controls: BTreeMap::new(),
            hidden: BTreeMap::new(),
            sections: Vec::new(),
            toast_mounted: false,
            toast: None,
            armed_confirm: None,
            prompts: Vec::new(),
            navigations: Vec::new(),
            time_zone: None,
            clock: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.hidden
            .insert(self.fields.token_field.clone(), token.to_owned());
        self
    }

    pub fn with_rows(mut self, rows: &[OrderRow]) -> Self {
        for row in rows {
            let index = self.customers.len();
            self.customers.push(row.customer.clone());
            let product = row.product.map(|id| id.to_string()).unwrap_or_default();
            let price = row.price.as_deref().unwrap_or_default();
            for (field, value) in [
                (self.fields.identity_field.clone(), row.id.to_string()),
                (self.fields.status_field.clone(), row.status.as_str().to_owned()),
                (self.fields.product_field.clone(), product),
                (self.fields.price_field.clone(), price.replace(',', ".")),
            ] {
                self.controls.insert(
                    control_name(index, &field),
                    ConsoleControl {
                        value,
                        ..ConsoleControl::default()
                    },
                );
            }
        }
        self
    }

    /// Products the product selector offers, in display order.
    pub fn with_catalog(mut self, products: &[(i64, String)]) -> Self {
        self.catalog = products.to_vec();
        self
    }

    /// Adds the site time zone selector and its clock preview.
    pub fn with_time_zone(mut self, zone: &str) -> Self {
        self.time_zone = Some(zone.to_owned());
        self
    }

    pub fn with_sections(mut self, sections: &[(Option<&str>, &str)]) -> Self {
        self.sections = sections
            .iter()
            .enumerate()
            .map(|(index, (key, title))| SectionView {
                index,
                key: key.map(str::to_owned),
                title: (*title).to_owned(),
                expanded: false,
            })
            .collect();
        self
    }

    pub fn row_count(&self) -> usize {
        self.customers.len()
    }

    pub fn customer(&self, row: usize) -> Option<&str> {
        self.customers.get(row).map(String::as_str)
    }

    pub fn status_control(&self, row: usize) -> ControlName {
        control_name(row, &self.fields.status_field)
    }

    pub fn identity_control(&self, row: usize) -> ControlName {
        control_name(row, &self.fields.identity_field)
    }

    pub fn product_control(&self, row: usize) -> ControlName {
        control_name(row, &self.fields.product_field)
    }

    pub fn price_control(&self, row: usize) -> ControlName {
        control_name(row, &self.fields.price_field)
    }

    pub fn control(&self, name: &ControlName) -> Option<&ConsoleControl> {
        self.controls.get(name)
    }

    /// Operator input. Refused while the control is disabled.
    pub fn edit(&mut self, name: &ControlName, value: &str) -> bool {
        match self.controls.get_mut(name) {
            Some(control) if !control.state.is_disabled() => {
                control.value = value.to_owned();
                true
            }
            _ => false,
        }
    }

    pub fn section_views(&self) -> &[SectionView] {
        &self.sections
    }

    pub fn toggle_section(&mut self, index: usize) -> bool {
        match self.sections.get_mut(index) {
            Some(section) => {
                section.expanded = !section.expanded;
                true
            }
            None => false,
        }
    }

    pub fn toast(&self) -> Option<&ToastView> {
        self.toast.as_ref().filter(|toast| toast.visible)
    }

    pub fn toast_mounted(&self) -> bool {
        self.toast_mounted
    }

    /// The answer the next confirmation dialog will get. Unarmed dialogs
    /// are declined.
    pub fn arm_confirm(&mut self, answer: bool) {
        self.armed_confirm = Some(answer);
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    pub fn product_name(&self, product: i64) -> Option<&str> {
        self.catalog
            .iter()
            .find(|(id, _)| *id == product)
            .map(|(_, name)| name.as_str())
    }

    /// Next product in catalog order, passing through "no product" between
    /// the last and the first entry.
    pub fn cycle_product(&self, current: Option<i64>, delta: isize) -> Option<i64> {
        let mut choices = vec![None];
        choices.extend(self.catalog.iter().map(|(id, _)| Some(*id)));
        let position = choices
            .iter()
            .position(|choice| *choice == current)
            .unwrap_or(0) as isize;
        let len = choices.len() as isize;
        choices[(position + delta).rem_euclid(len) as usize]
    }

    /// Operator picked a zone. Returns false on pages without the selector.
    pub fn select_time_zone(&mut self, zone: &str) -> bool {
        match self.time_zone.as_mut() {
            Some(current) => {
                *current = zone.to_owned();
                true
            }
            None => false,
        }
    }

    pub fn clock(&self) -> Option<&ClockPreview> {
        self.clock.as_ref()
    }
}

impl HostPage for ConsolePage {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn control_value(&self, name: &ControlName) -> Option<String> {
        self.controls.get(name).map(|control| control.value.clone())
    }

    fn set_control_value(&mut self, name: &ControlName, value: &str) -> bool {
        match self.controls.get_mut(name) {
            Some(control) => {
                control.value = value.to_owned();
                true
            }
            None => false,
        }
    }

    fn set_control_state(&mut self, name: &ControlName, state: ControlState) {
        if let Some(control) = self.controls.get_mut(name) {
            control.state = state;
        }
    }

    fn set_control_tint(&mut self, name: &ControlName, tint: Option<Tint>) {
        if let Some(control) = self.controls.get_mut(name) {
            control.tint = tint;
        }
    }

    fn hidden_value(&self, name: &str) -> Option<String> {
        self.hidden.get(name).cloned()
    }

    fn sections(&self) -> Vec<SectionView> {
        self.sections.clone()
    }

    fn set_section_expanded(&mut self, index: usize, expanded: bool) {
        if let Some(section) = self.sections.get_mut(index) {
            section.expanded = expanded;
        }
    }

    fn mount_toast(&mut self) {
        self.toast_mounted = true;
    }

    fn render_toast(&mut self, toast: &ToastView) {
        self.toast = Some(toast.clone());
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_owned());
        self.armed_confirm.take().unwrap_or(false)
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_owned());
    }

    fn time_zone(&self) -> Option<String> {
        self.time_zone.clone()
    }

    fn render_clock(&mut self, preview: &ClockPreview) {
        self.clock = Some(preview.clone());
    }
}

pub fn control_name(row: usize, field: &str) -> ControlName {
    ControlName::new(format!("form-{row}-{field}"))
}

pub fn demo_price(product: i64) -> Option<&'static str> {
    DEMO_PRODUCTS
        .iter()
        .find(|(id, _, _)| *id == product)
        .map(|(_, _, price)| *price)
}

/// Zone `delta` steps away from `current` in the selector's list. An unknown
/// zone starts from the top.
pub fn cycle_zone(current: Option<&str>, delta: isize) -> &'static str {
    let len = KNOWN_ZONES.len() as isize;
    let position = KNOWN_ZONES
        .iter()
        .position(|(name, _)| Some(*name) == current);
    let next = match position {
        Some(position) => (position as isize + delta).rem_euclid(len),
        None if delta < 0 => len - 1,
        None => 0,
    };
    KNOWN_ZONES[next as usize].0
}

pub fn demo_page(path: &str, fields: &SessionConfig) -> ConsolePage {
    let catalog = DEMO_PRODUCTS
        .iter()
        .map(|(id, name, _)| (*id, (*name).to_owned()))
        .collect::<Vec<_>>();
    let rows = DEMO_ORDERS
        .iter()
        .map(|(id, customer, status, product)| OrderRow {
            id: *id,
            customer: (*customer).to_owned(),
            status: *status,
            product: *product,
            price: product.and_then(demo_price).map(str::to_owned),
        })
        .collect::<Vec<_>>();
    ConsolePage::new(path, fields)
        .with_token(DEMO_TOKEN)
        .with_catalog(&catalog)
        .with_rows(&rows)
        .with_sections(ORDER_SECTIONS)
        .with_time_zone(DEMO_TIME_ZONE)
}
