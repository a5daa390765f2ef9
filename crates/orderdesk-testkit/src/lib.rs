// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use orderdesk_app::{
    ClockPreview, ControlName, ControlState, HostPage, LookupReply, LookupRequest, OrderStatus,
    RawPrice, SectionView, StateStore, Tint, ToastView, Transport, TransportError, UpdateReply,
    UpdateRequest,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

pub const FIXTURE_TOKEN: &str = "fixture-csrf-token";
pub const FIXTURE_PATH: &str = "/admin/orders/order/";

const FIRST_NAMES: [&str; 12] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Rowan",
];
const BOUQUETS: [&str; 8] = [
    "Spring Tulips",
    "Red Roses x25",
    "Peony Cloud",
    "Wildflower Basket",
    "White Lilies",
    "Sunflower Bunch",
    "Orchid Pot",
    "Seasonal Mix",
];

/// A rendered control as the fake page keeps it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FakeControl {
    pub value: String,
    pub state: ControlState,
    pub tint: Option<Tint>,
    pub tint_history: Vec<Option<Tint>>,
    pub state_history: Vec<ControlState>,
}

/// In-memory admin page implementing the host capability.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub path: String,
    pub controls: BTreeMap<ControlName, FakeControl>,
    pub hidden: BTreeMap<String, String>,
    pub sections: Vec<SectionView>,
    pub toast_mounts: usize,
    pub toasts: Vec<ToastView>,
    pub confirm_answer: bool,
    pub prompts: Vec<String>,
    pub navigations: Vec<String>,
    pub time_zone: Option<String>,
    pub clocks: Vec<ClockPreview>,
}

impl FakePage {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            ..Self::default()
        }
    }

    /// Order list page with a token and `form-N-id` / `form-N-status` pairs.
    pub fn order_list(rows: &[(i64, OrderStatus)]) -> Self {
        let mut page = Self::new(FIXTURE_PATH).with_token(FIXTURE_TOKEN);
        for (index, (id, status)) in rows.iter().enumerate() {
            page = page.with_order_row(index, *id, *status);
        }
        page
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.hidden
            .insert("csrfmiddlewaretoken".to_owned(), token.to_owned());
        self
    }

    pub fn with_control(mut self, name: &str, value: &str) -> Self {
        self.controls.insert(
            ControlName::new(name),
            FakeControl {
                value: value.to_owned(),
                ..FakeControl::default()
            },
        );
        self
    }

    pub fn with_order_row(self, index: usize, id: i64, status: OrderStatus) -> Self {
        self.with_control(&format!("form-{index}-id"), &id.to_string())
            .with_control(&format!("form-{index}-status"), status.as_str())
    }

    pub fn with_item_row(self, index: usize, product: Option<i64>, price: &str) -> Self {
        let product = product.map(|id| id.to_string()).unwrap_or_default();
        self.with_control(&format!("items-{index}-product"), &product)
            .with_control(&format!("items-{index}-price"), price)
    }

    /// Sections in document order: `(stable key, expanded)`.
    pub fn with_sections(mut self, sections: &[(Option<&str>, bool)]) -> Self {
        self.sections = sections
            .iter()
            .enumerate()
            .map(|(index, (key, expanded))| SectionView {
                index,
                key: key.map(str::to_owned),
                title: format!("Section {index}"),
                expanded: *expanded,
            })
            .collect();
        self
    }

    /// Settings page with a zone selector holding `zone`.
    pub fn with_time_zone(mut self, zone: &str) -> Self {
        self.time_zone = Some(zone.to_owned());
        self
    }

    pub fn answering(mut self, confirm: bool) -> Self {
        self.confirm_answer = confirm;
        self
    }

    /// What the operator does before the change event fires.
    pub fn edit(&mut self, name: &str, value: &str) -> ControlName {
        let name = ControlName::new(name);
        self.controls.entry(name.clone()).or_default().value = value.to_owned();
        name
    }

    pub fn control(&self, name: &str) -> Option<&FakeControl> {
        self.controls.get(&ControlName::new(name))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.control(name).map(|control| control.value.as_str())
    }

    pub fn remove_control(&mut self, name: &str) {
        self.controls.remove(&ControlName::new(name));
    }

    pub fn expanded_indices(&self) -> Vec<usize> {
        self.sections
            .iter()
            .filter(|section| section.expanded)
            .map(|section| section.index)
            .collect()
    }

    pub fn collapse_all(&mut self) {
        for section in &mut self.sections {
            section.expanded = false;
        }
    }

    pub fn last_toast(&self) -> Option<&ToastView> {
        self.toasts.last()
    }

    pub fn last_clock(&self) -> Option<&ClockPreview> {
        self.clocks.last()
    }
}

impl HostPage for FakePage {
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
            control.state_history.push(state);
        }
    }

    fn set_control_tint(&mut self, name: &ControlName, tint: Option<Tint>) {
        if let Some(control) = self.controls.get_mut(name) {
            control.tint = tint;
            control.tint_history.push(tint);
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
        self.toast_mounts += 1;
    }

    fn render_toast(&mut self, toast: &ToastView) {
        self.toasts.push(toast.clone());
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_owned());
        self.confirm_answer
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_owned());
    }

    fn time_zone(&self) -> Option<String> {
        self.time_zone.clone()
    }

    fn render_clock(&mut self, preview: &ClockPreview) {
        self.clocks.push(preview.clone());
    }
}

/// Transport that answers from queued replies and records what it was sent.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    updates: RefCell<VecDeque<Result<UpdateReply, TransportError>>>,
    lookups: RefCell<VecDeque<Result<LookupReply, TransportError>>>,
    sent_updates: RefCell<Vec<UpdateRequest>>,
    sent_lookups: RefCell<Vec<LookupRequest>>,
    visits: RefCell<VecDeque<Result<(), TransportError>>>,
    visited: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_update(&self, reply: Result<UpdateReply, TransportError>) -> &Self {
        self.updates.borrow_mut().push_back(reply);
        self
    }

    pub fn push_lookup(&self, reply: Result<LookupReply, TransportError>) -> &Self {
        self.lookups.borrow_mut().push_back(reply);
        self
    }

    pub fn push_visit(&self, reply: Result<(), TransportError>) -> &Self {
        self.visits.borrow_mut().push_back(reply);
        self
    }

    pub fn sent_updates(&self) -> Vec<UpdateRequest> {
        self.sent_updates.borrow().clone()
    }

    pub fn sent_lookups(&self) -> Vec<LookupRequest> {
        self.sent_lookups.borrow().clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send_update(&self, request: &UpdateRequest) -> Result<UpdateReply, TransportError> {
        self.sent_updates.borrow_mut().push(request.clone());
        self.updates
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(unreachable_error()))
    }

    fn lookup_price(&self, request: &LookupRequest) -> Result<LookupReply, TransportError> {
        self.sent_lookups.borrow_mut().push(*request);
        self.lookups
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(unreachable_error()))
    }

    fn visit(&self, url: &str) -> Result<(), TransportError> {
        self.visited.borrow_mut().push(url.to_owned());
        self.visits
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(unreachable_error()))
    }
}

/// State store backed by a map, with switchable failures.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub entries: BTreeMap<String, String>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            bail!("memory store read of {key} disabled");
        }
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            bail!("memory store write of {key} disabled");
        }
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

pub fn saved(message: &str) -> Result<UpdateReply, TransportError> {
    Ok(UpdateReply {
        success: true,
        message: Some(message.to_owned()),
        error: None,
    })
}

pub fn rejected(error: &str) -> Result<UpdateReply, TransportError> {
    Ok(UpdateReply {
        success: false,
        message: None,
        error: Some(error.to_owned()),
    })
}

pub fn priced(price: &str) -> Result<LookupReply, TransportError> {
    Ok(LookupReply {
        price: Some(RawPrice::Text(price.to_owned())),
    })
}

pub fn unreachable_error() -> TransportError {
    TransportError::Unreachable {
        url: "http://127.0.0.1:1/".to_owned(),
        detail: "connection refused".to_owned(),
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFixture {
    pub id: i64,
    pub customer: String,
    pub bouquet: String,
    pub status: OrderStatus,
}

/// Reproducible order rows for list-page fixtures.
#[derive(Debug, Clone)]
pub struct OrderFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl OrderFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1000 + (normalized % 100) as i64,
        }
    }

    pub fn order(&mut self) -> OrderFixture {
        let id = self.next_id;
        self.next_id += 1;
        OrderFixture {
            id,
            customer: self.pick(&FIRST_NAMES).to_owned(),
            bouquet: self.pick(&BOUQUETS).to_owned(),
            status: OrderStatus::ALL[self.rng.int_n(OrderStatus::ALL.len())],
        }
    }

    pub fn orders(&mut self, count: usize) -> Vec<OrderFixture> {
        (0..count).map(|_| self.order()).collect()
    }

    pub fn order_page(&mut self, count: usize) -> (FakePage, Vec<OrderFixture>) {
        let orders = self.orders(count);
        let rows = orders
            .iter()
            .map(|order| (order.id, order.status))
            .collect::<Vec<_>>();
        (FakePage::order_list(&rows), orders)
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}
