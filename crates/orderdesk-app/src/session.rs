// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, error};

use crate::{
    BulkError, CAPTURE_SETTLE_AFTER, CLOCK_REFRESH_EVERY, ClockPreview, CollapsiblePersister,
    ControlName, FeedbackPresenter, FieldWatcher, HostPage, LookupOutcome, LookupReply,
    PendingLookup, PendingUpdate, RESTORE_RETRY_AFTER, RelatedFieldResolver, RenumberAction,
    SectionRef, SelectionStep, StateStore, TimerKey, Timers, Transport, TransportError,
    UpdateDispatcher, UpdateOutcome, UpdateReply, refresh_clock, report_visit, request_renumber,
};

/// Names the host page uses for the controls the session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub status_field: String,
    pub identity_field: String,
    pub product_field: String,
    pub price_field: String,
    pub token_field: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            status_field: "status".to_owned(),
            identity_field: "id".to_owned(),
            product_field: "product".to_owned(),
            price_field: "price".to_owned(),
            token_field: "csrfmiddlewaretoken".to_owned(),
        }
    }
}

/// Network work produced by an event, for the host to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Update(PendingUpdate),
    Lookup(PendingLookup),
    /// A confirmed renumber job URL the page navigated to.
    Visit { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Update(PendingUpdate, Result<UpdateReply, TransportError>),
    Lookup(PendingLookup, Result<LookupReply, TransportError>),
    Visit {
        url: String,
        result: Result<(), TransportError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobReport {
    Update(Option<UpdateOutcome>),
    Lookup(LookupOutcome),
    Visit { url: String, started: bool },
}

impl Job {
    /// Runs the request to completion. Safe to call off the event loop.
    pub fn execute<T: Transport + ?Sized>(self, transport: &T) -> JobResult {
        match self {
            Self::Update(pending) => {
                let result = transport.send_update(&pending.request);
                JobResult::Update(pending, result)
            }
            Self::Lookup(lookup) => {
                let result = transport.lookup_price(&lookup.request);
                JobResult::Lookup(lookup, result)
            }
            Self::Visit { url } => {
                let result = transport.visit(&url);
                JobResult::Visit { url, result }
            }
        }
    }
}

/// Event-loop side of the enhancement layer. Without a host page every
/// handler does nothing.
pub struct Session<P, S> {
    page: Option<P>,
    store: S,
    timers: Timers,
    watcher: FieldWatcher,
    dispatcher: UpdateDispatcher,
    feedback: FeedbackPresenter,
    resolver: RelatedFieldResolver,
    persister: CollapsiblePersister,
    wall_epoch: OffsetDateTime,
}

impl<P: HostPage, S: StateStore> Session<P, S> {
    pub fn new(page: Option<P>, store: S, config: &SessionConfig) -> Self {
        if page.is_none() {
            debug!("no host page attached; inline editing disabled");
        }
        Self {
            page,
            store,
            timers: Timers::new(),
            watcher: FieldWatcher::new(&config.status_field, &config.identity_field),
            dispatcher: UpdateDispatcher::new(&config.token_field),
            feedback: FeedbackPresenter::new(),
            resolver: RelatedFieldResolver::new(&config.product_field, &config.price_field),
            persister: CollapsiblePersister::new(),
            wall_epoch: OffsetDateTime::now_utc(),
        }
    }

    /// Pins the wall-clock time that matches the start of the session clock.
    pub fn with_wall_clock(mut self, epoch: OffsetDateTime) -> Self {
        self.wall_epoch = epoch;
        self
    }

    pub fn wall_now(&self) -> OffsetDateTime {
        self.wall_epoch + self.timers.now()
    }

    pub fn page(&self) -> Option<&P> {
        self.page.as_ref()
    }

    pub fn page_mut(&mut self) -> Option<&mut P> {
        self.page.as_mut()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn dispatcher(&self) -> &UpdateDispatcher {
        &self.dispatcher
    }

    pub fn feedback(&self) -> &FeedbackPresenter {
        &self.feedback
    }

    /// Page-ready: restore sections now and once more shortly after, for
    /// sections the page finishes laying out late. Pages with a zone
    /// selector also start the clock preview.
    pub fn ready(&mut self) -> BTreeSet<usize> {
        let now = self.wall_now();
        let Some(page) = self.page.as_mut() else {
            return BTreeSet::new();
        };
        let expanded = self.persister.restore(page, &self.store);
        self.timers
            .schedule(TimerKey::RestoreSections, RESTORE_RETRY_AFTER);
        if page.time_zone().is_some() {
            refresh_clock(page, now);
            self.timers
                .schedule(TimerKey::RefreshClock, CLOCK_REFRESH_EVERY);
        }
        expanded
    }

    pub fn control_changed(&mut self, control: &ControlName) -> Option<Job> {
        let page = self.page.as_mut()?;

        match self.watcher.observe(page, control) {
            Ok(Some(change)) => {
                return match self.dispatcher.submit(page, change) {
                    Ok(pending) => Some(Job::Update(pending)),
                    Err(err) => {
                        error!(%control, error = %err, "inline update not sent");
                        None
                    }
                };
            }
            Ok(None) => {}
            Err(err) => {
                error!(%control, error = %err, "inline update not sent");
                return None;
            }
        }

        match self.resolver.on_selection(page, &mut self.feedback, control) {
            Ok(Some(SelectionStep::Lookup(lookup))) => Some(Job::Lookup(lookup)),
            Ok(Some(SelectionStep::Cleared { .. })) | Ok(None) => None,
            Err(err) => {
                error!(%control, error = %err, "price lookup not sent");
                None
            }
        }
    }

    /// A section header was clicked. Capture waits for the toggle to settle;
    /// a later click pushes the capture back.
    pub fn section_toggled(&mut self) {
        if self.page.is_none() {
            return;
        }
        self.timers
            .schedule(TimerKey::CaptureSections, CAPTURE_SETTLE_AFTER);
    }

    /// The zone selector changed; the preview follows without waiting for
    /// the next refresh.
    pub fn zone_changed(&mut self) -> Option<ClockPreview> {
        let now = self.wall_now();
        let page = self.page.as_mut()?;
        refresh_clock(page, now)
    }

    pub fn form_submitted(&mut self) -> Vec<SectionRef> {
        let Some(page) = self.page.as_ref() else {
            return Vec::new();
        };
        self.persister.capture(page, &mut self.store)
    }

    /// Advances the clock and fires whatever came due.
    pub fn tick(&mut self, now: Duration) {
        let due = self.timers.advance(now);
        let wall_now = self.wall_now();
        let Some(page) = self.page.as_mut() else {
            return;
        };
        for key in due {
            match key {
                TimerKey::HideToast => self.feedback.hide(page),
                TimerKey::ClearFlash(control) => self.feedback.clear_flash(page, &control),
                TimerKey::RestoreSections => {
                    self.persister.restore(page, &self.store);
                }
                TimerKey::CaptureSections => {
                    self.persister.capture(page, &mut self.store);
                }
                TimerKey::RefreshClock => {
                    refresh_clock(page, wall_now);
                    self.timers
                        .schedule(TimerKey::RefreshClock, CLOCK_REFRESH_EVERY);
                }
            }
        }
    }

    pub fn complete(&mut self, result: JobResult) -> Option<JobReport> {
        let page = self.page.as_mut()?;
        let report = match result {
            JobResult::Update(pending, result) => JobReport::Update(self.dispatcher.resolve(
                page,
                &mut self.feedback,
                &mut self.timers,
                pending,
                result,
            )),
            JobResult::Lookup(lookup, result) => JobReport::Lookup(self.resolver.resolve(
                page,
                &mut self.feedback,
                &mut self.timers,
                lookup,
                result,
            )),
            JobResult::Visit { url, result } => {
                let started =
                    report_visit(page, &mut self.feedback, &mut self.timers, &url, result);
                JobReport::Visit { url, started }
            }
        };
        Some(report)
    }

    /// Runs a job inline and applies its result.
    pub fn run_job<T: Transport + ?Sized>(&mut self, job: Job, transport: &T) -> Option<JobReport> {
        let result = job.execute(transport);
        self.complete(result)
    }

    /// Confirms and navigates to a renumber job. The returned visit job
    /// carries the navigation to the server.
    pub fn request_renumber(
        &mut self,
        action: RenumberAction,
        raw_start: &str,
    ) -> Result<Option<Job>, BulkError> {
        let Some(page) = self.page.as_mut() else {
            return Ok(None);
        };
        let url = request_renumber(page, action, raw_start)?;
        Ok(url.map(|url| Job::Visit { url }))
    }
}
