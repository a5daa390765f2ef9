// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ClockPreview, ControlName, ControlState, SectionView, Severity, Tint};

/// What the toast surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastView {
    pub message: String,
    pub severity: Severity,
    pub visible: bool,
}

/// The rendered admin page: the host that owns the controls, the toast
/// surface, and the collapsible sections. Everything the core reads or
/// mutates goes through this trait.
pub trait HostPage {
    /// Page identity, the request path in a browser.
    fn path(&self) -> String;

    fn control_value(&self, name: &ControlName) -> Option<String>;
    /// Returns false when no such control is rendered.
    fn set_control_value(&mut self, name: &ControlName, value: &str) -> bool;
    fn set_control_state(&mut self, name: &ControlName, state: ControlState);
    fn set_control_tint(&mut self, name: &ControlName, tint: Option<Tint>);

    /// Value of a hidden form field looked up by name (the anti-forgery token).
    fn hidden_value(&self, name: &str) -> Option<String>;

    fn sections(&self) -> Vec<SectionView>;
    fn set_section_expanded(&mut self, index: usize, expanded: bool);

    /// Called once, before the first toast is rendered.
    fn mount_toast(&mut self);
    fn render_toast(&mut self, toast: &ToastView);

    /// Blocking yes/no dialog.
    fn confirm(&mut self, prompt: &str) -> bool;
    fn navigate(&mut self, url: &str);

    /// Selected zone of the settings page time zone selector. `None` on pages
    /// without a selector and clock preview.
    fn time_zone(&self) -> Option<String> {
        None
    }

    fn render_clock(&mut self, _preview: &ClockPreview) {}
}
