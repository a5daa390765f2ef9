// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

use crate::{
    ControlName, HostPage, Notification, SUCCESS_FLASH_FOR, Severity, TOAST_VISIBLE_FOR, TimerKey,
    Timers, Tint, ToastView,
};

/// The shared toast surface plus per-control result flashes.
#[derive(Debug, Default)]
pub struct FeedbackPresenter {
    surface: Option<ToastView>,
    expires_at: Option<Duration>,
}

impl FeedbackPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever the surface shows and arms the hide timer.
    pub fn notify<P: HostPage + ?Sized>(
        &mut self,
        page: &mut P,
        timers: &mut Timers,
        message: impl Into<String>,
        severity: Severity,
    ) {
        if self.surface.is_none() {
            page.mount_toast();
        }
        let toast = ToastView {
            message: message.into(),
            severity,
            visible: true,
        };
        page.render_toast(&toast);
        self.surface = Some(toast);
        timers.schedule(TimerKey::HideToast, TOAST_VISIBLE_FOR);
        self.expires_at = Some(timers.now() + TOAST_VISIBLE_FOR);
    }

    pub fn hide<P: HostPage + ?Sized>(&mut self, page: &mut P) {
        let Some(toast) = self.surface.as_mut() else {
            return;
        };
        toast.visible = false;
        page.render_toast(toast);
        self.expires_at = None;
    }

    pub fn surface(&self) -> Option<&ToastView> {
        self.surface.as_ref()
    }

    /// The notification on screen, if the surface is showing one.
    pub fn current(&self) -> Option<Notification> {
        let toast = self.surface.as_ref().filter(|toast| toast.visible)?;
        Some(Notification {
            message: toast.message.clone(),
            severity: toast.severity,
            expires_at: self.expires_at?,
        })
    }

    /// Success flashes clear themselves; error flashes stay until overwritten.
    pub fn flash<P: HostPage + ?Sized>(
        &mut self,
        page: &mut P,
        timers: &mut Timers,
        control: &ControlName,
        tint: Tint,
    ) {
        page.set_control_tint(control, Some(tint));
        let key = TimerKey::ClearFlash(control.clone());
        match tint {
            Tint::Success => {
                timers.schedule(key, SUCCESS_FLASH_FOR);
            }
            Tint::Error => {
                timers.cancel(&key);
            }
        }
    }

    pub fn clear_flash<P: HostPage + ?Sized>(&mut self, page: &mut P, control: &ControlName) {
        page.set_control_tint(control, None);
    }
}
