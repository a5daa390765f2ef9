// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::{HostPage, SectionView};

const PAGE_KEY_PREFIX: &str = "collapse_state_";

/// Client-local key/value storage for UI state that must survive navigation.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One persisted open section: its stable key when the page renders one,
/// otherwise its position in document order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionRef {
    Index(usize),
    Key(String),
}

impl SectionRef {
    fn for_section(section: &SectionView) -> Self {
        match &section.key {
            Some(key) => Self::Key(key.clone()),
            None => Self::Index(section.index),
        }
    }

    fn matches(&self, section: &SectionView) -> bool {
        match self {
            Self::Index(index) => section.key.is_none() && *index == section.index,
            Self::Key(key) => section.key.as_deref() == Some(key.as_str()),
        }
    }
}

pub fn page_key(path: &str) -> String {
    format!("{PAGE_KEY_PREFIX}{path}")
}

/// Remembers which collapsible sections are open, per page.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollapsiblePersister;

impl CollapsiblePersister {
    pub fn new() -> Self {
        Self
    }

    /// Persisted open set for `path`. Unreadable or malformed state reads as
    /// empty.
    pub fn load<S: StateStore + ?Sized>(&self, store: &S, path: &str) -> Vec<SectionRef> {
        let key = page_key(path);
        let raw = match store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                debug!(%key, error = %format!("{error:#}"), "section state unreadable, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<SectionRef>>(&raw) {
            Ok(refs) => refs,
            Err(error) => {
                debug!(%key, %error, "section state malformed, starting empty");
                Vec::new()
            }
        }
    }

    /// Expands every persisted section and returns the indices it expanded.
    /// Sections not listed are left alone, so repeating a restore is harmless.
    pub fn restore<P, S>(&self, page: &mut P, store: &S) -> BTreeSet<usize>
    where
        P: HostPage + ?Sized,
        S: StateStore + ?Sized,
    {
        let refs = self.load(store, &page.path());
        let mut expanded = BTreeSet::new();
        if refs.is_empty() {
            return expanded;
        }
        for section in page.sections() {
            if refs.iter().any(|open| open.matches(&section)) {
                page.set_section_expanded(section.index, true);
                expanded.insert(section.index);
            }
        }
        expanded
    }

    /// Persists the currently expanded sections, in document order.
    pub fn capture<P, S>(&self, page: &P, store: &mut S) -> Vec<SectionRef>
    where
        P: HostPage + ?Sized,
        S: StateStore + ?Sized,
    {
        let open = page
            .sections()
            .iter()
            .filter(|section| section.expanded)
            .map(SectionRef::for_section)
            .collect::<Vec<_>>();

        let key = page_key(&page.path());
        match serde_json::to_string(&open) {
            Ok(raw) => {
                if let Err(error) = store.set(&key, &raw) {
                    warn!(%key, error = %format!("{error:#}"), "persist section state");
                }
            }
            Err(error) => warn!(%key, %error, "encode section state"),
        }
        open
    }
}
