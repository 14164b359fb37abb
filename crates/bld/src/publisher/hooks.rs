// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Forward-link rewiring of trigger records.
//!
//! Starting a publisher splices its hook record into the trigger's
//! processing chain:
//!
//! ```text
//! before:  trigger -> next
//! after:   trigger -> hook -> next
//! ```
//!
//! Stopping restores `trigger -> next` and clears the hook's link.

use crate::config::NO_LINK;
use crate::error::Result;
use crate::pv::TriggerChain;

/// One trigger/hook pair and the link saved at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookLink {
    trigger: String,
    hook: String,
    saved: Option<String>,
    installed: bool,
}

impl HookLink {
    #[must_use]
    pub fn new(trigger: impl Into<String>, hook: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            hook: hook.into(),
            saved: None,
            installed: false,
        }
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }

    /// Link the trigger had before install; `None` if it had none.
    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref()
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Splice the hook after the trigger.
    pub fn install(&mut self, chain: &dyn TriggerChain, debug_level: i32) -> Result<()> {
        let prev = chain.read_forward_link(&self.trigger)?;
        let prev = (!prev.is_empty() && prev != NO_LINK).then_some(prev);

        if let Some(link) = &prev {
            if debug_level > 0 {
                log::debug!("[BLD] Setting FLNK: {}.FLNK = {}", self.hook, link);
            }
            chain.write_forward_link(&self.hook, link)?;
        }

        if debug_level > 0 {
            log::debug!("[BLD] Setting FLNK: {}.FLNK = {}", self.trigger, self.hook);
        }
        chain.write_forward_link(&self.trigger, &self.hook)?;

        self.saved = prev;
        self.installed = true;
        Ok(())
    }

    /// Put the trigger's original link back. No-op if not installed.
    pub fn restore(&mut self, chain: &dyn TriggerChain, debug_level: i32) -> Result<()> {
        if !self.installed {
            return Ok(());
        }
        let link = self.saved.as_deref().unwrap_or("");
        if debug_level > 0 {
            log::debug!("[BLD] Setting FLNK: {}.FLNK = {}", self.trigger, link);
        }
        chain.write_forward_link(&self.trigger, link)?;

        if self.saved.is_some() {
            if debug_level > 0 {
                log::debug!("[BLD] Setting FLNK: {}.FLNK = \"\"", self.hook);
            }
            chain.write_forward_link(&self.hook, "")?;
        }

        self.saved = None;
        self.installed = false;
        Ok(())
    }
}
