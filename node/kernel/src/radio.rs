//! Scan/advertise mode state machine.
//!
//! Scanning and advertising are mutually exclusive on the radio. The upstream
//! firmware documents the invariant but leaves enforcement to caller
//! discipline; here every transition is guarded and an illegal one fails with
//! [`KernelError::InvalidState`] instead of reaching the radio.

use crate::KernelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The radio's current mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RadioMode {
    /// Neither scanning nor advertising
    #[default]
    Idle,
    /// Scanning for peers until the transport's timeout fires
    Scanning,
    /// Advertising this node to scanners
    Advertising,
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadioMode::Idle => "idle",
            RadioMode::Scanning => "scanning",
            RadioMode::Advertising => "advertising",
        };
        f.write_str(name)
    }
}

/// Guarded scan/advertise state
#[derive(Debug, Default)]
pub struct RadioState {
    mode: RadioMode,
}

impl RadioState {
    /// Create an idle radio state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    pub fn mode(&self) -> RadioMode {
        self.mode
    }

    /// Whether the radio is scanning
    pub fn is_scanning(&self) -> bool {
        self.mode == RadioMode::Scanning
    }

    /// Whether the radio is advertising
    pub fn is_advertising(&self) -> bool {
        self.mode == RadioMode::Advertising
    }

    /// Idle -> Scanning
    pub fn start_scanning(&mut self) -> Result<(), KernelError> {
        self.transition(RadioMode::Idle, RadioMode::Scanning)
    }

    /// Scanning -> Idle, caller-initiated
    pub fn stop_scanning(&mut self) -> Result<(), KernelError> {
        self.transition(RadioMode::Scanning, RadioMode::Idle)
    }

    /// Idle -> Advertising
    pub fn start_advertising(&mut self) -> Result<(), KernelError> {
        self.transition(RadioMode::Idle, RadioMode::Advertising)
    }

    /// Advertising -> Idle
    pub fn stop_advertising(&mut self) -> Result<(), KernelError> {
        self.transition(RadioMode::Advertising, RadioMode::Idle)
    }

    /// Forced revert to idle when the transport signals scan-timeout expiry.
    ///
    /// This is an external event, not a caller request, so it never fails; a
    /// late timeout after `stop_scanning` is ignored.
    pub fn scan_complete(&mut self) {
        if self.mode == RadioMode::Scanning {
            debug!("scan timeout expired, radio back to idle");
            self.mode = RadioMode::Idle;
        }
    }

    fn transition(&mut self, expected: RadioMode, to: RadioMode) -> Result<(), KernelError> {
        if self.mode != expected {
            return Err(KernelError::InvalidState {
                current: self.mode,
                requested: to,
            });
        }
        debug!("radio {} -> {}", self.mode, to);
        self.mode = to;
        Ok(())
    }
}
