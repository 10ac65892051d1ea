// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::record::{DeviceRecord, Registry, Status};

/// Progress event, emitted once per record as it is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event<'a> {
    pub serial: &'a str,
    pub registry: Registry,
    pub status: Status,
    /// Empty when no device was involved
    pub device_id: &'a str,
    pub error: Option<&'a str>,
}

impl<'a> From<&'a DeviceRecord> for Event<'a> {
    fn from(record: &'a DeviceRecord) -> Self {
        Self {
            serial: &record.serial,
            registry: record.registry,
            status: record.status,
            device_id: &record.id,
            error: record.error.as_deref(),
        }
    }
}

/// Receives progress events from concurrently running per-serial tasks.
pub trait Observer: Sync {
    fn event(&self, event: &Event);
}

impl<F: Fn(&Event) + Sync> Observer for F {
    fn event(&self, event: &Event) {
        self(event)
    }
}

/// Forwards events to the `log` facade.
pub struct LogObserver;

impl Observer for LogObserver {
    fn event(&self, event: &Event) {
        match event.status {
            Status::Missing => log::info!(
                "Missing: {} device with serial {}",
                event.registry,
                event.serial
            ),
            Status::DryRun => log::info!(
                "Dry run: Would delete {} device {} ({})",
                event.registry,
                event.device_id,
                event.serial
            ),
            Status::Success => log::info!(
                "Deleted {} device {} ({})",
                event.registry,
                event.device_id,
                event.serial
            ),
            Status::Failure => log::warn!(
                "Failed to delete {} device {} ({}): {}",
                event.registry,
                event.device_id,
                event.serial,
                event.error.unwrap_or_default()
            ),
            Status::Error => log::error!(
                "{} error for serial {}: {}",
                event.registry,
                event.serial,
                event.error.unwrap_or_default()
            ),
        }
    }
}
