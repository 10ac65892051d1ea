// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use crate::{
    api::{Device, DeviceApi},
    observer::Observer,
    record::{DeviceRecord, Registry, Status},
};

/// Everything one serial's workflow needs, shared read-only by all tasks of a
/// batch.
pub struct RemoveContext<'a> {
    pub api: &'a dyn DeviceApi,
    pub token: &'a str,
    pub dry_run: bool,
    /// Intune operating system that makes the Autopilot stage run,
    /// compared case-insensitively
    pub gate_platform: &'a str,
    pub observer: &'a dyn Observer,
}

impl<'a> RemoveContext<'a> {
    fn push(&self, records: &mut Vec<DeviceRecord>, record: DeviceRecord) {
        self.observer.event(&(&record).into());
        records.push(record);
    }

    /// Look `serial` up in `registry` and delete (or pretend to delete) every
    /// match. Returns the matches; an empty list when the lookup failed.
    fn stage(
        &self,
        records: &mut Vec<DeviceRecord>,
        serial: &str,
        registry: Registry,
    ) -> Vec<Device> {
        let devices = match self.api.find_devices(self.token, registry, serial) {
            Ok(devices) => devices,
            Err(err) => {
                let record = DeviceRecord::error(serial, registry, err.record_message());
                self.push(records, record);
                return Vec::new();
            }
        };

        if devices.is_empty() {
            self.push(records, DeviceRecord::missing(serial, registry));
        }

        for device in &devices {
            let mut record = DeviceRecord {
                serial: serial.to_string(),
                id: device.id.clone(),
                operating_system: device.operating_system.clone().unwrap_or_default(),
                registry,
                status: Status::DryRun,
                error: None,
            };
            if !self.dry_run {
                match self.api.delete_device(self.token, registry, &device.id) {
                    Ok(()) => record.status = Status::Success,
                    Err(err) => {
                        record.status = Status::Failure;
                        record.error = Some(err.record_message());
                    }
                }
            }
            self.push(records, record);
        }

        devices
    }

    fn gate(&self, devices: &[Device]) -> bool {
        devices.iter().any(|device| {
            device
                .operating_system
                .as_deref()
                .map_or(false, |os| os.eq_ignore_ascii_case(self.gate_platform))
        })
    }
}

/// Remove one serial from Intune and, if any Intune match runs the gate
/// platform, from Autopilot.
///
/// Always returns at least one record. Intune records come before Autopilot
/// records. Lookup and delete failures are reported as records and never
/// returned as errors.
pub fn remove_device(cx: &RemoveContext, serial: &str) -> Vec<DeviceRecord> {
    let mut records = Vec::new();

    let managed = cx.stage(&mut records, serial, Registry::Intune);
    if cx.gate(&managed) {
        cx.stage(&mut records, serial, Registry::Autopilot);
    } else {
        log::debug!("Skipping Autopilot for serial {}", serial);
    }

    records
}
