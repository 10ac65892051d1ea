// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

/// The two device stores consulted for each serial, in stage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Registry {
    /// Intune managed devices
    Intune,
    /// Windows Autopilot device identities
    Autopilot,
}

impl Registry {
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Intune => "Intune",
            Self::Autopilot => "Autopilot",
        }
    }

    /// Collection path below the Graph base url
    pub fn path(self) -> &'static str {
        match self {
            Self::Intune => "deviceManagement/managedDevices",
            Self::Autopilot => "deviceManagement/windowsAutopilotDeviceIdentities",
        }
    }

    /// `$select` clause for lookups. Autopilot identities have no
    /// `operatingSystem` property.
    pub fn select(self) -> Option<&'static str> {
        match self {
            Self::Intune => Some("id,operatingSystem"),
            Self::Autopilot => None,
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Missing,
    Success,
    Failure,
    Error,
    DryRun,
}

impl Status {
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Missing => "Missing",
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::Error => "Error",
            Self::DryRun => "Dry Run",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Outcome for one device (or one missing/failed lookup) of one serial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRecord {
    pub serial: String,
    /// Empty for `Missing` and `Error` records
    pub id: String,
    /// Empty for Autopilot records
    pub operating_system: String,
    pub registry: Registry,
    pub status: Status,
    pub error: Option<String>,
}

impl DeviceRecord {
    /// Column names, in export order.
    pub const COLUMNS: [&'static str; 6] =
        ["serial", "id", "operatingSystem", "type", "status", "error"];

    pub(crate) fn lookup(serial: &str, registry: Registry, status: Status) -> Self {
        Self {
            serial: serial.to_string(),
            id: String::new(),
            operating_system: String::new(),
            registry,
            status,
            error: None,
        }
    }

    pub fn missing(serial: &str, registry: Registry) -> Self {
        Self::lookup(serial, registry, Status::Missing)
    }

    pub fn error(serial: &str, registry: Registry, message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::lookup(serial, registry, Status::Error)
        }
    }

    /// Value of the named column, `None` if the column is unknown.
    pub fn get(&self, column: &str) -> Option<&str> {
        Some(match column {
            "serial" => &self.serial,
            "id" => &self.id,
            "operatingSystem" => &self.operating_system,
            "type" => self.registry.to_str(),
            "status" => self.status.to_str(),
            "error" => self.error.as_deref().unwrap_or(""),
            _ => return None,
        })
    }
}
