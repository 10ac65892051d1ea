// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    limiter::DEFAULT_CONCURRENCY,
};

const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/beta";
const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
const DEFAULT_GATE_PLATFORM: &str = "windows";
pub const CONF_PATH: &str = "/etc/device-remover.conf";
pub const CONF_ENV: &str = "DEVICE_REMOVER_CONF";

#[derive(Debug, Default, serde::Deserialize)]
pub struct Conf {
    authority_url: Option<String>,
    graph_url: Option<String>,
    scope: Option<String>,
    concurrency: Option<usize>,
    gate_platform: Option<String>,
}

impl Conf {
    pub fn authority_url(&self) -> &str {
        self.authority_url
            .as_deref()
            .unwrap_or(DEFAULT_AUTHORITY_URL)
    }

    pub fn graph_url(&self) -> &str {
        self.graph_url.as_deref().unwrap_or(DEFAULT_GRAPH_URL)
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_SCOPE)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    /// Operating system of an Intune match that makes the Autopilot stage run
    pub fn gate_platform(&self) -> &str {
        self.gate_platform
            .as_deref()
            .unwrap_or(DEFAULT_GATE_PLATFORM)
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read `path`. A missing file is not an error.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) => Self::parse(&s),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Load from `path`, else `$DEVICE_REMOVER_CONF`, else
    /// `/etc/device-remover.conf`.
    ///
    /// A `path` given by the caller must exist and parse. The implicit
    /// locations fall back to defaults with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::parse(&fs::read_to_string(path)?);
        }
        let path: PathBuf = env::var_os(CONF_ENV)
            .map(Into::into)
            .unwrap_or_else(|| CONF_PATH.into());
        Ok(Self::read(&path).unwrap_or_else(|err| {
            log::warn!("Failed to parse `{}`: {}", path.display(), err);
            Self::default()
        }))
    }
}
