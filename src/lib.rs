// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

pub mod api;
pub mod conf;
pub mod connection;
pub mod error;
pub mod limiter;
pub mod observer;
pub mod odata;
pub mod record;
pub mod remover;
pub mod table;

use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use time::{format_description, OffsetDateTime};

pub use api::{Device, DeviceApi, GraphApi, TokenProvider};
pub use conf::Conf;
pub use connection::ConnectionInfo;
pub use error::{ApiError, Error, Result};
pub use observer::{Event, LogObserver, Observer};
pub use record::{DeviceRecord, Registry, Status};

use remover::RemoveContext;

#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Look devices up but issue no delete calls
    pub dry_run: bool,
    /// Serials processed at once
    pub concurrency: usize,
    /// Intune operating system that makes the Autopilot stage run
    pub gate_platform: String,
}

impl BatchOptions {
    pub fn new(conf: &Conf, dry_run: bool) -> Self {
        Self {
            dry_run,
            concurrency: conf.concurrency(),
            gate_platform: conf.gate_platform().to_string(),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new(&Conf::default(), false)
    }
}

/// One run over a list of serials: one token, one concurrency window.
pub struct Batch<'a> {
    pub tokens: &'a dyn TokenProvider,
    pub api: &'a dyn DeviceApi,
    pub observer: &'a dyn Observer,
    pub options: BatchOptions,
}

impl<'a> Batch<'a> {
    fn validate(&self, serials: &[String], connection: &ConnectionInfo) -> Result<NonZeroUsize> {
        connection.validate()?;
        let limit = NonZeroUsize::new(self.options.concurrency)
            .ok_or_else(|| Error::Validation("Concurrency must be at least 1".to_string()))?;
        // An empty `contains` filter would match every device in the tenant
        if let Some(pos) = serials.iter().position(|s| s.trim().is_empty()) {
            return Err(Error::Validation(format!(
                "Serial number {} is blank",
                pos + 1
            )));
        }
        Ok(limit)
    }

    /// Process every serial and return the records in input order.
    ///
    /// Fails only on invalid input or when no token can be obtained, before
    /// any device is touched. Everything after that is reported per record.
    pub fn run(
        &self,
        serials: &[String],
        connection: &ConnectionInfo,
    ) -> Result<Vec<DeviceRecord>> {
        let limit = self.validate(serials, connection)?;

        let token = self.tokens.token(connection)?;
        log::info!(
            "Processing {} serials{}",
            serials.len(),
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        let cx = RemoveContext {
            api: self.api,
            token: &token,
            dry_run: self.options.dry_run,
            gate_platform: &self.options.gate_platform,
            observer: self.observer,
        };
        let cx = &cx;

        let tasks = serials
            .iter()
            .map(|serial| move || Ok::<_, Error>(remover::remove_device(cx, serial)))
            .collect::<Vec<_>>();
        let results = limiter::run_bounded(tasks, limit);

        let mut records = Vec::with_capacity(results.len());
        for (serial, result) in serials.iter().zip(results) {
            match result {
                Ok(mut serial_records) => records.append(&mut serial_records),
                Err(err) => {
                    let record = DeviceRecord::error(serial, Registry::Intune, err.message);
                    self.observer.event(&(&record).into());
                    records.push(record);
                }
            }
        }

        log::info!("Finished processing all devices.");
        Ok(records)
    }
}

/// File name for a result set written at `now`:
/// `results_YYYYMMDDHHmm.csv` or `dryrun_results_YYYYMMDDHHmm.csv`.
pub fn result_file_name(dry_run: bool, now: OffsetDateTime) -> String {
    let timestamp = format_description::parse("[year][month][day][hour][minute]")
        .ok()
        .and_then(|format| now.format(&format).ok())
        .unwrap_or_else(|| now.unix_timestamp().to_string());
    let base = if dry_run { "dryrun_results" } else { "results" };
    format!("{}_{}.csv", base, timestamp)
}

/// Write `records` to a timestamped file in `output_dir`, creating the
/// directory if needed.
pub fn export_results(
    output_dir: &Path,
    records: &[DeviceRecord],
    dry_run: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(result_file_name(dry_run, OffsetDateTime::now_utc()));
    table::export(&path, records)?;
    Ok(path)
}

/// Process `serials` against Microsoft Graph with the default configuration.
pub fn process_batch(
    serials: &[String],
    connection: &ConnectionInfo,
    dry_run: bool,
) -> Result<Vec<DeviceRecord>> {
    let conf = Conf::default();
    let api = GraphApi::new(&conf)?;
    Batch {
        tokens: &api,
        api: &api,
        observer: &LogObserver,
        options: BatchOptions::new(&conf, dry_run),
    }
    .run(serials, connection)
}

/// Like [`process_batch`], then write the results to `output_dir` and return
/// the file's path.
pub fn process_batch_to_file(
    serials: &[String],
    connection: &ConnectionInfo,
    dry_run: bool,
    output_dir: &Path,
) -> Result<PathBuf> {
    let records = process_batch(serials, connection, dry_run)?;
    export_results(output_dir, &records, dry_run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name() {
        let now = OffsetDateTime::from_unix_timestamp(1_718_447_400).unwrap();
        assert_eq!(result_file_name(false, now), "results_202406151030.csv");
        assert_eq!(result_file_name(true, now), "dryrun_results_202406151030.csv");
    }
}
