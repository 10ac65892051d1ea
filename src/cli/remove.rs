// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use anyhow::{bail, Context};
use std::path::Path;

use device_remover::{
    export_results, table, Batch, BatchOptions, ConnectionInfo, GraphApi, LogObserver,
};

use super::Flags;

pub fn run(flags: &Flags) -> anyhow::Result<()> {
    let connection_path = flags.required("connection");
    let csv_path = flags.required("csv");
    let column = flags.required("column");
    let output = Path::new(flags.required("output"));
    let dry_run = flags.switch("dry");
    let conf = super::conf(flags)?;

    let connection = ConnectionInfo::load(connection_path)
        .with_context(|| format!("Failed to load connection file `{}`", connection_path))?;
    let serials = table::load_serials(csv_path, column)
        .with_context(|| format!("Failed to load serial numbers from `{}`", csv_path))?;
    log::info!("Loaded {} serials from {}", serials.len(), csv_path);
    if serials.is_empty() {
        bail!("No results to export.");
    }

    let api = GraphApi::new(&conf)?;
    let batch = Batch {
        tokens: &api,
        api: &api,
        observer: &LogObserver,
        options: BatchOptions::new(&conf, dry_run),
    };
    let records = batch.run(&serials, &connection)?;

    let path = export_results(output, &records, dry_run)?;
    println!("Results saved to: {}", path.display());

    Ok(())
}
