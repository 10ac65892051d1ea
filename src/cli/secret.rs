// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use anyhow::Context;

use device_remover::{ConnectionInfo, GraphApi, TokenProvider};

use super::Flags;

pub fn run(flags: &Flags) -> anyhow::Result<()> {
    let connection_path = flags.required("connection");
    let conf = super::conf(flags)?;

    let connection = ConnectionInfo::load(connection_path)
        .with_context(|| format!("Failed to load connection file `{}`", connection_path))?;

    let api = GraphApi::new(&conf)?;
    let token = api.token(&connection)?;
    let days = api.secret_days_left(&token, &connection)?;

    if days < 0 {
        println!("Client secret expired {} days ago", -days);
    } else {
        println!("Client secret expires in {} days", days);
    }

    Ok(())
}
