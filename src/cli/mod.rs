// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

mod remove;
mod secret;

use anyhow::Context;
use std::{collections::HashMap, env, path::Path, process};

use device_remover::Conf;

const USAGE: &str = "\
Usage:
  device-remover remove --connection <file.json> --csv <file.csv> --column <columnName> --output <folder> [--dry] [--config <file>]
  device-remover secret --connection <file.json> [--config <file>]";

fn usage() -> ! {
    eprintln!("{}", USAGE);
    process::exit(1)
}

/// `--name value` pairs and bare `--switch`es.
pub struct Flags(HashMap<String, Option<String>>);

impl Flags {
    pub fn parse<I: Iterator<Item = String>>(args: I) -> Option<Self> {
        let mut flags = HashMap::new();
        let mut args = args.peekable();
        while let Some(arg) = args.next() {
            let name = arg.strip_prefix("--")?.to_string();
            let value = if args.peek().map_or(false, |next| !next.starts_with("--")) {
                args.next()
            } else {
                None
            };
            flags.insert(name, value);
        }
        Some(Self(flags))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|x| x.as_deref())
    }

    /// Value of a required flag; prints usage and exits if absent.
    pub fn required(&self, name: &str) -> &str {
        self.value(name).unwrap_or_else(|| {
            eprintln!("device-remover: missing --{}", name);
            usage()
        })
    }

    pub fn switch(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

/// Configuration from `--config`, or the default locations.
fn conf(flags: &Flags) -> anyhow::Result<Conf> {
    match flags.value("config") {
        Some(path) => Conf::load(Some(Path::new(path)))
            .with_context(|| format!("Failed to load config file `{}`", path)),
        None => Ok(Conf::load(None)?),
    }
}

pub fn run() {
    let mut args = env::args().skip(1);
    let cmd = args.next();
    let flags = Flags::parse(args).unwrap_or_else(|| usage());

    let res = match cmd.as_deref() {
        Some("remove") => remove::run(&flags),
        Some("secret") => secret::run(&flags),
        _ => usage(),
    };

    if let Err(err) = res {
        eprintln!("device-remover: {:#}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(args: &[&str]) -> Option<Flags> {
        Flags::parse(args.iter().map(|x| x.to_string()))
    }

    #[test]
    fn values_and_switches() {
        let flags = flags(&["--csv", "serials.csv", "--dry", "--column", "Serial"]).unwrap();
        assert_eq!(flags.value("csv"), Some("serials.csv"));
        assert_eq!(flags.value("column"), Some("Serial"));
        assert!(flags.switch("dry"));
        assert_eq!(flags.value("dry"), None);
        assert!(!flags.switch("output"));
    }

    #[test]
    fn stray_positional() {
        assert!(flags(&["serials.csv"]).is_none());
    }
}
