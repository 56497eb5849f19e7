// canbus/src/bin/can-dump.rs
//
// Prints the frames flowing on a CAN bus.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Prints the data flowing on a CAN bus, one line per frame.
//!
//! ```text
//! $ can-dump vcan0
//!   vcan0  1ab 00000000  64 61 74 61 2D 30 30      |DATA-00|
//! ```
//!
//! Use CTRL-C to terminate.

use anyhow::{Context, Result};
use canbus::{CanFrame, CanSocket, Socket};
use clap::{arg, ArgAction, Command};
use itertools::Itertools;
use std::process;

// Make the app version the same as the package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// Prefix for all the error messages.
const PREFIX: &str = "can-dump> ";

// Column of the opening '|' in a canonical hex dump line.
const ASCII_COL: usize = 60;

// --------------------------------------------------------------------------

/// Formats a payload as one canonical hex dump line, in upper case.
///
/// Runs of 24 blanks are squeezed out of the padding between the hex
/// bytes and the character column. An empty payload gives an empty string.
fn hex_dump(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }

    let bytes = data.iter().map(|b| hex::encode_upper([*b])).join(" ");
    let mut hex_part = format!("{:08X}  {} ", 0, bytes);
    if data.len() > 7 {
        hex_part.push(' ');
    }

    let ascii: String = data
        .iter()
        .map(|&b| match b {
            0x20..=0x7E => char::from(b),
            _ => '.',
        })
        .collect();

    format!("{:<width$}|{}|", hex_part, ascii, width = ASCII_COL)
        .to_uppercase()
        .replace(&" ".repeat(24), "")
}

/// One output line: interface, ID in lower-case hex, then the payload dump.
fn dump_line(iface: &str, frame: &CanFrame) -> String {
    format!("{:>7}  {:03x} {}", iface, frame.id(), hex_dump(frame.data()))
}

/// Reads and prints frames until an error occurs.
fn dump(iface: &str) -> Result<()> {
    let sock = CanSocket::open(iface)
        .with_context(|| format!("error binding to [{}]", iface))?;

    loop {
        let frame = sock.read_frame().context("recv error")?;
        println!("{}", dump_line(sock.name(), &frame));
    }
}

fn main() {
    let opts = Command::new("can-dump")
        .version(VERSION)
        .about("Prints data flowing on the CAN bus")
        .disable_help_flag(true)
        .arg(
            arg!(--help "Print help information")
                .short('?')
                .action(ArgAction::Help),
        )
        .arg(
            arg!(<iface> "The CAN interface to use, like 'can0', 'vcan0', etc")
                .required(true)
                .index(1),
        )
        .after_help("Use CTRL-C to terminate can-dump.")
        .get_matches();

    let iface = match opts.get_one::<String>("iface") {
        Some(iface) => iface,
        None => process::exit(2),
    };

    if let Err(err) = dump(iface) {
        eprintln!("{}{:#}", PREFIX, err);
        process::exit(1);
    }
}

// --------------------------------------------------------------------------
