// canbus/src/bin/can-send.rs
//
// Sends a single frame on the CAN bus.
//
// This file is part of the Rust 'canbus' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Sends a single frame on the CAN bus.
//!
//! The frame is given as `<ID-hex>#<frame data-hex>`, like:
//!
//! ```text
//! $ can-send vcan0 f12#1122334455667788
//! $ can-send vcan0 ffa#deadbeef
//! $ can-send vcan0 1F334455#R
//! ```

use anyhow::{Context, Result};
use canbus::{CanFrame, CanSocket, Socket};
use clap::{arg, ArgAction, Command};
use std::process;

// Make the app version the same as the package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// Prefix for all the error messages.
const PREFIX: &str = "can-send> ";

// --------------------------------------------------------------------------

/// Opens the interface and puts the frame on the bus.
fn send(iface: &str, frame: &CanFrame) -> Result<()> {
    let sock = CanSocket::open(iface)
        .with_context(|| format!("error binding CAN bus socket to [{}]", iface))?;

    sock.write_frame(frame).context("error sending data")?;
    sock.close().context("error closing CAN bus socket")?;
    Ok(())
}

fn main() {
    let opts = Command::new("can-send")
        .version(VERSION)
        .about("Sends data on the CAN bus")
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
        .arg(
            arg!(<frame> "The frame to send, as <ID-hex>#<frame data-hex>")
                .required(true)
                .index(2),
        )
        .after_help(
            "Examples:\n    can-send vcan0 f12#1122334455667788\n    can-send vcan0 ffa#deadbeef",
        )
        .get_matches();

    // Both are required, so clap has already rejected a missing one.
    let (iface, frame_str) = match (
        opts.get_one::<String>("iface"),
        opts.get_one::<String>("frame"),
    ) {
        (Some(iface), Some(frame)) => (iface, frame),
        _ => process::exit(2),
    };

    let frame: CanFrame = match frame_str.parse() {
        Ok(frame) => frame,
        Err(err) => {
            eprintln!("{}invalid CAN frame {:?}: {}", PREFIX, frame_str, err);
            process::exit(1);
        }
    };

    if let Err(err) = send(iface, &frame) {
        eprintln!("{}{:#}", PREFIX, err);
        process::exit(1);
    }
}
