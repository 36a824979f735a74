// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Outbound CLI entry point.

fn main() {
    if let Err(e) = outbound_cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
