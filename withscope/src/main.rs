//! WithScope CLI
//!
//! Builds a frame from command line bindings, applies an overlay to it and
//! reverts it again, printing the frame at every step. Useful to see how
//! each kind of overlay entry lands in each kind of slot.

mod cli;

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use withscope::{apply, get_cells, revert};

fn main() -> ExitCode {
    let log_level = std::env::var("WITHSCOPE_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &cli::Args) -> anyhow::Result<()> {
    let mut frame = args.frame()?;
    let overlay = args.overlay()?;
    info!(
        "Applying overlay with {} entries in {:?} mode",
        overlay.len(),
        args.mode()
    );

    let cells_before = get_cells(&frame);
    println!("before:   {frame}");

    let record = apply(&mut frame, overlay, args.mode());
    println!("applied:  {frame}");
    println!("record:   {record}");

    revert(&mut frame, record);
    println!("reverted: {frame}");

    let cells_after = get_cells(&frame);
    let identical = cells_before
        .iter()
        .zip(&cells_after)
        .all(|(before, after)| match (before, after) {
            (Some(before), Some(after)) => before.same_cell(after),
            (None, None) => true,
            _ => false,
        });
    println!("cells restored: {}", if identical { "yes" } else { "no" });
    Ok(())
}
