//! Command line parsing for the `withscope` binary.

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use withscope::{CellBox, CellMode, CodeLayout, Frame, Overlay, Replacement, Value};

/// Applies an overlay to a frame built from the command line, then reverts
/// it, printing the frame at each step.
#[derive(Parser, Debug)]
#[command(name = "withscope", version, about)]
pub struct Args {
    /// Local slot, optionally bound: NAME or NAME=VALUE
    #[arg(long = "local", value_name = "NAME[=VALUE]")]
    pub locals: Vec<String>,

    /// Cell-bound slot, optionally holding a value: NAME or NAME=VALUE
    #[arg(long = "cell", value_name = "NAME[=VALUE]")]
    pub cells: Vec<String>,

    /// Free slot; with a value it is bound to a new cell: NAME or NAME=VALUE
    #[arg(long = "free", value_name = "NAME[=VALUE]")]
    pub free: Vec<String>,

    /// Overlay entry: NAME=VALUE, NAME=clear or NAME=cell:VALUE
    #[arg(long = "set", value_name = "ENTRY")]
    pub overlay: Vec<String>,

    /// Unwrap cell entries into local slots instead of skipping them
    #[arg(long)]
    pub unwrap: bool,
}

impl Args {
    pub fn mode(&self) -> CellMode {
        if self.unwrap {
            CellMode::Unwrap
        } else {
            CellMode::Swap
        }
    }

    /// Builds the frame described by `--local`, `--cell` and `--free`.
    pub fn frame(&self) -> Result<Frame<Value>> {
        let locals = parse_slots(&self.locals)?;
        let cells = parse_slots(&self.cells)?;
        let free = parse_slots(&self.free)?;

        let mut names: Vec<&str> = locals
            .iter()
            .chain(&cells)
            .chain(&free)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            bail!("Slot '{}' declared twice", pair[0]);
        }

        let layout = CodeLayout::new(
            locals.iter().map(|(name, _)| name),
            cells.iter().map(|(name, _)| name),
            free.iter().map(|(name, _)| name),
        );
        let mut frame = Frame::new(layout);

        for (name, value) in locals {
            if let Some(value) = value {
                frame.set_local(&name, value)?;
            }
        }
        for (name, value) in cells {
            if let Some(value) = value {
                frame.assign(&name, value)?;
            }
        }
        for (name, value) in free {
            if let Some(value) = value {
                frame.bind_cell(&name, CellBox::with_value(value))?;
            }
        }
        Ok(frame)
    }

    /// Builds the overlay described by `--set`.
    pub fn overlay(&self) -> Result<Overlay<Value>> {
        self.overlay.iter().map(|entry| parse_entry(entry)).collect()
    }
}

fn parse_slots(specs: &[String]) -> Result<Vec<(String, Option<Value>)>> {
    specs.iter().map(|spec| parse_slot(spec)).collect()
}

/// Parses `NAME` or `NAME=VALUE`.
pub fn parse_slot(spec: &str) -> Result<(String, Option<Value>)> {
    match spec.split_once('=') {
        Some((name, value)) => Ok((parse_name(name)?, Some(value.parse()?))),
        None => Ok((parse_name(spec)?, None)),
    }
}

/// Parses `NAME=VALUE`, `NAME=clear` or `NAME=cell:VALUE`.
pub fn parse_entry(entry: &str) -> Result<(String, Replacement<Value>)> {
    let (name, rest) = entry
        .split_once('=')
        .ok_or_else(|| anyhow!("Overlay entry '{}' is missing '='", entry))?;
    let name = parse_name(name)?;
    let replacement = if rest == "clear" {
        Replacement::Clear
    } else if let Some(value) = rest.strip_prefix("cell:") {
        Replacement::Cell(CellBox::with_value(value.parse()?))
    } else {
        Replacement::Value(rest.parse()?)
    };
    Ok((name, replacement))
}

fn parse_name(name: &str) -> Result<String> {
    let name = name.trim();
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !valid {
        bail!("Invalid variable name '{}'", name);
    }
    Ok(name.to_string())
}
