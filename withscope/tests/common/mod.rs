//! Common test utilities and macros

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;
use withscope::{CellBox, CodeLayout, Frame, Value};

#[derive(Debug)]
pub enum TestResult {
    Success,
    SuccessWithOutput(String),
    OutputRegex(String),
    Error(String),
    ErrorRegex(String),
}

impl PartialEq for TestResult {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TestResult::Success, TestResult::Success) => true,
            (TestResult::Success, TestResult::SuccessWithOutput(_)) => true,
            (TestResult::SuccessWithOutput(_), TestResult::Success) => true,
            (TestResult::SuccessWithOutput(a), TestResult::SuccessWithOutput(b)) => a == b,
            (TestResult::OutputRegex(pattern), TestResult::SuccessWithOutput(out))
            | (TestResult::SuccessWithOutput(out), TestResult::OutputRegex(pattern)) => {
                regex::Regex::new(pattern).unwrap().is_match(out)
            }
            (TestResult::Error(a), TestResult::Error(b)) => a == b,
            (TestResult::ErrorRegex(pattern), TestResult::Error(msg))
            | (TestResult::Error(msg), TestResult::ErrorRegex(pattern)) => {
                regex::Regex::new(pattern).unwrap().is_match(msg)
            }
            _ => false,
        }
    }
}

/// Runs the `withscope` binary with the arguments listed in `input_file`,
/// one per line. Blank lines and lines starting with `#` are skipped.
pub fn run_cli_test(input_file: &Path) -> TestResult {
    let contents = std::fs::read_to_string(input_file)
        .unwrap_or_else(|e| panic!("Cannot read {}: {e}", input_file.display()));
    let args: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let output = Command::new(env!("CARGO_BIN_EXE_withscope"))
        .args(&args)
        .env("WITHSCOPE_LOG", "warn")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run withscope binary");

    if output.status.success() {
        TestResult::SuccessWithOutput(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        TestResult::Error(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

/// Builds a frame of [`Value`]s from `NAME` / `NAME=VALUE` specs per region.
/// Free slots given a value are bound to a new cell.
pub fn build_frame(locals: &[&str], cellvars: &[&str], freevars: &[&str]) -> Frame<Value> {
    fn split(spec: &str) -> (&str, Option<Value>) {
        match spec.split_once('=') {
            Some((name, value)) => (name, Some(value.parse().unwrap())),
            None => (spec, None),
        }
    }
    let locals: Vec<_> = locals.iter().map(|s| split(s)).collect();
    let cellvars: Vec<_> = cellvars.iter().map(|s| split(s)).collect();
    let freevars: Vec<_> = freevars.iter().map(|s| split(s)).collect();

    let mut frame = Frame::new(CodeLayout::new(
        locals.iter().map(|(n, _)| n),
        cellvars.iter().map(|(n, _)| n),
        freevars.iter().map(|(n, _)| n),
    ));
    for (name, value) in locals {
        if let Some(value) = value {
            frame.set_local(name, value).unwrap();
        }
    }
    for (name, value) in cellvars {
        if let Some(value) = value {
            frame.assign(name, value).unwrap();
        }
    }
    for (name, value) in freevars {
        if let Some(value) = value {
            frame.bind_cell(name, CellBox::with_value(value)).unwrap();
        }
    }
    frame
}

/// Observable state of one cell slot: box identity, live handles, contents.
#[derive(Debug, PartialEq)]
pub struct CellState {
    pub address: usize,
    pub holders: usize,
    pub contents: Option<Value>,
}

/// Everything an overlay round trip must preserve.
#[derive(Debug, PartialEq)]
pub struct FrameState {
    pub locals: Vec<(String, Option<Value>)>,
    pub cells: Vec<(String, Option<CellState>)>,
}

pub fn observe(frame: &Frame<Value>) -> FrameState {
    let layout = frame.layout();
    let locals = layout
        .locals()
        .iter()
        .map(|name| (name.clone(), frame.local(name).unwrap().cloned()))
        .collect();
    let cells = layout
        .cellvars()
        .iter()
        .chain(layout.freevars())
        .map(|name| {
            let state = frame.cell(name).unwrap().map(|cell| CellState {
                address: cell.address(),
                holders: cell.holders(),
                contents: cell.get(),
            });
            (name.clone(), state)
        })
        .collect();
    FrameState { locals, cells }
}

#[macro_export]
macro_rules! check_cli {
    ($test_name:ident, input=$input_file:expr, result=$expected:expr) => {
        #[test]
        fn $test_name() {
            let input_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("tests")
                .join("inputs")
                .join($input_file);

            let result = crate::common::run_cli_test(&input_path);
            assert_eq!(result, $expected);
        }
    };
}

#[macro_export]
macro_rules! check_round_trip {
    ($test_name:ident, frame=$frame:expr, overlay=$overlay:expr, mode=$mode:expr) => {
        #[test]
        fn $test_name() {
            let mut frame = $frame;
            let before = crate::common::observe(&frame);

            let record = withscope::apply(&mut frame, $overlay, $mode);
            withscope::revert(&mut frame, record);

            assert_eq!(crate::common::observe(&frame), before);
        }
    };
}
