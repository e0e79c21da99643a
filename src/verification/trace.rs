use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use itertools::izip;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::blocks::nrzi::parallel::ParallelInput;
use crate::blocks::nrzi::{Stage, StageKind, StageParams};
use crate::blocks::Clocked;
use crate::error::CodingError;
use crate::paths::{out_rpt, out_trace};
use crate::verification::bit_signal::BitSignal;
use crate::word_mask;

/// A cycle-by-cycle stimulus for one coding stage.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub stage: StageKind,
    pub cycles: Vec<TraceCycle>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TraceCycle {
    pub din: u64,
    #[serde(default)]
    pub idle: bool,
    #[serde(default)]
    pub bypass: bool,
    #[serde(default = "default_valid")]
    pub din_valid: bool,
    /// Expected `dout` during this cycle, if checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<u64>,
}

fn default_valid() -> bool {
    true
}

impl TraceCycle {
    pub fn input(&self) -> ParallelInput {
        ParallelInput {
            din: self.din,
            din_valid: self.din_valid,
            idle: self.idle,
            bypass: self.bypass,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    pub cycle: usize,
    pub dout: u64,
    pub dout_valid: bool,
    /// Carry after the clock edge ending this cycle.
    pub carry: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Mismatch {
    pub cycle: usize,
    pub expected: u64,
    pub actual: u64,
}

pub fn parse_trace(path: impl AsRef<Path>) -> Result<Trace> {
    let contents = std::fs::read_to_string(path)?;
    let trace = serde_json::from_str(&contents)?;
    Ok(trace)
}

/// Runs `trace` through a freshly reset stage built from `params`.
pub fn run_trace(params: &StageParams, trace: &Trace) -> Vec<TraceResult> {
    let mut stage = Stage::new(params);
    debug!(
        "simulating {} for {} cycles",
        stage.kind(),
        trace.cycles.len()
    );
    trace
        .cycles
        .iter()
        .enumerate()
        .map(|(cycle, c)| {
            let out = stage.step(c.input());
            TraceResult {
                cycle,
                dout: out.dout,
                dout_valid: out.dout_valid,
                carry: stage.carry(),
            }
        })
        .collect()
}

/// Compares results against the `expect` values of the trace.
pub fn check_trace(params: &StageParams, trace: &Trace, results: &[TraceResult]) -> Vec<Mismatch> {
    let mask = word_mask(params.width());
    izip!(trace.cycles.iter(), results.iter())
        .filter_map(|(c, r)| {
            let expected = c.expect? & mask;
            (expected != r.dout).then_some(Mismatch {
                cycle: r.cycle,
                expected,
                actual: r.dout,
            })
        })
        .collect()
}

pub fn write_trace_rpt(
    path: impl AsRef<Path>,
    params: &StageParams,
    trace: &Trace,
    mismatches: &[Mismatch],
) -> Result<()> {
    let mut rpt = File::create(path)?;
    let width = params.width();
    let checked = trace.cycles.iter().filter(|c| c.expect.is_some()).count();

    writeln!(rpt, "TRACE")?;
    writeln!(rpt, "==========================")?;
    writeln!(rpt, "stage: {}", params.kind())?;
    writeln!(rpt, "width: {width}")?;
    writeln!(rpt, "pipeline: {}", params.pipeline())?;
    writeln!(rpt, "cycles: {}", trace.cycles.len())?;
    writeln!(rpt, "checked: {checked}")?;
    writeln!(rpt)?;

    for m in mismatches {
        writeln!(
            rpt,
            "ERROR: cycle {}: expected dout {}, got {}",
            m.cycle,
            BitSignal::from_u64(m.expected, width),
            BitSignal::from_u64(m.actual, width),
        )?;
    }
    if mismatches.is_empty() {
        writeln!(rpt, "PASS")?;
    } else {
        writeln!(rpt, "FAIL: {} mismatches", mismatches.len())?;
    }

    Ok(())
}

/// Runs a trace, saving the results and a report to `work_dir`.
///
/// Fails if any checked cycle does not match.
pub fn verify_trace(
    work_dir: impl AsRef<Path>,
    name: &str,
    params: &StageParams,
    trace: &Trace,
) -> Result<Vec<TraceResult>> {
    if trace.stage != params.kind() {
        return Err(CodingError::StageNotPlanned(trace.stage).into());
    }
    let work_dir = work_dir.as_ref();
    std::fs::create_dir_all(work_dir)?;

    info!("running {} cycles through {name}", trace.cycles.len());
    let results = run_trace(params, trace);
    std::fs::write(
        out_trace(work_dir, name),
        serde_json::to_string_pretty(&results)?,
    )?;

    let mismatches = check_trace(params, trace, &results);
    for m in mismatches.iter() {
        debug!(
            "cycle {}: expected {:#x}, got {:#x}",
            m.cycle, m.expected, m.actual
        );
    }
    write_trace_rpt(out_rpt(work_dir, name), params, trace, &mismatches)?;

    if !mismatches.is_empty() {
        warn!("{name}: {} trace mismatches", mismatches.len());
        return Err(CodingError::TraceMismatch {
            mismatches: mismatches.len(),
            cycles: trace.cycles.len(),
        }
        .into());
    }
    Ok(results)
}
