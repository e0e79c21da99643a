use std::collections::HashSet;
use std::path::Path;

use anyhow::bail;
use log::{debug, info};

use crate::blocks::nrzi::{StageKind, StageParams};
use crate::cli::progress::StepContext;
use crate::config::CodingConfig;
use crate::error::CodingError;
use crate::paths::out_verilog;
use crate::verification::trace::{verify_trace, Trace};
use crate::verilog::{save_nrzi_verilog, save_shift_register_verilog, ShiftRegisterParams};
use crate::Result;

/// A concrete plan for a coding layer.
///
/// Has a 1-1 mapping with the set of generated modules.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CodingPlan {
    pub name: String,
    pub stages: Vec<StageParams>,
    pub shift_register: Option<ShiftRegisterParams>,
}

impl CodingPlan {
    pub fn stage(&self, kind: StageKind) -> Option<&StageParams> {
        self.stages.iter().find(|s| s.kind() == kind)
    }

    pub fn stage_name(&self, params: &StageParams) -> arcstr::ArcStr {
        params.name(&self.name)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TaskKey {
    GeneratePlan,
    GenerateVerilog,
    RunTrace,
}

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a CodingPlan,
    pub tasks: &'a HashSet<TaskKey>,
    pub trace: Option<&'a Trace>,
    pub ctx: Option<&'a mut StepContext>,
}

/// Matches `[A-Za-z_][A-Za-z0-9_]*`.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn generate_plan(config: &CodingConfig) -> Result<CodingPlan> {
    let CodingConfig {
        name,
        width,
        pipeline,
        stages,
        shift_register,
    } = config;

    if !is_identifier(name) {
        bail!(CodingError::InvalidName(name.clone()));
    }
    if stages.is_empty() {
        bail!(CodingError::NoStages);
    }

    let mut seen = HashSet::new();
    let stages = stages
        .iter()
        .filter(|kind| seen.insert(**kind))
        .map(|&kind| -> Result<StageParams> {
            let params = StageParams::new(kind, *width, *pipeline);
            params.validate()?;
            Ok(params)
        })
        .collect::<Result<Vec<_>>>()?;

    let shift_register = match *shift_register {
        Some(0) => bail!(CodingError::EmptyShiftRegister),
        Some(length) => Some(ShiftRegisterParams {
            module_name: format!("{name}_sr{length}"),
            length,
        }),
        None => None,
    };

    Ok(CodingPlan {
        name: name.clone(),
        stages,
        shift_register,
    })
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

pub fn execute_plan(params: ExecutePlanParams) -> Result<()> {
    let ExecutePlanParams {
        work_dir,
        plan,
        tasks,
        trace,
        mut ctx,
    } = params;

    std::fs::create_dir_all(work_dir)?;

    for stage in plan.stages.iter() {
        let name = plan.stage_name(stage);
        let verilog_path = out_verilog(work_dir, &name);
        debug!("writing {} to {:?}", stage.kind(), &verilog_path);
        save_nrzi_verilog(&verilog_path, name.as_str(), stage)?;
    }
    if let Some(sr) = plan.shift_register.as_ref() {
        save_shift_register_verilog(out_verilog(work_dir, &sr.module_name), sr)?;
    }
    info!("generated Verilog for {} modules", plan.stages.len());
    try_finish_task!(ctx, TaskKey::GenerateVerilog);

    if tasks.contains(&TaskKey::RunTrace) {
        let Some(trace) = trace else {
            bail!("No trace was provided");
        };
        let stage = plan
            .stage(trace.stage)
            .ok_or(CodingError::StageNotPlanned(trace.stage))?;
        let name = plan.stage_name(stage);
        verify_trace(work_dir, &name, stage, trace)?;
        try_finish_task!(ctx, TaskKey::RunTrace);
    }

    Ok(())
}
