use std::collections::HashSet;
use std::fs::canonicalize;
use std::path::PathBuf;

use clap::Parser;

use crate::cli::args::Args;
use crate::cli::progress::StepContext;
use crate::config::parse_coding_config;
use crate::plan::{execute_plan, generate_plan, ExecutePlanParams, TaskKey};
use crate::verification::trace::parse_trace;
use crate::Result;

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
 _   _ _____ __  __ ___ 
| | | |_   _|  \/  |_ _|
| | | | | | | |\/| || | 
| |_| | | | | |  | || | 
 \___/  |_| |_|  |_|___|

UTMI coding layer generator v0.1
";

pub fn run() -> Result<()> {
    let args = Args::parse();

    let config_path = canonicalize(&args.config)?;

    println!("{BANNER}");

    println!("Reading configuration file...\n");
    let config = parse_coding_config(&config_path)?;

    println!("Configuration file: {:?}", &config_path);
    println!("Coding parameters:");
    println!("\tModule prefix: {}", config.name);
    println!("\tBus width: {}", config.width);
    println!("\tPipelined: {}", config.pipeline);
    let stages = config
        .stages
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("\tStages: {stages}");
    if let Some(length) = config.shift_register {
        println!("\tShift register length: {length}");
    }

    let trace = args.trace.as_ref().map(parse_trace).transpose()?;

    let mut tasks = HashSet::from([TaskKey::GeneratePlan, TaskKey::GenerateVerilog]);
    if trace.is_some() {
        tasks.insert(TaskKey::RunTrace);
    }

    let mut ctx = StepContext::new(&tasks);

    let plan = ctx.check(generate_plan(&config))?;
    ctx.finish(TaskKey::GeneratePlan);

    let work_dir = if let Some(output_dir) = args.output_dir {
        output_dir
    } else {
        PathBuf::from(&plan.name)
    };
    std::fs::create_dir_all(&work_dir)?;
    let work_dir = canonicalize(work_dir)?;

    let res = execute_plan(ExecutePlanParams {
        work_dir: &work_dir,
        plan: &plan,
        tasks: &tasks,
        trace: trace.as_ref(),
        ctx: Some(&mut ctx),
    });

    ctx.check(res)?;
    println!("Artifacts saved to: {:?}\n", &work_dir);

    Ok(())
}
