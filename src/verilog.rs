use std::path::Path;

use crate::blocks::nrzi::{StageKind, StageParams};
use crate::error::CodingError;
use crate::{Result, TEMPLATES};

use serde::{Deserialize, Serialize};
use tera::Context;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct NrziParams {
    pub module_name: String,
    pub width: usize,
    pub pipeline: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShiftRegisterParams {
    pub module_name: String,
    pub length: usize,
}

fn nrzi_template(kind: StageKind) -> &'static str {
    match kind {
        StageKind::SerialDecoder => "ser_nrzi_dec.v",
        StageKind::SerialEncoder => "ser_nrzi_enc.v",
        StageKind::ParallelDecoder => "par_nrzi_dec.v",
        StageKind::ParallelEncoder => "par_nrzi_enc.v",
    }
}

pub fn generate_nrzi_verilog(name: impl Into<String>, params: &StageParams) -> Result<String> {
    params.validate()?;

    let template_params = NrziParams {
        module_name: name.into(),
        width: params.width(),
        pipeline: params.pipeline(),
    };

    Ok(TEMPLATES.render(
        nrzi_template(params.kind()),
        &Context::from_serialize(template_params)?,
    )?)
}

pub fn save_nrzi_verilog(
    path: impl AsRef<Path>,
    name: impl Into<String>,
    params: &StageParams,
) -> Result<()> {
    let verilog = generate_nrzi_verilog(name, params)?;

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, verilog)?;

    Ok(())
}

pub fn generate_shift_register_verilog(params: &ShiftRegisterParams) -> Result<String> {
    if params.length == 0 {
        return Err(CodingError::EmptyShiftRegister.into());
    }
    let template = "shift_register.v";

    Ok(TEMPLATES.render(template, &Context::from_serialize(params)?)?)
}

pub fn save_shift_register_verilog(
    path: impl AsRef<Path>,
    params: &ShiftRegisterParams,
) -> Result<()> {
    let verilog = generate_shift_register_verilog(params)?;

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, verilog)?;

    Ok(())
}
