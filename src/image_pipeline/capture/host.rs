//! Host-side readings recorded alongside each frame: CPU temperature and the
//! state of both defective pixel correction stages.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::image_pipeline::common::error::{ConversionError, Result};

pub const SENSOR_DPC_PARAM: &str = "/sys/module/imx477/parameters/dpc_enable";
pub const TUNING_FILE_ENV: &str = "LIBCAMERA_RPI_TUNING_FILE";

const CPU_THERMAL_POINTER: &str = "/cpu_thermal-virtual-0/temp1/temp1_input";
const DPC_ALGORITHM: &str = "rpi.dpc";

/// Where to look for host readings.
#[derive(Debug, Clone)]
pub struct HostPaths {
    pub sensor_dpc_param: PathBuf,
    pub tuning_file: Option<PathBuf>,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            sensor_dpc_param: PathBuf::from(SENSOR_DPC_PARAM),
            tuning_file: std::env::var_os(TUNING_FILE_ENV).map(PathBuf::from),
        }
    }
}

/// Snapshot of host readings. A reading that could not be taken is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostStatus {
    /// Degrees Celsius
    pub cpu_temperature: Option<f64>,
    /// IMX477 on-sensor correction
    pub sensor_dpc: Option<bool>,
    /// libcamera pipeline correction
    pub pipeline_dpc: Option<bool>,
}

impl HostStatus {
    pub fn probe(paths: &HostPaths) -> Self {
        let cpu_temperature = read_cpu_temperature()
            .inspect_err(|e| warn!("CPU temperature unavailable: {e}"))
            .ok();
        let sensor_dpc = read_sensor_dpc(&paths.sensor_dpc_param)
            .inspect_err(|e| warn!("On-sensor DPC state unavailable: {e}"))
            .ok();
        let pipeline_dpc = match &paths.tuning_file {
            Some(path) => read_pipeline_dpc(path)
                .inspect_err(|e| warn!("Pipeline DPC state unavailable: {e}"))
                .ok(),
            None => {
                warn!("{TUNING_FILE_ENV} is not set, pipeline DPC state unknown");
                None
            }
        };

        let status = Self {
            cpu_temperature,
            sensor_dpc,
            pipeline_dpc,
        };
        debug!(?status, "Host status probed");
        status
    }
}

/// Extracts the SoC temperature from `sensors -j` output.
pub fn parse_cpu_temperature(sensors_json: &str) -> Result<f64> {
    let sensors: Value = serde_json::from_str(sensors_json)?;
    sensors
        .pointer(CPU_THERMAL_POINTER)
        .and_then(Value::as_f64)
        .ok_or_else(|| ConversionError::CaptureError("no cpu_thermal reading in sensors output".to_string()))
}

pub fn read_cpu_temperature() -> Result<f64> {
    let output = Command::new("sensors")
        .arg("-j")
        .output()
        .map_err(|e| ConversionError::CaptureError(format!("failed to run sensors: {e}")))?;
    if !output.status.success() {
        return Err(ConversionError::CaptureError(format!(
            "sensors exited with {}",
            output.status
        )));
    }
    parse_cpu_temperature(&String::from_utf8_lossy(&output.stdout))
}

pub fn parse_dpc_flag(status: &str) -> Result<bool> {
    match status.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(ConversionError::CaptureError(format!(
            "unrecognized DPC status {other:?}"
        ))),
    }
}

pub fn read_sensor_dpc(param: &Path) -> Result<bool> {
    let status = std::fs::read_to_string(param)
        .map_err(|e| ConversionError::CaptureError(format!("{}: {e}", param.display())))?;
    parse_dpc_flag(&status)
}

fn dpc_entry(tuning: &Value) -> Option<&Value> {
    tuning
        .get("algorithms")?
        .as_array()?
        .iter()
        .find_map(|algorithm| algorithm.get(DPC_ALGORITHM))
}

/// Whether a tuning document enables `rpi.dpc`. A missing strength means
/// libcamera's default of 1.
pub fn pipeline_dpc_enabled(tuning: &Value) -> Result<bool> {
    let entry = dpc_entry(tuning)
        .ok_or_else(|| ConversionError::CaptureError(format!("tuning has no {DPC_ALGORITHM} algorithm")))?;
    let strength = entry.get("strength").and_then(Value::as_i64).unwrap_or(1);
    Ok(strength != 0)
}

pub fn read_pipeline_dpc(tuning_file: &Path) -> Result<bool> {
    let text = std::fs::read_to_string(tuning_file)
        .map_err(|e| ConversionError::CaptureError(format!("{}: {e}", tuning_file.display())))?;
    pipeline_dpc_enabled(&serde_json::from_str(&text)?)
}

/// Sets the `rpi.dpc` strength in a tuning document.
pub fn set_pipeline_dpc(tuning: &mut Value, enabled: bool) -> Result<()> {
    let algorithms = tuning
        .get_mut("algorithms")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| ConversionError::CaptureError("tuning has no algorithms list".to_string()))?;
    let entry = algorithms
        .iter_mut()
        .find_map(|algorithm| algorithm.get_mut(DPC_ALGORITHM))
        .ok_or_else(|| ConversionError::CaptureError(format!("tuning has no {DPC_ALGORITHM} algorithm")))?;
    *entry = json!({ "strength": i64::from(enabled) });
    Ok(())
}

/// Rewrites a tuning file with the given `rpi.dpc` state.
pub fn write_pipeline_dpc(tuning_file: &Path, enabled: bool) -> Result<()> {
    let text = std::fs::read_to_string(tuning_file)
        .map_err(|e| ConversionError::CaptureError(format!("{}: {e}", tuning_file.display())))?;
    let mut tuning: Value = serde_json::from_str(&text)?;
    set_pipeline_dpc(&mut tuning, enabled)?;
    std::fs::write(tuning_file, serde_json::to_string_pretty(&tuning)?).map_err(|e| {
        ConversionError::OutputWriteError(format!("{}: {e}", tuning_file.display()))
    })?;
    debug!(path = %tuning_file.display(), enabled, "Tuning file updated");
    Ok(())
}
