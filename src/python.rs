use std::time::Duration;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::control;
use crate::embodiment::EmbodimentRegistry;
use crate::ensemble::{ActionChunk, TemporalActionEnsembler};

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Temporal ensembler usable from a Python control loop.
#[pyclass(name = "TemporalEnsembler")]
struct PyTemporalEnsembler {
    inner: TemporalActionEnsembler,
}

#[pymethods]
impl PyTemporalEnsembler {
    #[new]
    #[pyo3(signature = (chunk_size, exe_steps, coeff = 0.01))]
    fn new(chunk_size: usize, exe_steps: usize, coeff: f64) -> PyResult<Self> {
        let inner = TemporalActionEnsembler::new(coeff, chunk_size, exe_steps).map_err(value_error)?;
        Ok(Self { inner })
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    /// Blends a `[horizon][action_dim]` chunk and returns the next `exe_steps` actions.
    fn update(&mut self, chunk: Vec<Vec<f32>>) -> PyResult<Vec<Vec<f32>>> {
        let chunk = ActionChunk::from_rows(chunk).map_err(value_error)?;
        let blended = self.inner.update(&chunk).map_err(value_error)?;
        Ok(blended.to_rows())
    }

    #[getter]
    fn cursor(&self) -> u64 {
        self.inner.cursor()
    }
}

/// Seconds left to sleep so one control step lasts `1 / control_freq`.
#[pyfunction]
fn pacing_delay(control_freq: f64, elapsed: f64) -> PyResult<f64> {
    if !(control_freq.is_finite() && control_freq > 0.0) {
        return Err(value_error("control_freq must be positive"));
    }
    let period = Duration::try_from_secs_f64(1.0 / control_freq).map_err(value_error)?;
    let elapsed = Duration::try_from_secs_f64(elapsed.max(0.0)).map_err(value_error)?;
    Ok(control::pacing_delay(period, elapsed).as_secs_f64())
}

/// Initial joint pose of a stock embodiment.
#[pyfunction]
fn init_pose(robot_type: &str) -> PyResult<Vec<f32>> {
    let registry = EmbodimentRegistry::builtin().map_err(value_error)?;
    let descriptor = registry.get(robot_type).map_err(value_error)?;
    Ok(descriptor.init_pose().to_vec())
}

/// The name of this function must match the lib.name in Cargo.toml
#[pymodule]
fn rollout(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTemporalEnsembler>()?;
    m.add_function(wrap_pyfunction!(pacing_delay, m)?)?;
    m.add_function(wrap_pyfunction!(init_pose, m)?)?;
    Ok(())
}
