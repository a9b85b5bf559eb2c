//! Error types for the telemetry core.

use nvml_wrapper::error::NvmlError;
use thiserror::Error;

/// Errors that prevent a snapshot from being built at all.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("GPU driver library failed to initialize: {0}")]
    DriverInit(#[from] NvmlError),
    #[error("GPU driver has been shut down")]
    DriverShutDown,
    #[error("GPU driver shutdown failed: {0}")]
    Shutdown(#[source] NvmlError),
    #[error("failed to enumerate GPU devices: {0}")]
    Enumeration(#[source] DeviceError),
}

/// A single counter read on one device failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device/driver combination does not expose this sensor.
    #[error("sensor not supported")]
    NotSupported,
    #[error("driver error: {0}")]
    Driver(String),
}

impl From<NvmlError> for DeviceError {
    fn from(err: NvmlError) -> Self {
        match err {
            NvmlError::NotSupported => DeviceError::NotSupported,
            other => DeviceError::Driver(other.to_string()),
        }
    }
}

/// Why a GPU-holding process could not be turned into a full record.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichError {
    /// The pid exited between the driver's process list and the OS lookup.
    #[error("process {0} not found")]
    NotFound(u32),
    #[error("permission denied inspecting process {0}")]
    PermissionDenied(u32),
}

impl EnrichError {
    /// Maps an I/O error from reading the process table entry of `pid`.
    pub fn from_io(pid: u32, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => EnrichError::PermissionDenied(pid),
            _ => EnrichError::NotFound(pid),
        }
    }
}
