//! Kernel-level errors. These never carry I/O context — the service-level
//! error enum (`src/bin/pricing-service/error.rs`) wraps these plus
//! everything that can go wrong acquiring inputs.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
