//! Mock implementations of the reader capability.
//!
//! Used by the session tests and the CLI to exercise the full lifecycle
//! without a physical reader.

pub mod capability;
pub mod reader;

pub use capability::{MockCapability, MockCapabilityHandle};
pub use reader::{MockOperation, MockReader};
