pub mod event;
pub mod fingerprint;
pub mod phase;
pub mod result;
pub mod state;

pub use event::{EventResult, EventType, ValidationEvent};
pub use fingerprint::{EnvironmentFingerprint, NOT_INSTALLED, VERSION_UNKNOWN};
pub use phase::{CheckResult, Phase, PhaseResult, PhaseStatus, TestOutcome, TestRecord};
pub use result::{SystemMetadata, ValidationResult};
pub use state::{ValidationState, ValidationStatus};
