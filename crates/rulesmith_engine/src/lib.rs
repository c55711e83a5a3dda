//! Rulesmith engine: remote tool transport and batch conversion pipeline.
mod convert;
mod filename;
mod input;
mod persist;
mod registry;
mod scheduler;
mod transport;

pub use convert::{ConvertError, RuleConverter, DETECTION_TOOL, RESPONSE_TOOL};
pub use filename::artifact_filename;
pub use input::{enumerate_rule_files, InputError};
pub use persist::{ensure_output_dir, OutputSink, PersistError, REPORT_FILENAME};
pub use registry::{DiscoveryError, ToolDescriptor, ToolRegistry};
pub use scheduler::{BatchEvent, BatchScheduler, CancelFlag, NullProgressSink, ProgressSink};
pub use transport::{
    mask_key, ConnectionParams, HttpTransport, ToolTransport, TransportError, TransportSettings,
};
