pub mod classify;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod flowcell;
pub mod layout;
pub mod progress;
pub mod samples;
pub mod scanner;
pub mod transfer;

pub use config::AppConfig;
pub use engine::{DeliveryEngine, DeliveryRequest};
pub use error::{Error, Result};
pub use flowcell::{Field, FieldValue, FlowcellTable, LaneInfo, Row, SampleInfo};
pub use layout::{LayoutConvention, LayoutOutcome, LayoutTransformer};
pub use progress::{ProgressReporter, SilentReporter};
pub use transfer::{TransferMode, TransferPlan};
