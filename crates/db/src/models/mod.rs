//! Row models and request DTOs.

pub mod audit_log;
pub mod host;
pub mod job_definition;
pub mod run;
pub mod script;
pub mod vault;

pub use audit_log::AuditActor;
pub use host::Host;
pub use job_definition::{JobDefinition, VariableField};
pub use run::{Run, RunListQuery, SubmitRun};
pub use script::Script;
pub use vault::Vault;
