//! Static-method repositories, one per table.

pub mod audit_repo;
pub mod host_repo;
pub mod job_definition_repo;
pub mod run_repo;
pub mod script_repo;
pub mod vault_repo;

pub use audit_repo::AuditRepo;
pub use host_repo::HostRepo;
pub use job_definition_repo::JobDefinitionRepo;
pub use run_repo::RunRepo;
pub use script_repo::ScriptRepo;
pub use vault_repo::VaultRepo;
