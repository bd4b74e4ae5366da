pub mod agent;
pub mod capture;
pub mod collectors;
pub mod config;
pub mod gateway;
pub mod host;
pub mod kernel;

// Re-export specific items for convenient access
pub use agent::Agent;
pub use gateway::Gateway;
pub use kernel::lifecycle::LifecycleCoordinator;
pub use kernel::session::SessionReconstructor;
