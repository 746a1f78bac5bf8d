//! Arcade Core - self-healing generation workflow
//!
//! The orchestrator that:
//! - Requests an artifact for a topic from a Generator
//! - Validates it headless in the sandbox
//! - Feeds failures to a Fixer within a bounded retry budget
//! - Records every step in a hash-chained log trail
//!
//! # Example
//!
//! ```rust,ignore
//! use arcade_core::{Orchestrator, ScriptedAgent, WorkflowConfig};
//! use arcade_sandbox::Validator;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let agent = Arc::new(ScriptedAgent::from_file("replay.json").await?);
//! let mut orchestrator = Orchestrator::new(
//!     agent.clone(),
//!     agent,
//!     Arc::new(Validator::default()),
//!     WorkflowConfig::default(),
//! );
//!
//! let artifact = orchestrator.run("asteroid dodger").await?;
//! println!("Deployed {}", artifact.title());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod agents;
pub mod config;
pub mod error;
pub mod log;
pub mod orchestrator;
pub mod ports;
pub mod repository;
pub mod state_machine;
pub mod types;

// Re-exports for convenience
pub use agents::{RecordedResponse, ScriptedAgent};
pub use config::ArcadeConfig;
pub use error::{ConfigError, LogError, RepositoryError, UpstreamError, WorkflowError};
pub use log::{LogEntry, LogTrail};
pub use orchestrator::{Orchestrator, RetryBudget};
pub use ports::{Fixer, Generator, PersistedArtifact, Repository};
pub use repository::{InMemoryRepository, JsonFileRepository};
pub use state_machine::{allowed_transitions, validate_transition};
pub use types::{AgentTag, ArtifactId, WorkflowConfig, WorkflowState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
