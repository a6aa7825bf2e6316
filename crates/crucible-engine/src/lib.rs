//! # crucible-engine
//!
//! The sandboxed execution engine behind the Crucible service.
//!
//! A submission flows through a fixed pipeline: catalog lookup, static
//! screening, admission (per-client rate limit, then the global concurrency
//! cap), sandbox provisioning, and supervision. The engine owns every
//! sandbox it creates and tears it down on every exit path.
//!
//! Two execution backends exist behind one seam: [`DockerBackend`] runs the
//! workload in a locked-down container; [`FallbackBackend`] synthesizes
//! deterministic output for development machines without a container
//! runtime. The choice is made once at startup.

pub mod admission;
pub mod catalog;
pub mod docker;
pub mod executor;
pub mod fallback;
pub mod sandbox;
pub mod screen;

pub use admission::AdmissionGate;
pub use catalog::LanguageSpec;
pub use docker::DockerBackend;
pub use executor::{Engine, ExecutionBackend};
pub use fallback::{FallbackBackend, FALLBACK_NOTICE};
