pub mod ad_config;
pub mod basic_builder;
pub mod builder;
pub mod config;
pub mod openrtb;
pub mod targeting;

pub use basic_builder::BasicParameterBuilder;
pub use builder::{BuildError, BuilderChain, DiagnosticKind, ParameterBuilder};
