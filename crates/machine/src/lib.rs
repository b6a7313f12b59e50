//! Veritrail Machine - generic entity state machine
//!
//! Any entity type that declares a state field, a bounded state set, and a
//! transition table gets validated transitions through this crate. The
//! declaration is deploy-time configuration; nothing here is runtime-mutable.
//!
//! Validation is pure - persistence, hooks, and audit writes are composed
//! around it by the engine crate.

pub mod config;
pub mod error;
pub mod machine;
pub mod registry;

pub use config::{StateConfig, StateConfigBuilder, TransitionDef};
pub use error::MachineError;
pub use machine::{AvailableTransition, StateMachine, TransitionPlan};
pub use registry::StateConfigRegistry;
