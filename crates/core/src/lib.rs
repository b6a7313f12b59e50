//! Veritrail Core - Domain types
//!
//! This crate contains the fundamental types used across Veritrail:
//! - `Money`: exact minor-unit money with a derived 2dp decimal form
//! - `MoneyField` / `MoneyMap`: reconciliation for monetary entity fields
//! - `ActorRef`: acting principal (authenticated, or the `System` sentinel)
//! - `EntityRef`: opaque reference to a stateful entity

pub mod actor;
pub mod entity;
pub mod money;

pub use actor::{ActorKind, ActorRef};
pub use entity::EntityRef;
pub use money::{Money, MoneyError, MoneyField, MoneyMap};
