//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs` — Rich domain types (validated, chart-ready)
//! - `wire.rs` — Raw serde structs matching feed payloads
//! - `convert.rs` — `TryFrom` conversions with validation
//! - `state.rs` — State containers with update methods (for WS-driven data)

pub mod portfolio;
