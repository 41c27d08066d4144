//! Workspace placeholder crate.
//!
//! Host applications depend on `alc-workspace` and pick feature flags here
//! instead of wiring the individual workspace crates. Each flag forwards to
//! the matching `core-service` feature, which pulls in the rest of the stack.
