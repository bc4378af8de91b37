/// Fluent trace builders.
pub mod builder;
/// Simulator wrapper with per-cycle recording.
pub mod harness;
/// Memory system doubles.
pub mod mocks;
