/// Memory system doubles.
pub mod memory;
