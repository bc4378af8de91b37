/// Instruction trace builder.
pub mod trace;
