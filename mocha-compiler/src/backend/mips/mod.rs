//! MIPS-style target layer.
//!
//! - `abi`     — register names, the allocatable set and ABI roles
//! - `item`    — structured assembly output
//! - `emitter` — per-instruction translation templates

pub mod abi;
pub mod emitter;
pub mod item;

pub use abi::{Reg, GP_REGS, NUM_GP_REGS};
pub use emitter::Emitter;
