//! AST to TAC lowering.
//!
//! A postorder walk over the checked tree: each expression yields the
//! location holding its value, each statement appends instructions to the
//! stream.  The walk threads its context (current class, receiver, enclosing
//! loop) through [`LoweringContext`] instead of climbing parent links.

pub mod context;
mod expr;
mod stmt;

pub use context::{BuiltIn, LoweringContext, ERR_ARRAY_BOUNDS, ERR_ARRAY_SIZE};
pub use expr::Place;

use log::debug;

use crate::ast::Program;
use crate::tac::{Instr, TacProgram};
use crate::CompileError;

/// Lower a checked program to three-address code.
///
/// Classes come first (methods, then the class's vtable record), followed by
/// the top-level functions; globals produce no code, only locations.
pub fn lower(program: &Program) -> Result<TacProgram, CompileError> {
    let mut cx = LoweringContext::new(program);

    for (id, class) in program.classes.iter().enumerate() {
        for method in &class.methods {
            cx.lower_function(Some(id), method)?;
        }
        let vtable = cx.layouts.layout(id).vtable.clone();
        cx.emit(Instr::VTable {
            class: class.name.clone(),
            methods: vtable,
        });
    }
    for function in &program.functions {
        cx.lower_function(None, function)?;
    }

    let tac = cx.finish();
    debug!(
        "lowered {} instruction(s), {} location(s), {} function(s)",
        tac.instrs.len(),
        tac.locations.len(),
        tac.functions.len()
    );
    Ok(tac)
}
