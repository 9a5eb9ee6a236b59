//! Back end for the Mocha language.
//!
//! Input is a checked AST (see [`ast`]): every identifier resolved, every
//! type attached.  The pipeline lowers it to three-address code, analyses
//! each function (control flow, liveness), colors an interference graph for
//! the general-purpose register set and emits MIPS-style assembly, or the
//! TAC itself in debug mode.

pub mod ast;
pub mod backend;
pub mod layout;
pub mod lower;
pub mod tac;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    /// A construct the checker admits but this back end deliberately does
    /// not emit code for.
    #[error("unsupported construct reached code generation: {0}")]
    Unsupported(&'static str),
}

/// What [`compile`] should print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// Textual three-address code, for debugging.
    Tac,
    /// Target assembly (the default).
    Asm,
}

pub fn compile(program: &ast::Program, mode: EmitMode) -> Result<String, CompileError> {
    let tac = lower::lower(program)?;
    Ok(match mode {
        EmitMode::Tac => tac.to_text(),
        EmitMode::Asm => backend::emit_assembly(&tac),
    })
}

/// Compile a checked program to textual TAC.
pub fn compile_to_tac(program: &ast::Program) -> Result<String, CompileError> {
    compile(program, EmitMode::Tac)
}

/// Compile a checked program to assembly text.
pub fn compile_to_asm(program: &ast::Program) -> Result<String, CompileError> {
    compile(program, EmitMode::Asm)
}
