//! Structured assembly output.
//!
//! The emitter builds a flat list of `AsmItem`s which is flattened to text
//! at the end; keeping items structured makes the emitter templates easy to
//! test without string surgery.

#[derive(Debug, Clone)]
pub enum AsmItem {
    /// A label on its own line, flush left.
    Label(String),
    /// A machine instruction, with an optional trailing comment.
    Instr {
        text: String,
        comment: Option<String>,
    },
    /// An assembler directive (`.data`, `.asciiz`, ...).
    Directive(String),
    /// A standalone comment line (used to echo the TAC being translated).
    Comment(String),
    Blank,
}

pub fn flatten(items: &[AsmItem]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            AsmItem::Label(name) => out.push_str(&format!("{name}:\n")),
            AsmItem::Instr {
                text,
                comment: Some(c),
            } => out.push_str(&format!("\t{text}\t# {c}\n")),
            AsmItem::Instr {
                text,
                comment: None,
            } => out.push_str(&format!("\t{text}\n")),
            AsmItem::Directive(text) => out.push_str(&format!("\t{text}\n")),
            AsmItem::Comment(text) => out.push_str(&format!("\t# {text}\n")),
            AsmItem::Blank => out.push('\n'),
        }
    }
    out
}
