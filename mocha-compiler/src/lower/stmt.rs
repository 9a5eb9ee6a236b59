use crate::ast::{Block, ClassId, Expr, FnDecl, PrintArg, Stmt, Type};
use crate::layout::{fn_label, method_label};
use crate::tac::Instr;
use crate::CompileError;

use super::context::{BuiltIn, LoweringContext};

impl<'a> LoweringContext<'a> {
    pub fn lower_function(
        &mut self,
        class: Option<ClassId>,
        decl: &FnDecl,
    ) -> Result<(), CompileError> {
        let label = match class {
            Some(id) => method_label(&self.program.classes[id].name, &decl.name),
            None => fn_label(&decl.name),
        };
        let formals: Vec<String> = decl.params.iter().map(|p| p.name.clone()).collect();

        self.begin_function(label, class.is_some(), &formals);
        self.lower_block(&decl.body)?;
        self.end_function();
        Ok(())
    }

    pub fn lower_block(&mut self, block: &Block) -> Result<(), CompileError> {
        for decl in &block.decls {
            self.local_var(decl.id, &decl.var.name);
        }
        for stmt in &block.stmts {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Block(block) => self.lower_block(block),

            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let test = self.lower_expr(cond)?;
                let label_after = self.new_label();
                match else_body {
                    Some(else_body) => {
                        let label_else = self.new_label();
                        self.emit(Instr::IfZ {
                            cond: test,
                            target: label_else.clone(),
                        });
                        self.lower_stmt(then_body)?;
                        self.emit(Instr::Goto {
                            target: label_after.clone(),
                        });
                        self.emit(Instr::Label(label_else));
                        self.lower_stmt(else_body)?;
                    }
                    None => {
                        self.emit(Instr::IfZ {
                            cond: test,
                            target: label_after.clone(),
                        });
                        self.lower_stmt(then_body)?;
                    }
                }
                self.emit(Instr::Label(label_after));
                Ok(())
            }

            Stmt::While { cond, body } => {
                let label_top = self.new_label();
                let label_after = self.new_label();
                self.emit(Instr::Label(label_top.clone()));
                let test = self.lower_expr(cond)?;
                self.emit(Instr::IfZ {
                    cond: test,
                    target: label_after.clone(),
                });
                self.push_loop_exit(label_after.clone());
                self.lower_stmt(body)?;
                self.pop_loop_exit();
                self.emit(Instr::Goto { target: label_top });
                self.emit(Instr::Label(label_after));
                Ok(())
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.lower_expr_discard(init)?;
                }
                let label_top = self.new_label();
                let label_after = self.new_label();
                self.emit(Instr::Label(label_top.clone()));
                let test = self.lower_expr(cond)?;
                self.emit(Instr::IfZ {
                    cond: test,
                    target: label_after.clone(),
                });
                self.push_loop_exit(label_after.clone());
                self.lower_stmt(body)?;
                self.pop_loop_exit();
                if let Some(step) = step {
                    self.lower_expr_discard(step)?;
                }
                self.emit(Instr::Goto { target: label_top });
                self.emit(Instr::Label(label_after));
                Ok(())
            }

            Stmt::Break => {
                let target = self.enclosing_loop_exit();
                self.emit(Instr::Goto { target });
                Ok(())
            }

            Stmt::Return(value) => {
                let value = match value {
                    Some(e) => Some(self.lower_expr(e)?),
                    None => None,
                };
                self.emit(Instr::Return { value });
                Ok(())
            }

            Stmt::Print(args) => self.lower_print(args),

            Stmt::Expr(e) => self.lower_expr_discard(e),
        }
    }

    /// Statement-position expression: calls may be void here.
    fn lower_expr_discard(&mut self, e: &Expr) -> Result<(), CompileError> {
        match e {
            Expr::FnCall { .. } | Expr::MethodCall { .. } => {
                self.lower_call(e)?;
            }
            other => {
                self.lower_expr(other)?;
            }
        }
        Ok(())
    }

    fn lower_print(&mut self, args: &[PrintArg]) -> Result<(), CompileError> {
        for arg in args {
            let value = self.lower_expr(&arg.expr)?;
            let builtin = match arg.ty {
                Type::Int => BuiltIn::PrintInt,
                Type::Str => BuiltIn::PrintString,
                Type::Bool => BuiltIn::PrintBool,
                Type::Double => {
                    return Err(CompileError::Unsupported("double-precision emission"))
                }
                ref other => panic!("Print argument of unprintable type {other}"),
            };
            self.builtin_call(builtin, &[value]);
        }
        Ok(())
    }
}
