use crate::ast::{ArithOp, Expr, LogicOp, RelOp, Symbol, Type};
use crate::tac::{BinOpCode, Instr, LocationId, VAR_SIZE};
use crate::CompileError;

use super::context::{BuiltIn, LoweringContext, ERR_ARRAY_BOUNDS, ERR_ARRAY_SIZE};

/// An lvalue as produced by place lowering: either a named location or a
/// computed address to load from / store through.
pub enum Place {
    Direct(LocationId),
    Indirect { addr: LocationId, offset: i32 },
}

impl<'a> LoweringContext<'a> {
    /// Lower an expression and yield the location holding its value.
    ///
    /// Void-valued calls are rejected here; statement position tolerates
    /// them by going through `lower_call` directly.
    pub fn lower_expr(&mut self, e: &Expr) -> Result<LocationId, CompileError> {
        match e {
            Expr::IntLit(v) => Ok(self.load_const(*v)),
            Expr::BoolLit(v) => Ok(self.load_const(*v as i32)),
            Expr::NullLit => Ok(self.load_const(0)),
            Expr::DoubleLit(_) => Err(CompileError::Unsupported("double-precision emission")),
            Expr::StrLit(s) => {
                let dst = self.temp();
                self.emit(Instr::LoadStrLit {
                    dst,
                    value: s.clone(),
                });
                Ok(dst)
            }
            Expr::This => Ok(self.this_loc()),

            Expr::Var(_) | Expr::Field { .. } | Expr::Index { .. } => {
                let place = self.lower_place(e)?;
                Ok(self.read_place(place))
            }

            Expr::Assign { target, value } => {
                let src = self.lower_expr(value)?;
                let place = self.lower_place(target)?;
                self.write_place(place, src);
                Ok(src)
            }

            Expr::Arith { op, left, right } => {
                let rhs = self.lower_expr(right)?;
                let lhs = self.lower_expr(left)?;
                Ok(self.binop(arith_code(*op), lhs, rhs))
            }

            // Unary minus is 0 - x.
            Expr::Neg(operand) => {
                let rhs = self.lower_expr(operand)?;
                let zero = self.load_const(0);
                Ok(self.binop(BinOpCode::Sub, zero, rhs))
            }

            Expr::Rel { op, left, right } => {
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(right)?;
                Ok(match op {
                    RelOp::Lt => self.binop(BinOpCode::Lt, lhs, rhs),
                    // a > b is b < a.
                    RelOp::Gt => self.binop(BinOpCode::Lt, rhs, lhs),
                    RelOp::Le => {
                        let lt = self.binop(BinOpCode::Lt, lhs, rhs);
                        let eq = self.binop(BinOpCode::Eq, lhs, rhs);
                        self.binop(BinOpCode::Or, lt, eq)
                    }
                    RelOp::Ge => {
                        let gt = self.binop(BinOpCode::Lt, rhs, lhs);
                        let eq = self.binop(BinOpCode::Eq, lhs, rhs);
                        self.binop(BinOpCode::Or, gt, eq)
                    }
                })
            }

            Expr::Eq {
                negated,
                left,
                right,
                operand_ty,
            } => {
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(right)?;
                let eq = if *operand_ty == Type::Str {
                    self.builtin_call(BuiltIn::StringEqual, &[lhs, rhs])
                        .expect("_StringEqual returns a value")
                } else {
                    self.binop(BinOpCode::Eq, lhs, rhs)
                };
                if *negated {
                    let zero = self.load_const(0);
                    Ok(self.binop(BinOpCode::Eq, eq, zero))
                } else {
                    Ok(eq)
                }
            }

            Expr::Logic { op, left, right } => {
                let rhs = self.lower_expr(right)?;
                let lhs = self.lower_expr(left)?;
                let code = match op {
                    LogicOp::And => BinOpCode::And,
                    LogicOp::Or => BinOpCode::Or,
                };
                Ok(self.binop(code, lhs, rhs))
            }

            // Logical not is x == 0.
            Expr::Not(operand) => {
                let value = self.lower_expr(operand)?;
                let zero = self.load_const(0);
                Ok(self.binop(BinOpCode::Eq, value, zero))
            }

            Expr::FnCall { .. } | Expr::MethodCall { .. } => {
                let dst = self.lower_call(e)?;
                Ok(dst.expect("void call used as a value; the checker should have rejected it"))
            }

            Expr::ArrayLength { base } => {
                let array = self.lower_expr(base)?;
                // The element count sits one word below element 0.
                let dst = self.temp();
                self.emit(Instr::Load {
                    dst,
                    base: array,
                    offset: -VAR_SIZE,
                });
                Ok(dst)
            }

            Expr::New { class } => {
                let layout = self.layouts.layout(*class);
                let (size, class_name) = (layout.size, layout.name.clone());
                let size_loc = self.load_const(size);
                let obj = self
                    .builtin_call(BuiltIn::Alloc, &[size_loc])
                    .expect("_Alloc returns a value");
                let vtable = self.temp();
                self.emit(Instr::LoadLabel {
                    dst: vtable,
                    label: class_name,
                });
                self.emit(Instr::Store {
                    base: obj,
                    src: vtable,
                    offset: 0,
                });
                Ok(obj)
            }

            Expr::NewArray { size, .. } => self.lower_new_array(size),

            Expr::ReadInteger => Ok(self
                .builtin_call(BuiltIn::ReadInteger, &[])
                .expect("_ReadInteger returns a value")),
            Expr::ReadLine => Ok(self
                .builtin_call(BuiltIn::ReadLine, &[])
                .expect("_ReadLine returns a value")),
        }
    }

    /// Lower a call expression; `None` when the callee returns void.
    pub fn lower_call(&mut self, e: &Expr) -> Result<Option<LocationId>, CompileError> {
        match e {
            Expr::FnCall { func, args } => {
                let decl = &self.program.functions[*func];
                let label = crate::layout::fn_label(&decl.name);
                let has_return = decl.has_return_value();

                let mut actuals = Vec::with_capacity(args.len());
                for arg in args {
                    actuals.push(self.lower_expr(arg)?);
                }
                for &a in actuals.iter().rev() {
                    self.emit(Instr::PushParam { src: a });
                }
                let dst = has_return.then(|| self.temp());
                self.emit(Instr::LCall { label, dst });
                self.pop_params(actuals.len() as i32 * VAR_SIZE);
                Ok(dst)
            }

            Expr::MethodCall {
                base,
                class,
                method,
                args,
            } => {
                let has_return = self
                    .program
                    .find_method(*class, method)
                    .unwrap_or_else(|| {
                        panic!("method '{method}' not found on class #{class}")
                    })
                    .has_return_value();
                let method_offset = self.layouts.layout(*class).method_offset(method);

                let object = match base {
                    Some(b) => self.lower_expr(b)?,
                    None => self.this_loc(),
                };
                // Dispatch through the table installed at offset 0.
                let vtable = self.temp();
                self.emit(Instr::Load {
                    dst: vtable,
                    base: object,
                    offset: 0,
                });
                let fn_addr = self.temp();
                self.emit(Instr::Load {
                    dst: fn_addr,
                    base: vtable,
                    offset: method_offset,
                });

                let mut actuals = Vec::with_capacity(args.len());
                for arg in args {
                    actuals.push(self.lower_expr(arg)?);
                }
                // Reverse order, receiver last, so arg 1 lands at the lowest
                // stack address with `this` below it.
                for &a in actuals.iter().rev() {
                    self.emit(Instr::PushParam { src: a });
                }
                self.emit(Instr::PushParam { src: object });

                let dst = has_return.then(|| self.temp());
                self.emit(Instr::ACall { addr: fn_addr, dst });
                self.pop_params((actuals.len() as i32 + 1) * VAR_SIZE);
                Ok(dst)
            }

            other => self.lower_expr(other).map(Some),
        }
    }

    // ── Places ──────────────────────────────────────────────────────────

    pub fn lower_place(&mut self, e: &Expr) -> Result<Place, CompileError> {
        match e {
            Expr::Var(Symbol::Global(id)) => Ok(Place::Direct(self.global_loc(*id))),
            Expr::Var(Symbol::Local(id)) => Ok(Place::Direct(self.local_loc(*id))),
            Expr::Var(Symbol::Param(index)) => Ok(Place::Direct(self.formal_loc(*index))),

            Expr::Field { base, class, name } => {
                let offset = self.layouts.layout(*class).field_offset(name);
                let addr = match base {
                    Some(b) => self.lower_expr(b)?,
                    None => self.this_loc(),
                };
                Ok(Place::Indirect { addr, offset })
            }

            Expr::Index { base, index } => self.lower_indexed_place(base, index),

            other => panic!("expression {other:?} is not an lvalue"),
        }
    }

    pub fn read_place(&mut self, place: Place) -> LocationId {
        match place {
            Place::Direct(loc) => loc,
            Place::Indirect { addr, offset } => {
                let dst = self.temp();
                self.emit(Instr::Load { dst, base: addr, offset });
                dst
            }
        }
    }

    pub fn write_place(&mut self, place: Place, src: LocationId) {
        match place {
            Place::Direct(dst) => self.emit(Instr::Assign { dst, src }),
            Place::Indirect { addr, offset } => {
                self.emit(Instr::Store { base: addr, src, offset })
            }
        }
    }

    /// Element address computation with the runtime bounds check.
    ///
    /// The fault branch prints the error literal and halts; the happy path
    /// jumps over it and yields `base + index * VAR_SIZE`.
    fn lower_indexed_place(&mut self, base: &Expr, index: &Expr) -> Result<Place, CompileError> {
        let array = self.lower_expr(base)?;
        let idx = self.lower_expr(index)?;

        let length = self.temp();
        self.emit(Instr::Load {
            dst: length,
            base: array,
            offset: -VAR_SIZE,
        });

        let label_halt = self.new_label();
        let label_after = self.new_label();

        // (-1 < index) && (index < length)
        let neg_one = self.load_const(-1);
        let lower = self.binop(BinOpCode::Lt, neg_one, idx);
        let upper = self.binop(BinOpCode::Lt, idx, length);
        let test = self.binop(BinOpCode::And, lower, upper);
        self.emit(Instr::IfZ {
            cond: test,
            target: label_halt.clone(),
        });

        let var_size = self.load_const(VAR_SIZE);
        let byte_offset = self.binop(BinOpCode::Mul, idx, var_size);
        let addr = self.binop(BinOpCode::Add, array, byte_offset);
        self.emit(Instr::Goto {
            target: label_after.clone(),
        });

        self.emit(Instr::Label(label_halt));
        let message = self.temp();
        self.emit(Instr::LoadStrLit {
            dst: message,
            value: ERR_ARRAY_BOUNDS.to_string(),
        });
        self.builtin_call(BuiltIn::PrintString, &[message]);
        self.builtin_call(BuiltIn::Halt, &[]);
        self.emit(Instr::Label(label_after));

        Ok(Place::Indirect { addr, offset: 0 })
    }

    /// `NewArray(n, T)`: check `n >= 1`, allocate `(n + 1)` words, store the
    /// length at word 0 and yield a pointer to element 0.
    fn lower_new_array(&mut self, size: &Expr) -> Result<LocationId, CompileError> {
        let length = self.lower_expr(size)?;

        let one = self.load_const(1);
        let label_after = self.new_label();
        let too_small = self.binop(BinOpCode::Lt, length, one);
        self.emit(Instr::IfZ {
            cond: too_small,
            target: label_after.clone(),
        });
        let message = self.temp();
        self.emit(Instr::LoadStrLit {
            dst: message,
            value: ERR_ARRAY_SIZE.to_string(),
        });
        self.builtin_call(BuiltIn::PrintString, &[message]);
        self.builtin_call(BuiltIn::Halt, &[]);
        self.emit(Instr::Label(label_after));

        let var_size = self.load_const(VAR_SIZE);
        let elems_size = self.binop(BinOpCode::Mul, var_size, length);
        let total_size = self.binop(BinOpCode::Add, var_size, elems_size);
        let addr = self
            .builtin_call(BuiltIn::Alloc, &[total_size])
            .expect("_Alloc returns a value");
        self.emit(Instr::Store {
            base: addr,
            src: length,
            offset: 0,
        });
        Ok(self.binop(BinOpCode::Add, addr, var_size))
    }

    // ── Small emission helpers ──────────────────────────────────────────

    pub fn load_const(&mut self, value: i32) -> LocationId {
        let dst = self.temp();
        self.emit(Instr::LoadConst { dst, value });
        dst
    }

    pub fn binop(&mut self, op: BinOpCode, left: LocationId, right: LocationId) -> LocationId {
        let dst = self.temp();
        self.emit(Instr::BinOp {
            op,
            dst,
            left,
            right,
        });
        dst
    }
}

fn arith_code(op: ArithOp) -> BinOpCode {
    match op {
        ArithOp::Add => BinOpCode::Add,
        ArithOp::Sub => BinOpCode::Sub,
        ArithOp::Mul => BinOpCode::Mul,
        ArithOp::Div => BinOpCode::Div,
        ArithOp::Mod => BinOpCode::Mod,
    }
}
