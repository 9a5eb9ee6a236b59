use std::collections::HashMap;

use crate::ast::{LocalId, Program};
use crate::layout::ClassLayouts;
use crate::tac::{
    FunctionInfo, Instr, LocationId, Segment, TacProgram, OFFSET_FIRST_GLOBAL, OFFSET_FIRST_LOCAL,
    OFFSET_FIRST_PARAM, VAR_SIZE,
};

/// Message printed by the generated bounds-check fault handler.
pub const ERR_ARRAY_BOUNDS: &str = "Mocha runtime error: array subscript out of bounds\n";
/// Message printed when a runtime array size is not positive.
pub const ERR_ARRAY_SIZE: &str = "Mocha runtime error: array size is <= 0\n";

// ── Runtime built-ins ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltIn {
    Alloc,
    ReadLine,
    ReadInteger,
    StringEqual,
    PrintInt,
    PrintString,
    PrintBool,
    Halt,
}

struct BuiltInSpec {
    label: &'static str,
    num_args: usize,
    has_return: bool,
}

const BUILTINS: [BuiltInSpec; 8] = [
    BuiltInSpec { label: "_Alloc", num_args: 1, has_return: true },
    BuiltInSpec { label: "_ReadLine", num_args: 0, has_return: true },
    BuiltInSpec { label: "_ReadInteger", num_args: 0, has_return: true },
    BuiltInSpec { label: "_StringEqual", num_args: 2, has_return: true },
    BuiltInSpec { label: "_PrintInt", num_args: 1, has_return: false },
    BuiltInSpec { label: "_PrintString", num_args: 1, has_return: false },
    BuiltInSpec { label: "_PrintBool", num_args: 1, has_return: false },
    BuiltInSpec { label: "_Halt", num_args: 0, has_return: false },
];

impl BuiltIn {
    fn spec(self) -> &'static BuiltInSpec {
        &BUILTINS[self as usize]
    }
}

// ── Lowering context ────────────────────────────────────────────────────

/// Owns everything the postorder lowering walk needs: the append-only
/// instruction stream, the location table, the class layouts, monotone
/// temp/label counters, the per-function frame counters and the explicitly
/// threaded context (receiver slot, enclosing-loop exits).
pub struct LoweringContext<'a> {
    pub program: &'a Program,
    pub layouts: ClassLayouts,

    out: TacProgram,
    // Process-wide monotone counters; never reset, so names are unique over
    // the whole compilation.
    temp_counter: usize,
    label_counter: usize,

    // Per-function frame counters, reset at every EndFunc.
    local_counter: i32,
    param_counter: i32,

    globals: Vec<LocationId>,
    locals: HashMap<LocalId, LocationId>,
    formals: Vec<LocationId>,
    this_loc: Option<LocationId>,
    loop_exits: Vec<String>,
    begin_index: Option<usize>,
    current_label: Option<String>,
}

impl<'a> LoweringContext<'a> {
    pub fn new(program: &'a Program) -> Self {
        let layouts = ClassLayouts::build(program);
        let mut out = TacProgram::default();
        let globals = program
            .globals
            .iter()
            .enumerate()
            .map(|(i, g)| {
                out.locations.intern(
                    g.name.clone(),
                    Segment::GpRelative,
                    OFFSET_FIRST_GLOBAL + VAR_SIZE * i as i32,
                )
            })
            .collect();
        LoweringContext {
            program,
            layouts,
            out,
            temp_counter: 0,
            label_counter: 0,
            local_counter: 0,
            param_counter: 0,
            globals,
            locals: HashMap::new(),
            formals: Vec::new(),
            this_loc: None,
            loop_exits: Vec::new(),
            begin_index: None,
            current_label: None,
        }
    }

    pub fn finish(self) -> TacProgram {
        self.out
    }

    pub fn emit(&mut self, instr: Instr) {
        self.out.instrs.push(instr);
    }

    pub fn new_label(&mut self) -> String {
        let label = format!("_L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    // ── Frame slots ─────────────────────────────────────────────────────

    pub fn temp(&mut self) -> LocationId {
        let name = format!("_tmp{}", self.temp_counter);
        self.temp_counter += 1;
        self.next_local_slot(name)
    }

    pub fn local_var(&mut self, id: LocalId, name: &str) -> LocationId {
        let loc = self.next_local_slot(name.to_string());
        self.locals.insert(id, loc);
        loc
    }

    fn next_local_slot(&mut self, name: String) -> LocationId {
        let offset = OFFSET_FIRST_LOCAL - VAR_SIZE * self.local_counter;
        self.local_counter += 1;
        self.out.locations.intern(name, Segment::FpRelative, offset)
    }

    fn param_var(&mut self, name: &str) -> LocationId {
        let offset = OFFSET_FIRST_PARAM + VAR_SIZE * self.param_counter;
        self.param_counter += 1;
        self.out
            .locations
            .intern(name.to_string(), Segment::FpRelative, offset)
    }

    pub fn frame_size(&self) -> i32 {
        VAR_SIZE * self.local_counter
    }

    // ── Resolved operand lookup ─────────────────────────────────────────

    pub fn global_loc(&self, id: usize) -> LocationId {
        self.globals[id]
    }

    pub fn local_loc(&self, id: LocalId) -> LocationId {
        *self
            .locals
            .get(&id)
            .unwrap_or_else(|| panic!("local #{id} used before its declaration was lowered"))
    }

    pub fn formal_loc(&self, index: usize) -> LocationId {
        self.formals[index]
    }

    pub fn this_loc(&self) -> LocationId {
        self.this_loc
            .expect("'this' used outside a method; the checker should have rejected it")
    }

    // ── Function boundaries ─────────────────────────────────────────────

    /// Emit `label:` followed by a `BeginFunc` whose frame size is patched in
    /// by [`Self::end_function`].  Methods get their receiver slot first, then
    /// the formals left to right.
    pub fn begin_function(&mut self, label: String, is_method: bool, formals: &[String]) {
        self.emit(Instr::Label(label.clone()));
        self.begin_index = Some(self.out.instrs.len());
        self.current_label = Some(label);
        self.emit(Instr::BeginFunc { frame_size: 0 });
        if is_method {
            self.this_loc = Some(self.param_var("this"));
        }
        for name in formals {
            let loc = self.param_var(name);
            self.formals.push(loc);
        }
    }

    pub fn end_function(&mut self) {
        let begin = self
            .begin_index
            .take()
            .expect("end_function without begin_function");
        let frame_size = self.frame_size();
        match &mut self.out.instrs[begin] {
            Instr::BeginFunc { frame_size: slot } => *slot = frame_size,
            other => panic!("recorded BeginFunc index points at {other:?}"),
        }
        self.emit(Instr::EndFunc);

        let mut params = Vec::new();
        params.extend(self.this_loc.take());
        params.append(&mut self.formals);
        self.out.functions.push(FunctionInfo {
            label: self.current_label.take().expect("function label not set"),
            begin,
            params,
        });

        self.local_counter = 0;
        self.param_counter = 0;
        self.locals.clear();
    }

    // ── Loops ───────────────────────────────────────────────────────────

    pub fn push_loop_exit(&mut self, label: String) {
        self.loop_exits.push(label);
    }

    pub fn pop_loop_exit(&mut self) {
        self.loop_exits.pop();
    }

    pub fn enclosing_loop_exit(&self) -> String {
        self.loop_exits
            .last()
            .expect("break outside a loop; the checker should have rejected it")
            .clone()
    }

    // ── Calls ───────────────────────────────────────────────────────────

    /// Push `args` in reverse order, call the runtime routine and clean up
    /// the stack.  Returns the result temporary when the routine has one.
    pub fn builtin_call(&mut self, builtin: BuiltIn, args: &[LocationId]) -> Option<LocationId> {
        let spec = builtin.spec();
        assert_eq!(
            args.len(),
            spec.num_args,
            "built-in {} takes {} argument(s)",
            spec.label,
            spec.num_args
        );
        for &arg in args.iter().rev() {
            self.emit(Instr::PushParam { src: arg });
        }
        let dst = spec.has_return.then(|| self.temp());
        self.emit(Instr::LCall {
            label: spec.label.to_string(),
            dst,
        });
        self.pop_params(spec.num_args as i32 * VAR_SIZE);
        dst
    }

    pub fn pop_params(&mut self, bytes: i32) {
        debug_assert!(bytes >= 0 && bytes % VAR_SIZE == 0);
        if bytes > 0 {
            self.emit(Instr::PopParams { bytes });
        }
    }
}
