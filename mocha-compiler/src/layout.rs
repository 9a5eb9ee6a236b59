//! Object layout planning: per-class sizes, field offsets and vtables.
//!
//! Runs once before lowering and is immutable afterwards.  Slot 0 of every
//! object holds the vtable pointer, so the first field lands at `+VAR_SIZE`
//! and a derived class's own fields start where its base's storage ends.
//! Overriding a method reuses the base method's vtable slot; new methods
//! append, so slot indices stay dense.

use std::collections::HashMap;

use crate::ast::{ClassId, Program};
use crate::tac::VAR_SIZE;

#[derive(Debug, Clone)]
pub struct ClassLayout {
    pub name: String,
    /// Total object size in bytes, including the vtable pointer word.
    pub size: i32,
    /// Byte offset of every field, inherited fields included.
    pub field_offsets: HashMap<String, i32>,
    /// Method labels in slot order; this is the vtable that gets emitted.
    pub vtable: Vec<String>,
    /// Vtable slot of every method, inherited methods included.
    pub method_slots: HashMap<String, usize>,
}

impl ClassLayout {
    /// Byte offset of a method's vtable entry.
    pub fn method_offset(&self, name: &str) -> i32 {
        let slot = self.method_slots.get(name).unwrap_or_else(|| {
            panic!("method '{}' not found in layout of '{}'", name, self.name)
        });
        *slot as i32 * VAR_SIZE
    }

    pub fn field_offset(&self, name: &str) -> i32 {
        *self.field_offsets.get(name).unwrap_or_else(|| {
            panic!("field '{}' not found in layout of '{}'", name, self.name)
        })
    }
}

#[derive(Debug, Default)]
pub struct ClassLayouts {
    layouts: Vec<ClassLayout>,
}

impl ClassLayouts {
    pub fn build(program: &Program) -> Self {
        let mut memo: Vec<Option<ClassLayout>> = vec![None; program.classes.len()];
        for id in 0..program.classes.len() {
            build_class(program, id, &mut memo);
        }
        ClassLayouts {
            layouts: memo.into_iter().map(Option::unwrap).collect(),
        }
    }

    pub fn layout(&self, id: ClassId) -> &ClassLayout {
        &self.layouts[id]
    }

    pub fn size_of(&self, id: ClassId) -> i32 {
        self.layouts[id].size
    }
}

/// Label of a method as it appears in vtables and at its definition site.
pub fn method_label(class_name: &str, method_name: &str) -> String {
    format!("_{class_name}.{method_name}")
}

/// Label of a top-level function.  `main` keeps its bare name and is the
/// program entry point.
pub fn fn_label(name: &str) -> String {
    if name == "main" {
        name.to_string()
    } else {
        format!("_{name}")
    }
}

fn build_class(program: &Program, id: ClassId, memo: &mut Vec<Option<ClassLayout>>) {
    if memo[id].is_some() {
        return;
    }
    let decl = &program.classes[id];

    let (mut size, mut field_offsets, mut vtable, mut method_slots) = match decl.base {
        Some(base) => {
            build_class(program, base, memo);
            let b = memo[base].as_ref().unwrap();
            (
                b.size,
                b.field_offsets.clone(),
                b.vtable.clone(),
                b.method_slots.clone(),
            )
        }
        // One word reserved for the vtable pointer.
        None => (VAR_SIZE, HashMap::new(), Vec::new(), HashMap::new()),
    };

    for field in &decl.fields {
        field_offsets.insert(field.name.clone(), size);
        size += VAR_SIZE;
    }

    for method in &decl.methods {
        let label = method_label(&decl.name, &method.name);
        match method_slots.get(&method.name) {
            // An inherited method of the same name is overridden in place so
            // its slot index is preserved.  A signature mismatch was already
            // diagnosed upstream; replacing last-wins keeps the table dense.
            Some(&slot) => vtable[slot] = label,
            None => {
                method_slots.insert(method.name.clone(), vtable.len());
                vtable.push(label);
            }
        }
    }

    memo[id] = Some(ClassLayout {
        name: decl.name.clone(),
        size,
        field_offsets,
        vtable,
        method_slots,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, ClassDecl, FnDecl, Type, VarDecl};

    fn field(name: &str) -> VarDecl {
        VarDecl {
            name: name.to_string(),
            ty: Type::Int,
        }
    }

    fn method(name: &str) -> FnDecl {
        FnDecl {
            name: name.to_string(),
            ret: Type::Void,
            params: Vec::new(),
            body: Block::default(),
        }
    }

    fn class(name: &str, base: Option<ClassId>, fields: Vec<VarDecl>, methods: Vec<FnDecl>) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            base,
            fields,
            methods,
        }
    }

    #[test]
    fn base_class_fields_start_after_vtable_pointer() {
        let mut p = Program::default();
        p.classes.push(class("A", None, vec![field("x"), field("y")], vec![]));
        let layouts = ClassLayouts::build(&p);
        let a = layouts.layout(0);
        assert_eq!(a.field_offset("x"), 4);
        assert_eq!(a.field_offset("y"), 8);
        assert_eq!(a.size, 12);
    }

    #[test]
    fn derived_fields_start_at_base_size() {
        let mut p = Program::default();
        p.classes.push(class("A", None, vec![field("x")], vec![]));
        p.classes.push(class("B", Some(0), vec![field("z")], vec![]));
        let layouts = ClassLayouts::build(&p);
        let b = layouts.layout(1);
        // Inherited field keeps its offset; the new field starts at size(A).
        assert_eq!(b.field_offset("x"), 4);
        assert_eq!(b.field_offset("z"), 8);
        assert_eq!(b.size, 12);
    }

    #[test]
    fn override_preserves_vtable_slot() {
        let mut p = Program::default();
        p.classes
            .push(class("A", None, vec![], vec![method("f"), method("g")]));
        p.classes.push(class("B", Some(0), vec![], vec![method("f")]));
        let layouts = ClassLayouts::build(&p);
        let a = layouts.layout(0);
        let b = layouts.layout(1);
        assert_eq!(a.vtable, vec!["_A.f", "_A.g"]);
        assert_eq!(b.vtable, vec!["_B.f", "_A.g"]);
        assert_eq!(a.method_slots["f"], b.method_slots["f"]);
        assert_eq!(b.method_offset("g"), 4);
    }

    #[test]
    fn new_methods_append_without_holes() {
        let mut p = Program::default();
        p.classes.push(class("A", None, vec![], vec![method("f")]));
        p.classes
            .push(class("B", Some(0), vec![], vec![method("h"), method("f")]));
        let layouts = ClassLayouts::build(&p);
        let b = layouts.layout(1);
        assert_eq!(b.vtable, vec!["_B.f", "_B.h"]);
        assert_eq!(b.method_slots["h"], 1);
    }

    #[test]
    fn name_collision_with_different_signature_still_replaces() {
        let mut p = Program::default();
        p.classes.push(class("A", None, vec![], vec![method("f")]));
        let mut f2 = method("f");
        f2.ret = Type::Int;
        p.classes.push(class("B", Some(0), vec![], vec![f2]));
        let layouts = ClassLayouts::build(&p);
        assert_eq!(layouts.layout(1).vtable, vec!["_B.f"]);
    }

    #[test]
    fn layout_is_memoized_through_a_chain() {
        let mut p = Program::default();
        p.classes.push(class("C", Some(1), vec![field("c")], vec![]));
        p.classes.push(class("B", Some(2), vec![field("b")], vec![]));
        p.classes.push(class("A", None, vec![field("a")], vec![]));
        let layouts = ClassLayouts::build(&p);
        assert_eq!(layouts.layout(2).size, 8);
        assert_eq!(layouts.layout(1).size, 12);
        assert_eq!(layouts.layout(0).size, 16);
        assert_eq!(layouts.layout(0).field_offset("a"), 4);
        assert_eq!(layouts.layout(0).field_offset("b"), 8);
        assert_eq!(layouts.layout(0).field_offset("c"), 12);
    }
}
