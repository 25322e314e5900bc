//! Synthesized built-in types.
//!
//! These declarations exist before any source text is seen, so that the
//! global scope can resolve them by name. Their ids are fixed by seeding
//! order and used as constants throughout the compiler.

use oolc_util::Pos;

use crate::decls::{ClassId, ClassKind, ClassSym, Decls, PrepState};

/// Root of the class forest. Size 1: the VMT pointer at word 0.
pub const OBJECT: ClassId = ClassId(0);
/// Boxed integer. Size 2: VMT pointer plus the payload word at offset 1.
pub const INTEGER: ClassId = ClassId(1);
/// Boxed boolean. Size 2, like `Integer`.
pub const BOOLEAN: ClassId = ClassId(2);
/// Unboxed integer word.
pub const INT: ClassId = ClassId(3);
/// Unboxed boolean word.
pub const BOOL: ClassId = ClassId(4);
/// Result "type" of methods without a return type.
pub const VOID: ClassId = ClassId(5);
/// Type of the `NULL` literal, assignable to every reference type.
pub const NULL_TYPE: ClassId = ClassId(6);

/// Creates a fresh declaration world containing exactly the builtins.
pub fn seed() -> Decls {
    let mut decls = Decls::default();

    let object = class(&mut decls, "Object", ClassKind::Reference, None, 1);
    debug_assert_eq!(object, OBJECT);
    let integer = class(&mut decls, "Integer", ClassKind::Reference, Some(OBJECT), 2);
    debug_assert_eq!(integer, INTEGER);
    let boolean = class(&mut decls, "Boolean", ClassKind::Reference, Some(OBJECT), 2);
    debug_assert_eq!(boolean, BOOLEAN);
    let int = class(&mut decls, "Int", ClassKind::Primitive, None, 1);
    debug_assert_eq!(int, INT);
    let bool_ = class(&mut decls, "Bool", ClassKind::Primitive, None, 1);
    debug_assert_eq!(bool_, BOOL);
    let void = class(&mut decls, "Void", ClassKind::Void, None, 0);
    debug_assert_eq!(void, VOID);
    let null = class(&mut decls, "NullType", ClassKind::Null, None, 1);
    debug_assert_eq!(null, NULL_TYPE);

    decls
}

fn class(
    decls: &mut Decls,
    name: &str,
    kind: ClassKind,
    base: Option<ClassId>,
    size: i32,
) -> ClassId {
    let id = decls.add_class(ClassSym {
        name: name.to_string(),
        pos: Pos::DUMMY,
        kind,
        base_name: None,
        base,
        attributes: Vec::new(),
        methods: Vec::new(),
        vmt: Vec::new(),
        size,
        state: PrepState::Prepared,
    });
    decls.classes_by_name.insert(name.to_string(), id);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeding_order_is_stable() {
        let decls = seed();
        let names: Vec<_> = decls
            .class_ids()
            .map(|id| decls.class(id).name.clone())
            .collect();
        assert_eq!(
            names,
            ["Object", "Integer", "Boolean", "Int", "Bool", "Void", "NullType"]
        );
    }

    #[test]
    fn test_lookup_by_name() {
        let decls = seed();
        assert_eq!(decls.lookup_class("Object"), Some(OBJECT));
        assert_eq!(decls.lookup_class("Integer"), Some(INTEGER));
        assert_eq!(decls.lookup_class("NullType"), Some(NULL_TYPE));
        assert_eq!(decls.lookup_class("Main"), None);
    }

    #[test]
    fn test_builtins_are_prepared() {
        let decls = seed();
        for id in decls.class_ids() {
            assert_eq!(decls.class(id).state, PrepState::Prepared);
        }
    }
}
