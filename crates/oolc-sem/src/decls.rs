//! Declaration arenas.
//!
//! All declarations live in three flat arenas indexed by the typed ids
//! [`ClassId`], [`VarId`] and [`MethodId`]. The cyclic references of the
//! declaration graph (a class points at its attributes, an attribute's
//! type points back at a class) are expressed through these stable
//! indices; nothing is ever double-owned.

use indexmap::IndexMap;
use oolc_par::ast::AccessRight;
use oolc_util::Pos;

use crate::builtins::{BOOL, BOOLEAN, INT, INTEGER, NULL_TYPE};
use crate::hir;

/// Index of a class (or primitive/pseudo type) in [`Decls`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub u32);

/// Index of a variable declaration in [`Decls`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

/// Index of a method declaration in [`Decls`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(pub u32);

/// What flavor of type a [`ClassSym`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// An instantiable reference class (user classes, `Object`, `Integer`,
    /// `Boolean`).
    Reference,
    /// An unboxed primitive (`Int`, `Bool`).
    Primitive,
    /// The result "type" of methods without one (`Void`).
    Void,
    /// The type of the `NULL` literal.
    Null,
}

/// Preparation state of a class, used to detect inheritance cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrepState {
    Unprepared,
    Preparing,
    Prepared,
}

/// A class declaration (or one of the synthesized builtin types).
#[derive(Debug)]
pub struct ClassSym {
    pub name: String,
    pub pos: Pos,
    pub kind: ClassKind,
    /// The unresolved `EXTENDS` name from the source; `None` means the
    /// default base `Object`.
    pub base_name: Option<(String, Pos)>,
    /// The resolved base class. `None` for `Object` itself and for the
    /// non-reference builtins.
    pub base: Option<ClassId>,
    /// Own attributes in declaration order.
    pub attributes: Vec<VarId>,
    /// Own methods in declaration order.
    pub methods: Vec<MethodId>,
    /// The virtual method table: inherited slots first, own additions
    /// appended, overridden slots replaced in place.
    pub vmt: Vec<MethodId>,
    /// Object size in words, including the VMT pointer at word 0.
    pub size: i32,
    pub state: PrepState,
}

/// A variable: attribute, parameter, method local, or one of the
/// synthetic method variables (`_self`, `_base`, `_result`).
#[derive(Debug)]
pub struct VarSym {
    pub name: String,
    pub pos: Pos,
    pub ty: ClassId,
    pub is_attribute: bool,
    pub access: AccessRight,
    /// The declaring class, set for attributes (access checks).
    pub owner: Option<ClassId>,
    /// Attributes: word offset inside the object (≥ 1). Locals: positive
    /// frame offset above the saved frame pointer. Parameters and the
    /// synthetic variables: negative frame offset.
    pub offset: i32,
}

/// A method declaration.
#[derive(Debug)]
pub struct MethodSym {
    pub name: String,
    pub pos: Pos,
    /// Position of the closing `END METHOD`.
    pub end_pos: Pos,
    pub owner: ClassId,
    pub access: AccessRight,
    pub params: Vec<VarId>,
    /// `None` for void methods.
    pub ret: Option<ClassId>,
    pub locals: Vec<VarId>,
    /// Slot of this method in its class's VMT.
    pub vmt_index: usize,
    pub self_var: VarId,
    pub base_var: Option<VarId>,
    pub result_var: VarId,
    /// The lowered body; filled by semantic analysis.
    pub body: Vec<hir::Stmt>,
}

impl MethodSym {
    /// The label this method's code is emitted under.
    pub fn label(&self, decls: &Decls) -> String {
        format!("{}_{}", decls.class(self.owner).name, self.name)
    }
}

/// The declaration world: arenas plus the insertion-ordered global class
/// table (builtins first, then source classes in declaration order, so
/// everything downstream is deterministic).
#[derive(Debug, Default)]
pub struct Decls {
    classes: Vec<ClassSym>,
    vars: Vec<VarSym>,
    methods: Vec<MethodSym>,
    pub classes_by_name: IndexMap<String, ClassId>,
}

impl Decls {
    pub fn class(&self, id: ClassId) -> &ClassSym {
        &self.classes[id.0 as usize]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassSym {
        &mut self.classes[id.0 as usize]
    }

    pub fn var(&self, id: VarId) -> &VarSym {
        &self.vars[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &MethodSym {
        &self.methods[id.0 as usize]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodSym {
        &mut self.methods[id.0 as usize]
    }

    pub fn add_class(&mut self, sym: ClassSym) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(sym);
        id
    }

    pub fn add_var(&mut self, sym: VarSym) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(sym);
        id
    }

    pub fn add_method(&mut self, sym: MethodSym) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(sym);
        id
    }

    /// All classes in seeding order (builtins, then source order).
    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.classes_by_name.values().copied()
    }

    pub fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.classes_by_name.get(name).copied()
    }

    /// True for types whose values are object references (user classes
    /// plus `Object`, `Integer`, `Boolean`).
    pub fn is_reference(&self, id: ClassId) -> bool {
        self.class(id).kind == ClassKind::Reference
    }

    /// The boxed counterpart of an unboxed primitive.
    pub fn boxed(&self, id: ClassId) -> Option<ClassId> {
        match id {
            INT => Some(INTEGER),
            BOOL => Some(BOOLEAN),
            _ => None,
        }
    }

    /// The unboxed counterpart of a boxing class.
    pub fn unboxed(&self, id: ClassId) -> Option<ClassId> {
        match id {
            INTEGER => Some(INT),
            BOOLEAN => Some(BOOL),
            _ => None,
        }
    }

    /// True if `sub` is `ancestor` or transitively extends it. Primitive
    /// and pseudo types never take part in inheritance.
    pub fn extends_or_same(&self, sub: ClassId, ancestor: ClassId) -> bool {
        let mut current = sub;
        loop {
            if current == ancestor {
                return true;
            }
            match self.class(current).base {
                Some(base) => current = base,
                None => return false,
            }
        }
    }

    /// The `isA` relation:
    ///
    /// - every type is a subtype of itself;
    /// - classes are subtypes of their transitive bases (all of which
    ///   root in `Object`);
    /// - `NullType` is a subtype of every reference type;
    /// - `Int` / `Bool` are one-way subtypes of their boxing classes
    ///   (and, through them, of `Object`); the conversion itself is a
    ///   `Box` node inserted by the analyzer.
    pub fn is_subtype(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup {
            return true;
        }
        if sub == NULL_TYPE {
            return self.is_reference(sup);
        }
        let start = self.boxed(sub).unwrap_or(sub);
        self.is_reference(start) && self.is_reference(sup) && self.extends_or_same(start, sup)
    }

    /// Access-right check: may code in class `from` touch a member of
    /// class `owner` declared with `access`?
    pub fn accessible(&self, access: AccessRight, owner: ClassId, from: ClassId) -> bool {
        match access {
            AccessRight::Public => true,
            AccessRight::Protected => self.extends_or_same(from, owner),
            AccessRight::Private => from == owner,
        }
    }

    /// Searches `class` and its bases for a member named `name`.
    /// The search is innermost-first: a declaration in a derived class
    /// shadows one in a base.
    pub fn find_member(&self, class: ClassId, name: &str) -> Option<Member> {
        let mut current = Some(class);
        while let Some(id) = current {
            let sym = self.class(id);
            for &var in &sym.attributes {
                if self.var(var).name == name {
                    return Some(Member::Attribute(var));
                }
            }
            for &method in &sym.methods {
                if self.method(method).name == name {
                    return Some(Member::Method(method));
                }
            }
            current = sym.base;
        }
        None
    }

    /// The inheritance chain of `class` from the root down to the class
    /// itself (`Object` first).
    pub fn chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            chain.push(id);
            current = self.class(id).base;
        }
        chain.reverse();
        chain
    }
}

/// A member found by [`Decls::find_member`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Member {
    Attribute(VarId),
    Method(MethodId),
}
