//! oolc-sem - Declarations and semantic analysis for Oolong.
//!
//! This crate owns the declaration world (classes, variables, methods in
//! arenas with typed indices), the scope stack used for name resolution,
//! and the analyzer that lowers the parsed AST into a typed HIR:
//!
//! 1. every class is *prepared* (base resolved, attribute offsets laid
//!    out, VMT built with override checking);
//! 2. every method body is lowered statement by statement, computing a
//!    type for each expression and inserting the implicit `Box` / `Unbox`
//!    / `Deref` conversions;
//! 3. access rights and return coverage are checked along the way.
//!
//! After [`analyze`] succeeds there are no unresolved names left: the HIR
//! refers to declarations exclusively through [`ClassId`], [`VarId`] and
//! [`MethodId`].

mod analysis;
mod builtins;
mod decls;
pub mod dump;
pub mod hir;
mod prepare;
mod scopes;

pub use analysis::{analyze, Analysis, Resolution};
pub use builtins::{BOOL, BOOLEAN, INT, INTEGER, NULL_TYPE, OBJECT, VOID};
pub use decls::{ClassId, ClassKind, ClassSym, Decls, MethodId, MethodSym, PrepState, VarId, VarSym};
pub use scopes::{DeclId, Scopes};
