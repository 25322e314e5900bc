//! Class declaration and preparation.
//!
//! Declaration registers every parsed class by name (after the builtins),
//! so that forward and mutual references between classes resolve. Each
//! class is then *prepared*, base first: its base reference is resolved,
//! attribute offsets are laid out on top of the base's size, method
//! signatures are resolved, and the VMT is built by copying the base VMT,
//! replacing overridden slots and appending new methods.
//!
//! Preparation is idempotent; a `Preparing` marker on the way down detects
//! inheritance cycles.

use oolc_par::ast;
use oolc_util::{CompileError, CompileResult, FxHashMap, FxHashSet, Pos};
use tracing::debug;

use crate::builtins::{NULL_TYPE, OBJECT, VOID};
use crate::decls::{
    ClassId, ClassKind, ClassSym, Decls, MethodId, MethodSym, PrepState, VarId, VarSym,
};

/// Registers all source classes in the global table. Returns the ast of
/// each class keyed by its new id, preserving declaration order.
pub(crate) fn declare<'a>(
    decls: &mut Decls,
    program: &'a ast::Program,
) -> CompileResult<Vec<(ClassId, &'a ast::ClassDecl)>> {
    let mut declared = Vec::with_capacity(program.classes.len());
    for class in &program.classes {
        if decls.lookup_class(&class.name.name).is_some() {
            return Err(CompileError::context(
                class.name.pos,
                format!("redeclaration of class '{}'", class.name.name),
            ));
        }
        let id = decls.add_class(ClassSym {
            name: class.name.name.clone(),
            pos: class.name.pos,
            kind: ClassKind::Reference,
            base_name: class.base.clone().map(|b| (b.name, b.pos)),
            base: None,
            attributes: Vec::new(),
            methods: Vec::new(),
            vmt: Vec::new(),
            size: 0,
            state: PrepState::Unprepared,
        });
        decls.classes_by_name.insert(class.name.name.clone(), id);
        declared.push((id, class));
    }
    Ok(declared)
}

/// Prepares `id` and, recursively, its base first.
pub(crate) fn prepare_class(
    decls: &mut Decls,
    id: ClassId,
    asts: &FxHashMap<ClassId, &ast::ClassDecl>,
) -> CompileResult<()> {
    match decls.class(id).state {
        PrepState::Prepared => return Ok(()),
        PrepState::Preparing => {
            return Err(CompileError::context(
                decls.class(id).pos,
                format!("inheritance cycle involving class '{}'", decls.class(id).name),
            ));
        }
        PrepState::Unprepared => {}
    }
    decls.class_mut(id).state = PrepState::Preparing;

    let base = resolve_base(decls, id)?;
    prepare_class(decls, base, asts)?;
    decls.class_mut(id).base = Some(base);

    let class_ast = asts[&id];
    let mut member_names = FxHashSet::default();

    layout_attributes(decls, id, class_ast, &mut member_names)?;
    let methods = resolve_methods(decls, id, class_ast, &mut member_names)?;
    build_vmt(decls, id, &methods)?;

    decls.class_mut(id).state = PrepState::Prepared;
    debug!(
        class = %decls.class(id).name,
        size = decls.class(id).size,
        vmt_slots = decls.class(id).vmt.len(),
        "prepared class"
    );
    Ok(())
}

/// Resolves the `EXTENDS` clause; a missing clause means `Object`.
fn resolve_base(decls: &Decls, id: ClassId) -> CompileResult<ClassId> {
    let class = decls.class(id);
    let Some((name, pos)) = &class.base_name else {
        return Ok(OBJECT);
    };
    let base = decls.lookup_class(name).ok_or_else(|| {
        CompileError::context(*pos, format!("undeclared identifier '{}'", name))
    })?;
    if !decls.is_reference(base) {
        return Err(CompileError::context(
            *pos,
            format!("'{}' is not a class type", name),
        ));
    }
    Ok(base)
}

/// Lays out the class's own attributes after the base's words.
fn layout_attributes(
    decls: &mut Decls,
    id: ClassId,
    class_ast: &ast::ClassDecl,
    member_names: &mut FxHashSet<String>,
) -> CompileResult<()> {
    let base = decls.class(id).base.expect("base resolved");
    let mut size = decls.class(base).size;

    let mut attributes = Vec::with_capacity(class_ast.attributes.len());
    for attr in &class_ast.attributes {
        if !member_names.insert(attr.name.name.clone()) {
            return Err(CompileError::context(
                attr.name.pos,
                format!("redeclaration of '{}'", attr.name.name),
            ));
        }
        let ty = resolve_data_type(decls, &attr.ty)?;
        let var = decls.add_var(VarSym {
            name: attr.name.name.clone(),
            pos: attr.name.pos,
            ty,
            is_attribute: true,
            access: attr.access,
            owner: Some(id),
            offset: size,
        });
        size += 1;
        attributes.push(var);
    }

    let class = decls.class_mut(id);
    class.attributes = attributes;
    class.size = size;
    Ok(())
}

/// Resolves every method signature of the class and creates the method
/// symbols, including the synthetic `_self`/`_base`/`_result` variables.
fn resolve_methods(
    decls: &mut Decls,
    id: ClassId,
    class_ast: &ast::ClassDecl,
    member_names: &mut FxHashSet<String>,
) -> CompileResult<Vec<MethodId>> {
    let base = decls.class(id).base.expect("base resolved");

    let mut methods = Vec::with_capacity(class_ast.methods.len());
    for method in &class_ast.methods {
        if !member_names.insert(method.name.name.clone()) {
            return Err(CompileError::context(
                method.name.pos,
                format!("redeclaration of '{}'", method.name.name),
            ));
        }

        let param_count = method.params.len() as i32;
        let mut params = Vec::with_capacity(method.params.len());
        for (i, param) in method.params.iter().enumerate() {
            let ty = resolve_data_type(decls, &param.ty)?;
            params.push(decls.add_var(VarSym {
                name: param.name.name.clone(),
                pos: param.name.pos,
                ty,
                is_attribute: false,
                access: ast::AccessRight::Public,
                owner: None,
                offset: -(param_count + 1) + i as i32,
            }));
        }

        let ret = method
            .ret
            .as_ref()
            .map(|r| resolve_data_type(decls, r))
            .transpose()?;

        // The three synthetic variables share the word below the last
        // parameter; `_result` overwrites `_self` when the method returns.
        let synth_offset = -(param_count + 2);
        let self_var = synthetic_var(decls, "_self", id, synth_offset);
        let base_var = Some(synthetic_var(decls, "_base", base, synth_offset));
        let result_var = synthetic_var(decls, "_result", ret.unwrap_or(VOID), synth_offset);

        methods.push(decls.add_method(MethodSym {
            name: method.name.name.clone(),
            pos: method.name.pos,
            end_pos: method.end_pos,
            owner: id,
            access: method.access,
            params,
            ret,
            locals: Vec::new(),
            vmt_index: 0,
            self_var,
            base_var,
            result_var,
            body: Vec::new(),
        }));
    }

    decls.class_mut(id).methods = methods.clone();
    Ok(methods)
}

fn synthetic_var(decls: &mut Decls, name: &str, ty: ClassId, offset: i32) -> VarId {
    decls.add_var(VarSym {
        name: name.to_string(),
        pos: Pos::DUMMY,
        ty,
        is_attribute: false,
        access: ast::AccessRight::Public,
        owner: None,
        offset,
    })
}

/// Builds the VMT: the base's table, with overridden slots replaced and
/// new methods appended.
fn build_vmt(decls: &mut Decls, id: ClassId, methods: &[MethodId]) -> CompileResult<()> {
    let base = decls.class(id).base.expect("base resolved");
    let mut vmt = decls.class(base).vmt.clone();

    for &method in methods {
        let name = decls.method(method).name.clone();
        let slot = vmt
            .iter()
            .position(|&inherited| decls.method(inherited).name == name);
        match slot {
            Some(slot) => {
                check_override(decls, vmt[slot], method)?;
                vmt[slot] = method;
                decls.method_mut(method).vmt_index = slot;
            }
            None => {
                vmt.push(method);
                decls.method_mut(method).vmt_index = vmt.len() - 1;
            }
        }
    }

    decls.class_mut(id).vmt = vmt;
    Ok(())
}

/// An override must repeat the signature exactly (same arity, same
/// parameter types in order, same return type) and must not narrow the
/// access right. Any other coincidence of names is an illegal overload.
fn check_override(decls: &Decls, inherited: MethodId, method: MethodId) -> CompileResult<()> {
    let inherited = decls.method(inherited);
    let method = decls.method(method);

    let same_signature = inherited.params.len() == method.params.len()
        && inherited
            .params
            .iter()
            .zip(&method.params)
            .all(|(&a, &b)| decls.var(a).ty == decls.var(b).ty)
        && inherited.ret == method.ret;
    if !same_signature {
        return Err(CompileError::context(
            method.pos,
            format!("illegal overload of method '{}'", method.name),
        ));
    }

    let narrows = match inherited.access {
        ast::AccessRight::Public => method.access != ast::AccessRight::Public,
        ast::AccessRight::Protected => method.access == ast::AccessRight::Private,
        ast::AccessRight::Private => false,
    };
    if narrows {
        return Err(CompileError::context(
            method.pos,
            format!(
                "override of method '{}' narrows access from {} to {}",
                method.name,
                inherited.access.keyword(),
                method.access.keyword()
            ),
        ));
    }
    Ok(())
}

/// Resolves a type name used for a variable, parameter or return type.
/// `Void` and `NullType` cannot be written in these positions.
pub(crate) fn resolve_data_type(decls: &Decls, name: &ast::Ident) -> CompileResult<ClassId> {
    let ty = decls.lookup_class(&name.name).ok_or_else(|| {
        CompileError::context(name.pos, format!("undeclared identifier '{}'", name.name))
    })?;
    if ty == VOID || ty == NULL_TYPE {
        return Err(CompileError::context(
            name.pos,
            format!("'{}' is not a legal declaration type", name.name),
        ));
    }
    Ok(ty)
}
