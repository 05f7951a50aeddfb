//! The AST Oracle adapter — the only module that touches the `clang` crate.
//! Converts `clang::Entity`/`clang::Type` into the crate-internal,
//! libclang-independent shapes (`CppQualifiedType`, `LibraryRecord`, ...) so
//! every other module, and every unit test, is free of a live libclang
//! session (grounded on `bindscrape/src/extract.rs`'s `map_clang_type`
//! dispatch and its sonar-based declaration walk).

use clang::{Entity, EntityKind, Type as ClangType, TypeKind};
use tracing::{debug, trace};

use crate::export::MethodSignature;
use crate::library::{LibraryEnum, LibraryFunction, LibraryMethod, LibraryRecord};
use crate::qualified::QualifiedName;
use crate::types::{CppQualifiedType, CppTypeRef};

/// Flags clang args this crate always passes when parsing a binding or
/// library header, independent of user-supplied extra includes.
pub const BASE_CLANG_ARGS: &[&str] = &["-x", "c++", "-std=c++17", "-fparse-all-comments"];

/// Walk `get_semantic_parent()` to build the full namespace path for a
/// declaration. Anonymous namespaces and non-namespace parents (translation
/// unit, etc.) terminate the walk.
pub fn qualified_name_of(entity: &Entity) -> QualifiedName {
    let name = entity.get_name().unwrap_or_default();
    let mut namespaces = Vec::new();
    let mut cur = entity.get_semantic_parent();
    while let Some(parent) = cur {
        match parent.get_kind() {
            EntityKind::Namespace | EntityKind::StructDecl | EntityKind::ClassDecl => {
                if let Some(n) = parent.get_name() {
                    namespaces.push(n);
                }
                cur = parent.get_semantic_parent();
            }
            _ => break,
        }
    }
    namespaces.reverse();
    QualifiedName::new(namespaces, name)
}

/// Retrieve every `cppmm:...` annotation string attached to a declaration.
/// Recognized via `EntityKind::AnnotateAttr` children (spec.md §4.A).
pub fn annotations_of(entity: &Entity) -> Vec<String> {
    entity
        .get_children()
        .into_iter()
        .filter(|c| c.get_kind() == EntityKind::AnnotateAttr)
        .filter_map(|c| c.get_name())
        .collect()
}

/// Size and alignment, in bytes, as libclang reports them. libclang's
/// `get_sizeof`/`get_alignof` are already byte-granular; spec.md documents
/// the contract in bits for portability with wire formats that count bits
/// (bitfields, packed layouts), so the byte value is the one stored on
/// [`LibraryRecord`] and multiplied out at the point bit-granular output is
/// actually needed (the C emitter's struct layout comments), not here.
pub fn size_align_bytes_of(ty: &ClangType) -> Option<(u64, u64)> {
    let size = ty.get_sizeof().ok()?;
    let align = ty.get_alignof().ok()?;
    Some((size as u64, align as u64))
}

/// Recursively translate a raw `clang::Type` into the Oracle-boundary
/// [`CppQualifiedType`], mirroring `bindscrape`'s `map_clang_type` dispatch
/// but targeting the richer C++-aware lattice this crate needs (references,
/// `std::unique_ptr`, `std::vector`, templates) rather than a flat C lattice.
pub fn translate_clang_type(ty: &ClangType) -> CppQualifiedType {
    let is_const = ty.is_const_qualified();
    let base = match ty.get_kind() {
        TypeKind::Pointer => {
            let pointee = ty.get_pointee_type().expect("pointer has no pointee type");
            CppTypeRef::Pointer(Box::new(translate_clang_type(&pointee)))
        }
        TypeKind::LValueReference | TypeKind::RValueReference => {
            let pointee = ty.get_pointee_type().expect("reference has no pointee type");
            CppTypeRef::Reference(Box::new(translate_clang_type(&pointee)))
        }
        TypeKind::Elaborated => {
            let inner = ty.get_elaborated_type().expect("elaborated type has no inner type");
            return translate_clang_type(&inner);
        }
        TypeKind::Typedef => {
            let canonical = ty.get_canonical_type();
            return translate_clang_type(&canonical);
        }
        TypeKind::Unexposed => match class_template_specialization(ty) {
            Some(r) => r,
            None => CppTypeRef::Unknown(ty.get_display_name()),
        },
        TypeKind::Record => record_or_container_ref(ty),
        TypeKind::Enum => {
            let decl = ty.get_declaration();
            match decl {
                Some(d) => CppTypeRef::Enum(qualified_name_of(&d)),
                None => CppTypeRef::Unknown(ty.get_display_name()),
            }
        }
        _ => CppTypeRef::Builtin(builtin_spelling_of(ty)),
    };
    CppQualifiedType { base, is_const }
}

/// Recognize `std::vector<T>`, `std::unique_ptr<T>`, and `std::basic_string`
/// by their qualified declaration name, since libclang exposes them as plain
/// `Record` types with template arguments rather than a distinct `TypeKind`.
fn record_or_container_ref(ty: &ClangType) -> CppTypeRef {
    let Some(decl) = ty.get_declaration() else {
        return CppTypeRef::Unknown(ty.get_display_name());
    };
    let qname = qualified_name_of(&decl);
    let full = qname.join_cpp();

    if full == "std::basic_string" || full.starts_with("std::basic_string<") {
        return CppTypeRef::BasicString;
    }
    if full == "std::basic_string_view" || full.starts_with("std::basic_string_view<") {
        return CppTypeRef::StringView;
    }
    if let Some(elem) = single_template_arg(ty, "std::vector") {
        return CppTypeRef::Vector(Box::new(translate_clang_type(&elem)));
    }
    if let Some(elem) = single_template_arg(ty, "std::unique_ptr") {
        return CppTypeRef::UniquePtr(Box::new(translate_clang_type(&elem)));
    }

    let is_template = decl.get_kind() == EntityKind::ClassTemplate
        || ty.get_template_argument_types().is_some();
    CppTypeRef::Record { qname, is_template }
}

/// `TypeKind::Unexposed` is libclang's catch-all for dependent types inside a
/// template context; a class template specialization used inside a dependent
/// method body shows up here rather than as `TypeKind::Record`.
fn class_template_specialization(ty: &ClangType) -> Option<CppTypeRef> {
    let decl = ty.get_declaration()?;
    if decl.get_kind() != EntityKind::ClassDecl && decl.get_kind() != EntityKind::StructDecl {
        return None;
    }
    let qname = qualified_name_of(&decl);
    let args: Vec<CppQualifiedType> = ty
        .get_template_argument_types()?
        .into_iter()
        .flatten()
        .map(|a| translate_clang_type(&a))
        .collect();
    if args.is_empty() {
        return None;
    }
    Some(CppTypeRef::DependentSpecialization { base: qname, args })
}

fn single_template_arg<'tu>(ty: &ClangType<'tu>, wanted_cpp_name: &str) -> Option<ClangType<'tu>> {
    let decl = ty.get_declaration()?;
    let qname = qualified_name_of(&decl);
    if qname.join_cpp() != wanted_cpp_name && !qname.join_cpp().starts_with(wanted_cpp_name) {
        return None;
    }
    let args = ty.get_template_argument_types()?;
    args.into_iter().flatten().next()
}

fn builtin_spelling_of(ty: &ClangType) -> String {
    match ty.get_kind() {
        TypeKind::Void => "void",
        TypeKind::Bool => "_Bool",
        TypeKind::CharS | TypeKind::SChar => "char",
        TypeKind::CharU | TypeKind::UChar => "unsigned char",
        TypeKind::Short => "short",
        TypeKind::UShort => "unsigned short",
        TypeKind::Int => "int",
        TypeKind::UInt => "unsigned int",
        TypeKind::Long => "long",
        TypeKind::ULong => "unsigned long",
        TypeKind::LongLong => "long long",
        TypeKind::ULongLong => "unsigned long long",
        TypeKind::Float => "float",
        TypeKind::Double => "double",
        _ => return ty.get_display_name(),
    }
    .to_string()
}

/// Build a [`MethodSignature`] comparator from a real method entity — name,
/// ordered parameter type spellings, const/static (spec.md §4.E).
pub fn method_signature_of(entity: &Entity) -> MethodSignature {
    let name = entity.get_name().unwrap_or_default();
    let param_type_spellings = entity
        .get_arguments()
        .unwrap_or_default()
        .iter()
        .map(|a| a.get_type().map(|t| t.get_display_name()).unwrap_or_default())
        .collect();
    MethodSignature {
        name,
        param_type_spellings,
        is_const: entity.is_const_method(),
        is_static: entity.is_static_method(),
    }
}

/// Translate a method entity into the Pass-2 raw shape, including the
/// Oracle's direct classification of copy-ctor/assignment/operator/
/// conversion (spec.md §4.E "Method classification" — these are reported by
/// the Oracle, never derived downstream).
pub fn library_method_of(entity: &Entity) -> LibraryMethod {
    let signature = method_signature_of(entity);
    let fn_type = entity.get_type();
    let return_type = fn_type
        .as_ref()
        .and_then(|t| t.get_result_type())
        .map(|t| translate_clang_type(&t))
        .unwrap_or_else(|| CppQualifiedType::new(CppTypeRef::Builtin("void".to_string())));

    let params = entity
        .get_arguments()
        .unwrap_or_default()
        .iter()
        .map(|a| {
            let name = a.get_name().unwrap_or_default();
            let ty = a
                .get_type()
                .map(|t| translate_clang_type(&t))
                .unwrap_or_else(|| CppQualifiedType::new(CppTypeRef::Unknown("?".to_string())));
            (name, ty)
        })
        .collect();

    let is_operator = signature.name.starts_with("operator");
    let operator_symbol = is_operator
        .then(|| signature.name.trim_start_matches("operator").trim().to_string());
    let is_conversion_operator = entity.get_kind() == EntityKind::ConversionFunction;

    LibraryMethod {
        signature,
        params,
        return_type,
        is_constructor: entity.get_kind() == EntityKind::Constructor,
        is_copy_constructor: entity.is_copy_constructor(),
        is_copy_assignment: entity.is_copy_assignment_operator(),
        is_conversion_operator,
        is_operator,
        operator_symbol,
    }
}

/// Translate a class/struct entity (with its definition body) into a
/// [`LibraryRecord`]. `is_dependent_template`/`is_template_specialization`
/// are decided by the caller (`discover.rs`), which knows whether it reached
/// this entity via a plain `ClassDecl` walk or a `ClassTemplateSpecialization`
/// walk — the distinction isn't recoverable from the entity alone without
/// also consulting its semantic parent's template-ness.
pub fn library_record_of(
    entity: &Entity,
    is_dependent_template: bool,
    is_template_specialization: bool,
    template_args: Vec<CppQualifiedType>,
) -> LibraryRecord {
    let cpp_qname = qualified_name_of(entity);
    let size_align_bytes = if is_dependent_template || is_template_specialization {
        None
    } else {
        entity.get_type().and_then(|t| size_align_bytes_of(&t))
    };

    let mut methods = Vec::new();
    let mut fields = Vec::new();
    for child in entity.get_children() {
        match child.get_kind() {
            EntityKind::Method | EntityKind::Constructor | EntityKind::ConversionFunction => {
                methods.push(library_method_of(&child));
            }
            EntityKind::FieldDecl => {
                let name = child.get_name().unwrap_or_default();
                let ty = child
                    .get_type()
                    .map(|t| translate_clang_type(&t))
                    .unwrap_or_else(|| CppQualifiedType::new(CppTypeRef::Unknown("?".to_string())));
                fields.push((name, ty));
            }
            _ => {}
        }
    }

    trace!(record = %cpp_qname, methods = methods.len(), fields = fields.len(), "extracted library record");

    LibraryRecord {
        cpp_qname,
        is_dependent_template,
        is_template_specialization,
        template_args,
        size_align_bytes,
        methods,
        fields,
    }
}

/// Translate an enum entity into a [`LibraryEnum`].
pub fn library_enum_of(entity: &Entity) -> LibraryEnum {
    let cpp_qname = qualified_name_of(entity);
    let variants = entity
        .get_children()
        .into_iter()
        .filter(|c| c.get_kind() == EntityKind::EnumConstantDecl)
        .map(|c| {
            let name = c.get_name().unwrap_or_default();
            let (signed, _unsigned) = c.get_enum_constant_value().unwrap_or((0, 0));
            (name, signed)
        })
        .collect();
    debug!(en = %cpp_qname, "extracted library enum");
    LibraryEnum { cpp_qname, variants }
}

/// Translate a free-function entity into a [`LibraryFunction`].
pub fn library_function_of(
    entity: &Entity,
    is_template_specialization: bool,
    template_args: Vec<CppQualifiedType>,
) -> LibraryFunction {
    let cpp_qname = qualified_name_of(entity);
    let fn_type = entity.get_type();
    let return_type = fn_type
        .as_ref()
        .and_then(|t| t.get_result_type())
        .map(|t| translate_clang_type(&t))
        .unwrap_or_else(|| CppQualifiedType::new(CppTypeRef::Builtin("void".to_string())));
    let params = entity
        .get_arguments()
        .unwrap_or_default()
        .iter()
        .map(|a| {
            let name = a.get_name().unwrap_or_default();
            let ty = a
                .get_type()
                .map(|t| translate_clang_type(&t))
                .unwrap_or_else(|| CppQualifiedType::new(CppTypeRef::Unknown("?".to_string())));
            (name, ty)
        })
        .collect();
    LibraryFunction {
        cpp_qname,
        is_template_specialization,
        template_args,
        params,
        return_type,
    }
}

/// Extract the template arguments of a `using alias = base<Args...>;`
/// declaration's underlying type, for specialization registration (spec.md
/// §4.D step 6's "specialization environment").
pub fn alias_template_args(underlying: &ClangType) -> (QualifiedName, Vec<CppQualifiedType>) {
    let decl = underlying.get_declaration();
    let qname = decl
        .as_ref()
        .map(qualified_name_of)
        .unwrap_or_else(|| QualifiedName::leaf(underlying.get_display_name()));
    let args = underlying
        .get_template_argument_types()
        .into_iter()
        .flatten()
        .flatten()
        .map(|t| translate_clang_type(&t))
        .collect();
    (qname, args)
}

/// Recover the base template's formal parameter names (`T`, `N`, ...) from an
/// alias's underlying specialized type, so Pass 1 can zip them against the
/// alias's concrete arguments into the specialization's named environment
/// (spec.md §4.D step 6). `underlying`'s declaration is the instantiated
/// specialization cursor; `get_template` walks back to the primary template
/// cursor that actually carries the parameter list.
pub fn alias_template_param_names(underlying: &ClangType) -> Vec<String> {
    let Some(decl) = underlying.get_declaration() else {
        return Vec::new();
    };
    let template_decl = decl.get_template().unwrap_or(decl);
    template_decl
        .get_children()
        .into_iter()
        .filter(|c| {
            matches!(
                c.get_kind(),
                EntityKind::TemplateTypeParameter
                    | EntityKind::NonTypeTemplateParameter
                    | EntityKind::TemplateTemplateParameter
            )
        })
        .filter_map(|c| c.get_name())
        .collect()
}
