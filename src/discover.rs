//! The two-pass AST walk (spec.md §5). Pass 1 reads the binding declaration
//! file and harvests intended exports from the `cppmm_bind` sentinel
//! namespace into the [`crate::export::ExportRegistry`]. Pass 2 reads the
//! real library headers and matches every declaration it finds against
//! those intents, handing matches to [`crate::resolve`].
//!
//! Grounded on `bindscrape/src/extract.rs`'s one-function-per-declaration-
//! kind collection style (`collect_structs`, `collect_enums`, ...).

use std::fs;
use std::path::Path;

use clang::{Entity, EntityKind};

use crate::annotation::{self, DirectiveSet};
use crate::ast;
use crate::error::FatalError;
use crate::export::{
    ExportedEnum, ExportedFunction, ExportedMethod, ExportedRecord, ExportedSpecialization,
    RecordKind,
};
use crate::resolve;
use crate::session::Session;

/// The sentinel namespace Pass 1 looks inside (spec.md §1).
pub const SENTINEL_NAMESPACE: &str = "cppmm_bind";

/// Pass 1: walk a binding declaration file's top-level entities, descend
/// into every `cppmm_bind` namespace found (there may be more than one, e.g.
/// reopened across files), and register exports.
pub fn discover_bindings(
    session: &mut Session,
    tu_root: &Entity,
    source_file: &str,
) -> Result<(), FatalError> {
    for child in tu_root.get_children() {
        if child.get_kind() == EntityKind::Namespace
            && child.get_name().as_deref() == Some(SENTINEL_NAMESPACE)
        {
            discover_bindings_in_namespace(session, &child, source_file)?;
        }
    }
    for include in recover_raw_includes(Path::new(source_file)) {
        session.exports.add_raw_include(source_file, include);
    }
    Ok(())
}

fn discover_bindings_in_namespace(
    session: &mut Session,
    ns: &Entity,
    source_file: &str,
) -> Result<(), FatalError> {
    for entity in ns.get_children() {
        match entity.get_kind() {
            EntityKind::ClassDecl | EntityKind::StructDecl | EntityKind::ClassTemplate => {
                if let Some(record) = pass1_record(&entity, source_file, &session.namespaces)? {
                    session.exports.insert_record(record);
                }
            }
            EntityKind::EnumDecl => {
                let cpp_qname = ast::qualified_name_of(&entity);
                session.exports.insert_enum(ExportedEnum {
                    cpp_qname,
                    source_file: source_file.to_string(),
                });
            }
            EntityKind::FunctionDecl | EntityKind::FunctionTemplate => {
                if let Some(func) = pass1_function(&entity, source_file, &session.namespaces)? {
                    session.exports.insert_function(func);
                }
            }
            EntityKind::TypedefDecl | EntityKind::TypeAliasDecl => {
                if let Some(spec) = pass1_alias(&entity)? {
                    session.exports.insert_specialization(spec);
                }
            }
            EntityKind::Namespace => {
                discover_bindings_in_namespace(session, &entity, source_file)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn pass1_record(
    entity: &Entity,
    source_file: &str,
    namespaces: &crate::namespace::NamespaceRegistry,
) -> Result<Option<ExportedRecord>, FatalError> {
    let directives = directives_of(entity)?;
    if directives.ignore {
        return Ok(None);
    }
    let cpp_qname = ast::qualified_name_of(entity);
    let c_name = directives
        .rename
        .clone()
        .unwrap_or_else(|| cpp_qname.join_c(namespaces));
    let kind = RecordKind::from_directives(&directives);
    let is_dependent = entity.get_kind() == EntityKind::ClassTemplate;

    if kind == RecordKind::OpaqueBytes && is_dependent {
        return Err(FatalError::OpaqueBytesOnDependentTemplate(cpp_qname));
    }

    let mut methods = Vec::new();
    for child in entity.get_children() {
        if !matches!(
            child.get_kind(),
            EntityKind::Method | EntityKind::Constructor | EntityKind::ConversionFunction
        ) {
            continue;
        }
        let method_directives = directives_of(&child)?;
        let signature = ast::method_signature_of(&child);
        methods.push(ExportedMethod::new(signature, method_directives));
    }

    Ok(Some(ExportedRecord {
        cpp_qname,
        c_name,
        kind,
        source_file: source_file.to_string(),
        is_dependent,
        methods,
    }))
}

fn pass1_function(
    entity: &Entity,
    source_file: &str,
    namespaces: &crate::namespace::NamespaceRegistry,
) -> Result<Option<ExportedFunction>, FatalError> {
    let directives = directives_of(entity)?;
    if directives.ignore {
        return Ok(None);
    }
    let cpp_qname = ast::qualified_name_of(entity);
    let c_name = directives
        .rename
        .clone()
        .or_else(|| directives.manual.clone())
        .unwrap_or_else(|| cpp_qname.join_c(namespaces));
    let is_dependent = entity.get_kind() == EntityKind::FunctionTemplate;
    Ok(Some(ExportedFunction {
        cpp_qname,
        c_name,
        source_file: source_file.to_string(),
        directives,
        is_dependent,
    }))
}

/// `using alias = base_template<Args...>;` registers a specialization of a
/// dependent record or function template (spec.md §4.D step 6). Every
/// positional argument must be a builtin — a non-builtin argument can't be
/// spelled in the generated C header and is a configuration error.
fn pass1_alias(entity: &Entity) -> Result<Option<ExportedSpecialization>, FatalError> {
    let Some(alias) = entity.get_name() else {
        return Ok(None);
    };
    let Some(underlying) = entity.get_typedef_underlying_type() else {
        return Ok(None);
    };
    let (base_template, positional_args) = ast::alias_template_args(&underlying);
    if positional_args.is_empty() {
        return Ok(None); // a plain rename, not a template specialization
    }
    for arg in &positional_args {
        if !matches!(arg.base, crate::types::CppTypeRef::Builtin(_)) {
            return Err(FatalError::NonBuiltinTemplateArgument {
                alias,
                spelling: format!("{:?}", arg.base),
            });
        }
    }
    // Align the alias's concrete args with the base template's formal
    // parameter names so `TemplateEnv::lookup`'s named fallback has data to
    // use, not just positional indices.
    let param_names = ast::alias_template_param_names(&underlying);
    let named_args = param_names
        .into_iter()
        .zip(positional_args.iter().cloned())
        .collect();
    Ok(Some(ExportedSpecialization {
        base_template,
        positional_args,
        named_args,
        alias,
    }))
}

fn directives_of(entity: &Entity) -> Result<DirectiveSet, FatalError> {
    let raws = ast::annotations_of(entity);
    let parsed = annotation::parse_all(&raws)?;
    Ok(DirectiveSet::from_directives(&parsed))
}

/// Recover `#include` lines verbatim from the binding source file's text, so
/// the C emitter can reproduce the author's original includes rather than
/// reconstructing them from the resolved type graph (spec.md §3 invariants).
fn recover_raw_includes(path: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("#include"))
        .map(str::to_string)
        .collect()
}

/// Pass 2: walk a library header's real declarations and match each one
/// against the exports harvested in Pass 1.
pub fn discover_library(session: &mut Session, tu_root: &Entity, source_file: &str) {
    walk_library(session, tu_root, source_file);
}

fn walk_library(session: &mut Session, entity: &Entity, source_file: &str) {
    for child in entity.get_children() {
        match child.get_kind() {
            EntityKind::ClassDecl | EntityKind::StructDecl => {
                if !child.is_definition() {
                    continue;
                }
                let lib = ast::library_record_of(&child, false, false, Vec::new());
                resolve::resolve_record(session, &lib, source_file);
                walk_library(session, &child, source_file);
            }
            EntityKind::ClassTemplate => {
                if !child.is_definition() {
                    continue;
                }
                let lib = ast::library_record_of(&child, true, false, Vec::new());
                resolve::resolve_record(session, &lib, source_file);
            }
            EntityKind::ClassTemplateSpecialization | EntityKind::ClassTemplatePartialSpecialization => {
                if !child.is_definition() {
                    continue;
                }
                let args = child
                    .get_type()
                    .and_then(|t| t.get_template_argument_types())
                    .into_iter()
                    .flatten()
                    .flatten()
                    .map(|t| ast::translate_clang_type(&t))
                    .collect();
                let lib = ast::library_record_of(&child, false, true, args);
                resolve::resolve_record(session, &lib, source_file);
            }
            EntityKind::EnumDecl => {
                let lib = ast::library_enum_of(&child);
                resolve::resolve_enum(session, &lib, source_file);
            }
            EntityKind::FunctionDecl => {
                let lib = ast::library_function_of(&child, false, Vec::new());
                resolve::resolve_function(session, &lib, source_file);
            }
            EntityKind::FunctionTemplate => {
                // Matched only through its concrete specializations, which
                // libclang does not instantiate unless referenced; nothing
                // to resolve for the uninstantiated template itself.
            }
            EntityKind::Namespace => {
                walk_library(session, &child, source_file);
            }
            _ => {}
        }
    }
}
