//! 4.F C Emitter — renders the finished [`crate::session::Session`] into C
//! header, implementation, and build-manifest text.
//!
//! Grounded on `bnd-winmd/src/emit.rs`'s one-function-per-declaration-kind
//! style (`emit_struct`, `emit_enum`, `emit_delegate`, ...) and its
//! `anyhow::Result` + `tracing::debug!` texture. The teacher emits into a
//! binary WinMD writer API; this emitter produces plain C source text, so
//! only that structural shape carries over, not the `windows_metadata`
//! dependency.

mod header;
mod impl_;
mod manifest;
mod support;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::session::Session;
use crate::types::{CBuiltin, Type};

pub use manifest::render_manifest;

/// One rendered output file, relative to `Config::output_dir`.
#[derive(Debug, Clone)]
pub struct EmittedFile {
    pub relative_path: String,
    pub contents: String,
}

/// Every file this run produced, plus the manifest describing them.
#[derive(Debug, Clone)]
pub struct EmitOutput {
    pub files: Vec<EmittedFile>,
}

/// Render every binding source file's resolved output into a header/impl
/// pair, plus the run-wide build manifest, and write them under
/// `config.output_dir` (spec.md §4.F).
pub fn emit_session(session: &Session, config: &Config) -> anyhow::Result<EmitOutput> {
    let mut files = vec![
        EmittedFile {
            relative_path: "cppmm_support.h".to_string(),
            contents: support::SUPPORT_HEADER.to_string(),
        },
        EmittedFile {
            relative_path: "cppmm_support_internal.hpp".to_string(),
            contents: support::SUPPORT_INTERNAL_HEADER.to_string(),
        },
        EmittedFile {
            relative_path: "cppmm_support.cpp".to_string(),
            contents: support::SUPPORT_IMPL.to_string(),
        },
    ];

    // Deterministic order: a re-run with unchanged input produces byte-
    // identical output (spec.md §8 property 1).
    let sorted_files: BTreeMap<&String, &crate::session::OutputFile> =
        session.output.files.iter().collect();

    for (source_file, out_file) in sorted_files {
        let stem = file_stem(source_file);
        let header_name = format!("{stem}.h");
        let impl_name = format!("{stem}.cpp");

        debug!(source = %source_file, header = %header_name, "emitting header");
        let header_src = header::render_header(session, out_file, source_file, &header_name);

        debug!(source = %source_file, impl_file = %impl_name, "emitting implementation");
        let impl_src = impl_::render_impl(session, out_file, &header_name);

        files.push(EmittedFile {
            relative_path: header_name,
            contents: header_src,
        });
        files.push(EmittedFile {
            relative_path: impl_name,
            contents: impl_src,
        });
    }

    let manifest_src = manifest::render_manifest(session, config, &files);
    files.push(EmittedFile {
        relative_path: "manifest.txt".to_string(),
        contents: manifest_src,
    });

    for file in &files {
        let path = config.output_dir.join(&file.relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)?;
    }

    if config.warn_unbound {
        report_rejected_methods(session);
    }

    Ok(EmitOutput { files })
}

/// End-of-run report of every record's unmatched methods (spec.md §7,
/// gated on `--warn-unbound`).
fn report_rejected_methods(session: &Session) {
    for (owner, sigs) in &session.rejected {
        for sig in sigs {
            tracing::warn!(record = %owner, method = %sig.name, "method never matched a library declaration");
        }
    }
}

fn file_stem(source_file: &str) -> String {
    Path::new(source_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_file)
        .to_string()
}

/// The spelling of a C builtin, shared by the header and implementation
/// renderers (mirrors `types::builtin_spelling`, which is private to keep
/// the pure translator's internals off this module's public surface).
pub(crate) fn c_builtin_name(b: CBuiltin) -> &'static str {
    match b {
        CBuiltin::Void => "void",
        CBuiltin::Bool => "bool",
        CBuiltin::I8 => "int8_t",
        CBuiltin::U8 => "uint8_t",
        CBuiltin::I16 => "int16_t",
        CBuiltin::U16 => "uint16_t",
        CBuiltin::I32 => "int32_t",
        CBuiltin::U32 => "uint32_t",
        CBuiltin::I64 => "int64_t",
        CBuiltin::U64 => "uint64_t",
        CBuiltin::F32 => "float",
        CBuiltin::F64 => "double",
        CBuiltin::ISize => "intptr_t",
        CBuiltin::USize => "size_t",
        CBuiltin::String => "cppmm_string",
        CBuiltin::StringView => "cppmm_string_view",
    }
}

/// Whether a resolved type is always passed/returned through one level of
/// pointer indirection regardless of the C++-side value/reference/pointer
/// qualifiers — true for every handle-shaped C representation (an
/// `OpaquePtr` record, any `Vector`) since C can't name a value of an
/// incomplete type.
pub(crate) fn is_handle_type(session: &Session, ty: &Type) -> bool {
    match ty {
        Type::Vector(_) => true,
        // An owning `cppmm_string` is heap-allocated like any other handle;
        // `cppmm_string_view` stays a plain two-field value struct.
        Type::Primitive(CBuiltin::String) => true,
        Type::Record(qname) => session
            .output
            .get_record(qname)
            .map(|r| r.kind != crate::export::RecordKind::ValueType)
            .unwrap_or(true), // unresolved back-reference: default to the safe, opaque shape
        _ => false,
    }
}

/// Reconstruct a plausible C++ spelling for a resolved output type, for the
/// implementation renderer's `reinterpret_cast` bridging. Approximate by
/// construction — `CppQualifiedType` has long since been thrown away by the
/// time the output registry holds `Type` — but exact for every shape this
/// crate ever synthesizes (records and enums keep their original cpp-qname;
/// vectors are re-spelled as `std::vector<...>`).
pub(crate) fn cpp_type_name_for(session: &Session, ty: &Type) -> String {
    match ty {
        Type::Primitive(b) => cpp_builtin_name(*b).to_string(),
        Type::Named(n) => n.clone(),
        Type::Record(qname) => session
            .output
            .get_record(qname)
            .map(|r| r.cpp_qname.join_cpp())
            .unwrap_or_else(|| qname.join_cpp()),
        Type::Enum(qname) => session
            .output
            .enums
            .get(qname)
            .map(|e| e.cpp_qname.join_cpp())
            .unwrap_or_else(|| qname.join_cpp()),
        Type::Vector(qname) => session
            .output
            .vectors
            .get(qname)
            .map(|v| format!("std::vector<{}>", cpp_type_name_for(session, &v.element.ty)))
            .unwrap_or_else(|| "std::vector<unsigned char>".to_string()),
        Type::Unhandled => "void".to_string(),
    }
}

fn cpp_builtin_name(b: CBuiltin) -> &'static str {
    match b {
        CBuiltin::Void => "void",
        CBuiltin::Bool => "bool",
        CBuiltin::I8 => "std::int8_t",
        CBuiltin::U8 => "std::uint8_t",
        CBuiltin::I16 => "std::int16_t",
        CBuiltin::U16 => "std::uint16_t",
        CBuiltin::I32 => "std::int32_t",
        CBuiltin::U32 => "std::uint32_t",
        CBuiltin::I64 => "std::int64_t",
        CBuiltin::U64 => "std::uint64_t",
        CBuiltin::F32 => "float",
        CBuiltin::F64 => "double",
        CBuiltin::ISize => "std::intptr_t",
        CBuiltin::USize => "std::size_t",
        CBuiltin::String => "std::string",
        CBuiltin::StringView => "std::string_view",
    }
}

/// Render a fully qualified C type spelling for `qt` (spec.md §4.F: every
/// emitted signature is a plain C type, `const`/pointer included).
pub(crate) fn render_qualified_type(session: &Session, qt: &crate::types::QualifiedType) -> String {
    let base = base_type_name(session, &qt.ty);
    let mut s = if qt.is_const {
        format!("const {base}")
    } else {
        base
    };
    if is_handle_type(session, &qt.ty) || qt.is_pointer || qt.is_reference || qt.is_unique_ptr {
        s.push('*');
    }
    s
}

/// The C type's bare name with no trailing `*` — for callers building their
/// own cast target spelling (the implementation renderer's `reinterpret_cast`
/// helpers).
pub(crate) fn bare_type_name(session: &Session, ty: &Type) -> String {
    base_type_name(session, ty)
}

fn base_type_name(session: &Session, ty: &Type) -> String {
    match ty {
        Type::Primitive(b) => c_builtin_name(*b).to_string(),
        Type::Named(n) => n.clone(),
        Type::Record(qname) => session
            .output
            .get_record(qname)
            .map(|r| r.c_name.clone())
            .unwrap_or_else(|| qname.join_c(&session.namespaces)),
        Type::Enum(qname) => session
            .output
            .enums
            .get(qname)
            .map(|e| e.c_name.clone())
            .unwrap_or_else(|| qname.join_c(&session.namespaces)),
        Type::Vector(qname) => qname.name.clone(),
        Type::Unhandled => "void".to_string(),
    }
}

/// `name1, name2, ...` parameter list, C-typed (spec.md §4.F).
pub(crate) fn render_param_list(session: &Session, params: &[crate::types::Param]) -> String {
    if params.is_empty() {
        return "void".to_string();
    }
    params
        .iter()
        .map(|p| format!("{} {}", render_qualified_type(session, &p.ty), p.name))
        .collect::<Vec<_>>()
        .join(", ")
}
