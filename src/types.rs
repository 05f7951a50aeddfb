//! 4.D Type Translator — a pure recursive function from a qualified C++ type
//! plus a template-argument environment to a qualified C type with
//! cast/ownership flags.
//!
//! The actual "lazy registration of nested records, enums, and container
//! specializations" the source couples into this function is factored out
//! into `resolve.rs`: `translate` here stays a pure mapping (spec.md §3's
//! "Type Translator: pure function"), and the effectful orchestration — the
//! placeholder-insertion / reentrant materialization spec.md §5 describes —
//! lives one layer up where a `Session` is actually in scope. This split is
//! what makes the dispatch table in this file unit-testable without a live
//! AST Oracle (see spec.md §9's own recommendation to "remove hidden
//! dependencies and enable test-level isolation").

use std::collections::HashMap;

use tracing::warn;

use crate::export::ExportRegistry;
use crate::qualified::QualifiedName;

/// The C primitive lattice a builtin or synthesized string/view type
/// translates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CBuiltin {
    Void,
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    ISize,
    USize,
    /// `std::basic_string` collapsed to the generated `cppmm_string` handle.
    String,
    /// `std::string_view`, passed through without ownership transfer.
    StringView,
}

impl CBuiltin {
    /// Canonicalize a clang builtin spelling, rewriting `_Bool` to `bool`
    /// (spec.md §4.D step 2).
    pub fn from_spelling(spelling: &str) -> Option<CBuiltin> {
        Some(match spelling {
            "void" => CBuiltin::Void,
            "_Bool" | "bool" => CBuiltin::Bool,
            "char" | "signed char" => CBuiltin::I8,
            "unsigned char" => CBuiltin::U8,
            "short" => CBuiltin::I16,
            "unsigned short" => CBuiltin::U16,
            "int" => CBuiltin::I32,
            "unsigned int" => CBuiltin::U32,
            "long" | "long long" => CBuiltin::I64,
            "unsigned long" | "unsigned long long" => CBuiltin::U64,
            "float" => CBuiltin::F32,
            "double" => CBuiltin::F64,
            "size_t" => CBuiltin::USize,
            "ssize_t" | "ptrdiff_t" => CBuiltin::ISize,
            _ => return None,
        })
    }
}

/// The resolved target of a translated type: either a C primitive, a
/// free-floating spelling whose downstream resolution the caller owns
/// (template-parameter substitution), or a back-reference into one of the
/// output tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(CBuiltin),
    /// A builtin-flavored name produced by template-parameter substitution
    /// (spec.md §4.D step 3) — the caller resolves it further if needed.
    Named(String),
    Record(QualifiedName),
    Enum(QualifiedName),
    Vector(QualifiedName),
    /// The translator could not map the source type; emission must fail
    /// loudly rather than silently corrupt output (spec.md §4.D step 7).
    Unhandled,
}

/// A fully resolved C-side type with ownership/cast flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedType {
    pub ty: Type,
    pub is_const: bool,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub is_unique_ptr: bool,
    pub requires_cast: bool,
}

impl QualifiedType {
    fn leaf(ty: Type, is_const: bool, requires_cast: bool) -> Self {
        QualifiedType {
            ty,
            is_const,
            is_pointer: false,
            is_reference: false,
            is_unique_ptr: false,
            requires_cast,
        }
    }
}

/// A function/method parameter. `name` may come from the library header,
/// from the binding re-declaration, or be synthesized as `_param_NN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: QualifiedType,
}

/// Raw, AST-Oracle-reported shape of a C++ type, before translation. This is
/// the boundary type unit tests construct by hand to exercise `translate`
/// without a live libclang session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppQualifiedType {
    pub base: CppTypeRef,
    pub is_const: bool,
}

impl CppQualifiedType {
    pub fn new(base: CppTypeRef) -> Self {
        CppQualifiedType {
            base,
            is_const: false,
        }
    }

    pub fn constant(base: CppTypeRef) -> Self {
        CppQualifiedType {
            base,
            is_const: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CppTypeRef {
    Pointer(Box<CppQualifiedType>),
    Reference(Box<CppQualifiedType>),
    Builtin(String),
    /// Positional index into the template environment, plus the formal
    /// parameter name for named-environment fallback.
    TemplateParam(usize, String),
    UniquePtr(Box<CppQualifiedType>),
    Vector(Box<CppQualifiedType>),
    BasicString,
    StringView,
    Record {
        qname: QualifiedName,
        is_template: bool,
    },
    Enum(QualifiedName),
    /// A dependent specialization seen inside a dependent context, e.g. the
    /// return type of a method on a template class naming another templated
    /// type.
    DependentSpecialization {
        base: QualifiedName,
        args: Vec<CppQualifiedType>,
    },
    /// Anything the dispatch table in `translate` doesn't recognize.
    Unknown(String),
}

/// The pair (positional args, named args) carried through type translation
/// when resolving a dependent context (spec.md GLOSSARY: "specialization
/// environment").
#[derive(Debug, Clone, Default)]
pub struct TemplateEnv {
    pub positional: Vec<CppQualifiedType>,
    pub named: HashMap<String, CppQualifiedType>,
}

impl TemplateEnv {
    pub fn empty() -> Self {
        TemplateEnv::default()
    }

    pub fn lookup(&self, index: usize, name: &str) -> Option<&CppQualifiedType> {
        self.positional.get(index).or_else(|| self.named.get(name))
    }
}

/// The generated c-qname suffix for synthesized `Vector` entries.
const VECTOR_SUFFIX: &str = "_vector";

/// Deterministically derive a Vector entry's c-qname from its element's
/// translated name (spec.md §8 property 5).
pub fn vector_qname_for(element_c_name: &str) -> QualifiedName {
    QualifiedName::leaf(format!("{element_c_name}{VECTOR_SUFFIX}"))
}

/// A best-effort textual spelling of a raw type, used when a bare template
/// parameter substitution needs a name to wrap (spec.md §4.D step 3).
fn spelling_of(qtype: &CppQualifiedType) -> String {
    let mut s = match &qtype.base {
        CppTypeRef::Builtin(spelling) => CBuiltin::from_spelling(spelling)
            .map(|b| builtin_spelling(b).to_string())
            .unwrap_or_else(|| spelling.clone()),
        CppTypeRef::Record { qname, .. } => qname.name.clone(),
        CppTypeRef::Enum(qname) => qname.name.clone(),
        CppTypeRef::BasicString => "cppmm_string".to_string(),
        CppTypeRef::StringView => "cppmm_string_view".to_string(),
        CppTypeRef::Pointer(inner) => format!("{}*", spelling_of(inner)),
        CppTypeRef::Reference(inner) => format!("{}&", spelling_of(inner)),
        CppTypeRef::UniquePtr(inner) => spelling_of(inner),
        CppTypeRef::Vector(inner) => format!("{}_vector", spelling_of(inner)),
        CppTypeRef::TemplateParam(_, name) => name.clone(),
        CppTypeRef::DependentSpecialization { base, .. } => base.name.clone(),
        CppTypeRef::Unknown(s) => s.clone(),
    };
    if qtype.is_const && !s.starts_with("const ") {
        s = format!("const {s}");
    }
    s
}

fn builtin_spelling(b: CBuiltin) -> &'static str {
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

/// Translate a raw AST-Oracle type into a resolved C-side [`QualifiedType`].
///
/// `specializations` gives read-only access to the frozen (post-Pass-1)
/// export tables for dependent-specialization lookup (spec.md §4.D step 6);
/// no entry in it is ever mutated by this function.
pub fn translate(
    qtype: &CppQualifiedType,
    env: &TemplateEnv,
    specializations: &ExportRegistry,
) -> QualifiedType {
    match &qtype.base {
        CppTypeRef::Pointer(inner) => {
            let mut r = translate(inner, env, specializations);
            r.is_pointer = true;
            r.is_const = qtype.is_const;
            r
        }
        CppTypeRef::Reference(inner) => {
            let mut r = translate(inner, env, specializations);
            r.is_reference = true;
            r.is_const = qtype.is_const;
            r
        }
        CppTypeRef::Builtin(spelling) => match CBuiltin::from_spelling(spelling) {
            Some(b) => QualifiedType::leaf(Type::Primitive(b), qtype.is_const, false),
            None => {
                warn!(spelling = %spelling, "unhandled builtin spelling");
                QualifiedType::leaf(Type::Unhandled, qtype.is_const, false)
            }
        },
        CppTypeRef::TemplateParam(index, name) => {
            let spelling = env
                .lookup(*index, name)
                .map(spelling_of)
                .unwrap_or_else(|| name.clone());
            QualifiedType::leaf(Type::Named(spelling), qtype.is_const, false)
        }
        CppTypeRef::UniquePtr(inner) => {
            let mut r = translate(inner, env, specializations);
            r.is_unique_ptr = true;
            r.is_const = qtype.is_const;
            r
        }
        CppTypeRef::Vector(elem) => {
            let elem_q = translate(elem, env, specializations);
            let elem_name = element_c_name(&elem_q);
            let vec_qname = vector_qname_for(&elem_name);
            QualifiedType::leaf(Type::Vector(vec_qname), qtype.is_const, true)
        }
        CppTypeRef::BasicString => {
            QualifiedType::leaf(Type::Primitive(CBuiltin::String), qtype.is_const, true)
        }
        CppTypeRef::StringView => {
            QualifiedType::leaf(Type::Primitive(CBuiltin::StringView), qtype.is_const, false)
        }
        CppTypeRef::Record { qname, .. } => {
            QualifiedType::leaf(Type::Record(qname.clone()), qtype.is_const, true)
        }
        CppTypeRef::Enum(qname) => {
            QualifiedType::leaf(Type::Enum(qname.clone()), qtype.is_const, false)
        }
        CppTypeRef::DependentSpecialization { base, args } => {
            match specializations.find_specialization(base, args) {
                Some(spec) => {
                    QualifiedType::leaf(Type::Record(QualifiedName::leaf(&spec.alias)), qtype.is_const, true)
                }
                None => {
                    warn!(base = %base, "unhandled dependent specialization: no matching using-alias registered");
                    QualifiedType::leaf(Type::Unhandled, qtype.is_const, false)
                }
            }
        }
        CppTypeRef::Unknown(spelling) => {
            warn!(spelling = %spelling, "unhandled type");
            QualifiedType::leaf(Type::Unhandled, qtype.is_const, false)
        }
    }
}

/// The c-side name a translated type would be spelled with, for Vector
/// synthesis (spec.md §8 property 5: `basic_string` collapses to
/// `cppmm_string`).
fn element_c_name(q: &QualifiedType) -> String {
    match &q.ty {
        Type::Primitive(b) => builtin_spelling(*b).to_string(),
        Type::Named(n) => n.clone(),
        Type::Record(qname) | Type::Enum(qname) | Type::Vector(qname) => qname.name.clone(),
        Type::Unhandled => "UNHANDLED".to_string(),
    }
}
