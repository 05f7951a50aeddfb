//! Raw shapes the AST Oracle reports for *real* library declarations during
//! Pass 2 — the library-header analog of `export.rs`'s intent-side shapes.
//! Kept independent of the `clang` crate so `resolve.rs` is unit-testable by
//! hand-constructing these values.

use crate::export::MethodSignature;
use crate::qualified::QualifiedName;
use crate::types::CppQualifiedType;

/// A method as actually declared on a library class.
#[derive(Debug, Clone)]
pub struct LibraryMethod {
    pub signature: MethodSignature,
    /// Parameter (name, raw type) pairs in declaration order.
    pub params: Vec<(String, CppQualifiedType)>,
    pub return_type: CppQualifiedType,
    pub is_constructor: bool,
    /// The Oracle classifies these directly (spec.md §4.E "Method
    /// classification"): copy-ctor/assignment come from its cursor-kind
    /// classifier, conversion/operator from the mangled name shape.
    pub is_copy_constructor: bool,
    pub is_copy_assignment: bool,
    pub is_conversion_operator: bool,
    pub is_operator: bool,
    pub operator_symbol: Option<String>,
}

/// A class/struct declaration found in the library headers.
#[derive(Debug, Clone)]
pub struct LibraryRecord {
    pub cpp_qname: QualifiedName,
    /// `true` when this is itself a templated (dependent) class, e.g.
    /// `template <typename T, int N> class base_vec { ... };`.
    pub is_dependent_template: bool,
    /// `true` when this is one concrete instantiation of a class template,
    /// e.g. `base_vec<float, 3>`.
    pub is_template_specialization: bool,
    /// Populated only when `is_template_specialization` is set.
    pub template_args: Vec<CppQualifiedType>,
    /// Bytes; `None` for dependent templates and specializations — the
    /// Oracle's size/align query is never invoked on those (spec.md §6).
    pub size_align_bytes: Option<(u64, u64)>,
    pub methods: Vec<LibraryMethod>,
    /// Data members in declaration order. Only consulted when the matching
    /// `ExportedRecord` is a `ValueType` (spec.md §4.C): a mirrored struct
    /// copies these fields; an opaque-ptr or opaque-bytes record ignores them.
    pub fields: Vec<(String, CppQualifiedType)>,
}

/// An enum declaration found in the library headers.
#[derive(Debug, Clone)]
pub struct LibraryEnum {
    pub cpp_qname: QualifiedName,
    pub variants: Vec<(String, i64)>,
}

/// A free function declaration found in the library headers.
#[derive(Debug, Clone)]
pub struct LibraryFunction {
    pub cpp_qname: QualifiedName,
    pub is_template_specialization: bool,
    pub template_args: Vec<CppQualifiedType>,
    pub params: Vec<(String, CppQualifiedType)>,
    pub return_type: CppQualifiedType,
}
