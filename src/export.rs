//! 4.C Export Registry — tables produced by Pass 1, describing the author's
//! intent. Read-only once Pass 2 begins.

use std::collections::HashMap;

use tracing::warn;

use crate::annotation::DirectiveSet;
use crate::qualified::QualifiedName;
use crate::types::CppQualifiedType;

/// C representation chosen for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ValueType,
    OpaquePtr,
    OpaqueBytes,
}

impl Default for RecordKind {
    fn default() -> Self {
        RecordKind::OpaquePtr
    }
}

impl RecordKind {
    /// Deduce the record kind from a declaration's directive set. Defaults to
    /// `OpaquePtr` (spec.md §4.C).
    pub fn from_directives(directives: &DirectiveSet) -> Self {
        if directives.value_type {
            RecordKind::ValueType
        } else if directives.opaque_bytes {
            RecordKind::OpaqueBytes
        } else {
            RecordKind::OpaquePtr
        }
    }
}

/// Signature-only comparator for matching an exported method intent against
/// a real library declaration: name + ordered parameter type spellings +
/// const/static flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub param_type_spellings: Vec<String>,
    pub is_const: bool,
    pub is_static: bool,
}

/// An intended method export.
#[derive(Debug, Clone)]
pub struct ExportedMethod {
    pub signature: MethodSignature,
    pub directives: DirectiveSet,
    pub c_name: String,
}

impl ExportedMethod {
    pub fn new(signature: MethodSignature, directives: DirectiveSet) -> Self {
        let c_name = directives
            .rename
            .clone()
            .or_else(|| directives.manual.clone())
            .unwrap_or_else(|| signature.name.clone());
        ExportedMethod {
            signature,
            directives,
            c_name,
        }
    }
}

/// An intended record export.
#[derive(Debug, Clone)]
pub struct ExportedRecord {
    pub cpp_qname: QualifiedName,
    pub c_name: String,
    pub kind: RecordKind,
    pub source_file: String,
    pub is_dependent: bool,
    pub methods: Vec<ExportedMethod>,
}

impl ExportedRecord {
    /// Linear scan for a method whose signature matches `candidate` exactly
    /// (spec.md §4.E: "linear-scan the ExportedRecord's method list for
    /// equality").
    pub fn find_method(&self, candidate: &MethodSignature) -> Option<&ExportedMethod> {
        self.methods.iter().find(|m| &m.signature == candidate)
    }
}

/// An intended enum export. First definition wins; duplicates warn.
#[derive(Debug, Clone)]
pub struct ExportedEnum {
    pub cpp_qname: QualifiedName,
    pub source_file: String,
}

/// One monomorphization of a dependent record, driven by a type-alias
/// declaration (`using vec3f = base_vec<float, 3>;`).
#[derive(Debug, Clone)]
pub struct ExportedSpecialization {
    pub base_template: QualifiedName,
    pub positional_args: Vec<CppQualifiedType>,
    pub named_args: HashMap<String, CppQualifiedType>,
    pub alias: String,
}

impl ExportedSpecialization {
    /// Exact positional-argument match against a dependent-context reference
    /// seen during translation (spec.md §4.D step 6).
    pub fn matches_args(&self, args: &[CppQualifiedType]) -> bool {
        self.positional_args.len() == args.len()
            && self
                .positional_args
                .iter()
                .zip(args)
                .all(|(a, b)| a == b)
    }
}

/// An intended free-function export.
#[derive(Debug, Clone)]
pub struct ExportedFunction {
    pub cpp_qname: QualifiedName,
    pub c_name: String,
    pub source_file: String,
    pub directives: DirectiveSet,
    /// `true` for a function template whose specializations are looked up
    /// in `ExportRegistry::specializations` keyed by `cpp_qname`.
    pub is_dependent: bool,
}

/// The exported-side view of one binding source file: pointers into the
/// export tables, plus raw `#include` lines recovered from the source text.
#[derive(Debug, Clone, Default)]
pub struct ExportedFile {
    pub records: Vec<QualifiedName>,
    pub enums: Vec<QualifiedName>,
    pub functions: Vec<QualifiedName>,
    pub raw_includes: Vec<String>,
}

/// Tables produced by Pass 1. Read-only once Pass 2 begins (the `Session`
/// enforces this by construction: Pass 2 only ever borrows `&ExportRegistry`).
#[derive(Debug, Default)]
pub struct ExportRegistry {
    pub records: HashMap<QualifiedName, ExportedRecord>,
    pub enums: HashMap<QualifiedName, ExportedEnum>,
    pub functions: HashMap<QualifiedName, ExportedFunction>,
    pub files: HashMap<String, ExportedFile>,
    /// Specializations keyed by the dependent base template's cpp-qname.
    /// Populated from `using alias = base<Args...>;` declarations, whether
    /// the base is a record or a function template.
    pub specializations: HashMap<QualifiedName, Vec<ExportedSpecialization>>,
}

impl ExportRegistry {
    /// Insert a record export. Duplicate discovery is a warning and is
    /// ignored (spec.md §3 invariants).
    pub fn insert_record(&mut self, record: ExportedRecord) {
        let qname = record.cpp_qname.clone();
        if self.records.contains_key(&qname) {
            warn!(record = %qname, "duplicate record export ignored");
            return;
        }
        self.files
            .entry(record.source_file.clone())
            .or_default()
            .records
            .push(qname.clone());
        self.records.insert(qname, record);
    }

    /// Insert an enum export; first definition wins.
    pub fn insert_enum(&mut self, en: ExportedEnum) {
        let qname = en.cpp_qname.clone();
        if self.enums.contains_key(&qname) {
            warn!(en = %qname, "duplicate enum export ignored");
            return;
        }
        self.files
            .entry(en.source_file.clone())
            .or_default()
            .enums
            .push(qname.clone());
        self.enums.insert(qname, en);
    }

    /// Insert a free-function export.
    pub fn insert_function(&mut self, func: ExportedFunction) {
        let qname = func.cpp_qname.clone();
        if self.functions.contains_key(&qname) {
            warn!(func = %qname, "duplicate function export ignored");
            return;
        }
        self.files
            .entry(func.source_file.clone())
            .or_default()
            .functions
            .push(qname.clone());
        self.functions.insert(qname, func);
    }

    /// Record a raw `#include` line recovered from a binding source file.
    pub fn add_raw_include(&mut self, file: &str, include_line: String) {
        self.files
            .entry(file.to_string())
            .or_default()
            .raw_includes
            .push(include_line);
    }

    /// Register a specialization discovered from a type-alias declaration.
    pub fn insert_specialization(&mut self, spec: ExportedSpecialization) {
        self.specializations
            .entry(spec.base_template.clone())
            .or_default()
            .push(spec);
    }

    /// Find a registered specialization of `base` matching `args` exactly.
    pub fn find_specialization(
        &self,
        base: &QualifiedName,
        args: &[CppQualifiedType],
    ) -> Option<&ExportedSpecialization> {
        self.specializations
            .get(base)?
            .iter()
            .find(|s| s.matches_args(args))
    }
}
