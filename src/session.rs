//! Output Registry (records/enums/functions/vectors resolved by Pass 2) and
//! the `Session` that bundles every registry the pipeline touches.
//!
//! spec.md §9's Design Notes call out the source's mutable global registries
//! as the thing a reimplementation should fix by "bundling these into a
//! single Session context passed by reference through Pass 1 and Pass 2";
//! this module is that bundle.

use std::collections::HashMap;

use crate::export::{ExportRegistry, MethodSignature, RecordKind};
use crate::namespace::NamespaceRegistry;
use crate::qualified::QualifiedName;
use crate::types::{Param, QualifiedType};

/// A `ValueType` record's field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: QualifiedType,
}

/// A resolved free function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub cpp_qname: QualifiedName,
    pub c_name: String,
    pub return_type: QualifiedType,
    pub params: Vec<Param>,
    pub source_file: String,
}

/// `Function` extended with the flags spec.md §3 lists for methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub func: Function,
    pub is_const: bool,
    pub is_static: bool,
    pub is_constructor: bool,
    pub is_copy_constructor: bool,
    pub is_copy_assignment: bool,
    pub is_operator: bool,
    pub is_conversion_operator: bool,
    pub operator_symbol: Option<String>,
}

impl Method {
    /// Copy-constructor/assignment's first parameter name is rewritten to
    /// `other` — the AST Oracle omits it (spec.md §3 invariants).
    pub fn rename_copy_param(&mut self) {
        if (self.is_copy_constructor || self.is_copy_assignment) && !self.func.params.is_empty() {
            self.func.params[0].name = "other".to_string();
        }
    }
}

/// Whether a Record entry is a reentrancy placeholder or fully resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializationState {
    Placeholder,
    Complete,
}

/// The output-side resolved entry for a record.
#[derive(Debug, Clone)]
pub struct Record {
    pub cpp_qname: QualifiedName,
    pub c_name: String,
    pub kind: RecordKind,
    pub fields: Vec<Field>,
    /// Keyed by c-name; first insertion wins on collision (spec.md §4.E).
    pub methods: HashMap<String, Method>,
    /// Absent for specializations — the AST Oracle's size/alignment metrics
    /// aren't reliably invoked on a template instantiation (spec.md §3).
    pub size: Option<u64>,
    pub align: Option<u64>,
    pub template_args: Vec<QualifiedType>,
    pub state: MaterializationState,
}

impl Record {
    fn placeholder(cpp_qname: QualifiedName, c_name: String, kind: RecordKind) -> Self {
        Record {
            cpp_qname,
            c_name,
            kind,
            fields: Vec::new(),
            methods: HashMap::new(),
            size: None,
            align: None,
            template_args: Vec::new(),
            state: MaterializationState::Placeholder,
        }
    }

    /// Insert a resolved method, keyed by c-name. First wins; a second
    /// method landing on the same c-name is the overload-collision the
    /// author must resolve via `cppmm:rename` (spec.md §9).
    pub fn insert_method(&mut self, method: Method) -> bool {
        if self.methods.contains_key(&method.func.c_name) {
            false
        } else {
            self.methods.insert(method.func.c_name.clone(), method);
            true
        }
    }
}

/// A resolved enum: (name, value) pairs copied from the library declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub cpp_qname: QualifiedName,
    pub c_name: String,
    pub variants: Vec<(String, i64)>,
    pub source_file: String,
}

/// A synthesized container entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vector {
    pub c_qname: QualifiedName,
    pub element: QualifiedType,
}

/// The output-side view of one binding source file: pointers into the
/// resolved Record/Enum/Function tables.
#[derive(Debug, Clone, Default)]
pub struct OutputFile {
    pub records: Vec<QualifiedName>,
    pub enums: Vec<QualifiedName>,
    pub functions: Vec<QualifiedName>,
    pub vectors: Vec<QualifiedName>,
    /// Signatures matched to a `cppmm:manual` declaration: the header still
    /// declares them so callers can link against them, but no implementation
    /// is generated — the body is the author's responsibility, out of scope
    /// for this pipeline (spec.md §4.A).
    pub manual: Vec<Function>,
}

/// Tables filled during Pass 2. Append-only: entries are never removed or
/// mutated after being marked `Complete` — subsequent lookups return the
/// existing entry unchanged. This is how recursion through nested types
/// terminates (spec.md §5).
#[derive(Debug, Default)]
pub struct OutputRegistry {
    pub records: HashMap<QualifiedName, Record>,
    pub enums: HashMap<QualifiedName, Enum>,
    pub functions: HashMap<QualifiedName, Function>,
    pub vectors: HashMap<QualifiedName, Vector>,
    pub files: HashMap<String, OutputFile>,
}

impl OutputRegistry {
    /// Look up a finished record.
    pub fn get_record(&self, qname: &QualifiedName) -> Option<&Record> {
        self.records.get(qname)
    }

    /// Reentrant record materialization (spec.md §5): if `qname` is already
    /// present (placeholder or complete), return `false` and leave it
    /// untouched — the caller must not re-descend into members. Otherwise
    /// insert a placeholder and return `true` so the caller proceeds to
    /// populate it.
    pub fn begin_record(&mut self, qname: &QualifiedName, c_name: &str, kind: RecordKind) -> bool {
        if self.records.contains_key(qname) {
            return false;
        }
        self.records.insert(
            qname.clone(),
            Record::placeholder(qname.clone(), c_name.to_string(), kind),
        );
        true
    }

    /// Mark a placeholder complete after its members have been populated.
    pub fn complete_record(&mut self, qname: &QualifiedName) {
        if let Some(r) = self.records.get_mut(qname) {
            r.state = MaterializationState::Complete;
        }
    }

    pub fn insert_enum(&mut self, en: Enum) {
        self.enums.entry(en.cpp_qname.clone()).or_insert(en);
    }

    pub fn insert_function(&mut self, func: Function) {
        self.functions.entry(func.cpp_qname.clone()).or_insert(func);
    }

    /// Register a Vector entry, deduplicated by element c-qname (spec.md §3
    /// invariants, §8 property 5).
    pub fn get_or_insert_vector(&mut self, c_qname: QualifiedName, element: QualifiedType) -> QualifiedName {
        self.vectors
            .entry(c_qname.clone())
            .or_insert(Vector { c_qname: c_qname.clone(), element });
        c_qname
    }

    pub fn file_mut(&mut self, filename: &str) -> &mut OutputFile {
        self.files.entry(filename.to_string()).or_default()
    }
}

/// Bundles every registry and piece of session-wide configuration the
/// pipeline touches, passed by reference through Pass 1 and Pass 2. Replaces
/// the source's process-wide mutable globals (spec.md §9).
#[derive(Debug, Default)]
pub struct Session {
    pub namespaces: NamespaceRegistry,
    pub exports: ExportRegistry,
    pub output: OutputRegistry,
    /// Rejected (unmatched) method signatures, keyed by the owning record's
    /// cpp-qname, surfaced as a single end-of-run report when
    /// `warn_unbound` is set (spec.md §4.E, §7).
    pub rejected: HashMap<QualifiedName, Vec<MethodSignature>>,
    pub warn_unbound: bool,
}

impl Session {
    pub fn new(namespaces: NamespaceRegistry, warn_unbound: bool) -> Self {
        Session {
            namespaces,
            exports: ExportRegistry::default(),
            output: OutputRegistry::default(),
            rejected: HashMap::new(),
            warn_unbound,
        }
    }

    pub fn reject_method(&mut self, owner: &QualifiedName, sig: MethodSignature) {
        self.rejected.entry(owner.clone()).or_default().push(sig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CBuiltin, Type};

    fn qtype(ty: Type) -> QualifiedType {
        QualifiedType {
            ty,
            is_const: false,
            is_pointer: false,
            is_reference: false,
            is_unique_ptr: false,
            requires_cast: false,
        }
    }

    #[test]
    fn begin_record_placeholder_then_complete() {
        let mut out = OutputRegistry::default();
        let qname = QualifiedName::new(vec!["OIIO".into()], "ImageSpec");
        assert!(out.begin_record(&qname, "OIIO_ImageSpec", RecordKind::OpaquePtr));
        assert_eq!(
            out.get_record(&qname).unwrap().state,
            MaterializationState::Placeholder
        );
        // Reentrant lookup while still a placeholder returns false (already present).
        assert!(!out.begin_record(&qname, "OIIO_ImageSpec", RecordKind::OpaquePtr));
        out.complete_record(&qname);
        assert_eq!(
            out.get_record(&qname).unwrap().state,
            MaterializationState::Complete
        );
    }

    #[test]
    fn vector_dedup_by_element_c_qname() {
        let mut out = OutputRegistry::default();
        let c_qname = QualifiedName::leaf("int32_t_vector");
        let elem = qtype(Type::Primitive(CBuiltin::I32));
        out.get_or_insert_vector(c_qname.clone(), elem.clone());
        out.get_or_insert_vector(c_qname.clone(), elem);
        assert_eq!(out.vectors.len(), 1);
    }

    #[test]
    fn insert_method_first_wins_on_c_name_collision() {
        use crate::annotation::DirectiveSet;
        let mut record = Record::placeholder(
            QualifiedName::leaf("Foo"),
            "Foo".to_string(),
            RecordKind::OpaquePtr,
        );
        let make = |name: &str| Method {
            func: Function {
                cpp_qname: QualifiedName::leaf(name),
                c_name: "Foo_bar".to_string(),
                return_type: qtype(Type::Primitive(CBuiltin::Void)),
                params: vec![],
                source_file: "a.hpp".to_string(),
            },
            is_const: false,
            is_static: false,
            is_constructor: false,
            is_copy_constructor: false,
            is_copy_assignment: false,
            is_operator: false,
            is_conversion_operator: false,
            operator_symbol: None,
        };
        let _ = DirectiveSet::default();
        assert!(record.insert_method(make("bar")));
        assert!(!record.insert_method(make("bar2")));
        assert_eq!(
            record.methods["Foo_bar"].func.cpp_qname,
            QualifiedName::leaf("bar")
        );
    }

    #[test]
    fn copy_constructor_param_renamed_to_other() {
        let mut m = Method {
            func: Function {
                cpp_qname: QualifiedName::leaf("ImageSpec"),
                c_name: "OIIO_ImageSpec_copy".to_string(),
                return_type: qtype(Type::Primitive(CBuiltin::Void)),
                params: vec![Param {
                    name: "_param_0".to_string(),
                    ty: qtype(Type::Record(QualifiedName::leaf("ImageSpec"))),
                }],
                source_file: "a.hpp".to_string(),
            },
            is_const: false,
            is_static: false,
            is_constructor: true,
            is_copy_constructor: true,
            is_copy_assignment: false,
            is_operator: false,
            is_conversion_operator: false,
            operator_symbol: None,
        };
        m.rename_copy_param();
        assert_eq!(m.func.params[0].name, "other");
    }
}
