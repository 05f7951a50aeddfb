//! 4.E Matcher/Resolver — the Pass 2 AST walk. Pairs each library
//! declaration with an export-registry entry, invokes the Type Translator
//! for its signature, and populates the output registry.

use tracing::warn;

use crate::export::RecordKind;
use crate::library::{LibraryEnum, LibraryFunction, LibraryMethod, LibraryRecord};
use crate::qualified::QualifiedName;
use crate::session::{Enum, Field, Function, Method, Session};
use crate::types::{translate, CppQualifiedType, CppTypeRef, Param, QualifiedType, TemplateEnv, Type};

/// Translate a raw type and, if it bottoms out in a synthesized `Vector`,
/// register that vector's element type in the output registry — `translate`
/// itself stays pure and cannot reach `session.output` (spec.md §4.D's
/// note that lazy registration is factored out one layer up).
fn translate_and_register(
    session: &mut Session,
    raw: &CppQualifiedType,
    env: &TemplateEnv,
    source_file: &str,
) -> crate::types::QualifiedType {
    let translated = translate(raw, env, &session.exports);
    if let Type::Vector(ref vqname) = translated.ty {
        if let Some(elem_raw) = find_vector_elem(raw) {
            let elem_q = translate(elem_raw, env, &session.exports);
            session.output.get_or_insert_vector(vqname.clone(), elem_q);
        }
        let file = session.output.file_mut(source_file);
        if !file.vectors.contains(vqname) {
            file.vectors.push(vqname.clone());
        }
    }
    translated
}

/// Unwrap the indirection layers `translate` sees through (pointer,
/// reference, unique_ptr) to find the element type of a `Vector` node whose
/// translated result is `Type::Vector`.
fn find_vector_elem(raw: &CppQualifiedType) -> Option<&CppQualifiedType> {
    match &raw.base {
        CppTypeRef::Vector(elem) => Some(elem),
        CppTypeRef::Pointer(inner) | CppTypeRef::Reference(inner) | CppTypeRef::UniquePtr(inner) => {
            find_vector_elem(inner)
        }
        _ => None,
    }
}

/// Resolve one library record declaration (spec.md §4.E "Records").
pub fn resolve_record(session: &mut Session, lib: &LibraryRecord, source_file: &str) {
    let Some(exported) = session.exports.records.get(&lib.cpp_qname).cloned() else {
        return; // the author did not ask for it
    };

    if lib.is_dependent_template {
        let specs = session
            .exports
            .specializations
            .get(&lib.cpp_qname)
            .cloned()
            .unwrap_or_default();
        for spec in specs {
            resolve_specialization(session, &exported, lib, &spec, source_file);
        }
        return;
    }

    if lib.is_template_specialization {
        // Expect it was already materialized via the type-alias path.
        let found = session
            .exports
            .specializations
            .get(&lib.cpp_qname)
            .and_then(|specs| specs.iter().find(|s| s.matches_args(&lib.template_args)).cloned());
        match found {
            Some(spec) => {
                let key = QualifiedName::leaf(&spec.alias);
                if session.output.get_record(&key).is_none() {
                    warn!(base = %lib.cpp_qname, alias = %spec.alias, "specialization matched but not yet materialized");
                }
            }
            None => {
                warn!(base = %lib.cpp_qname, "concrete template specialization with no registered using-alias");
            }
        }
        return;
    }

    // Ordinary concrete (non-template) record.
    let out_qname = lib.cpp_qname.clone();
    if !session
        .output
        .begin_record(&out_qname, &exported.c_name, exported.kind)
    {
        return; // already materialized — cycle break
    }

    if exported.kind == RecordKind::ValueType {
        let fields: Vec<Field> = lib
            .fields
            .iter()
            .map(|(name, ty)| Field {
                name: name.clone(),
                ty: translate_and_register(session, ty, &TemplateEnv::empty(), source_file),
            })
            .collect();
        if let Some(bad) = fields.iter().find(|f| f.ty.ty == Type::Unhandled) {
            warn!(record = %out_qname, field = %bad.name, "ValueType field is not plain data; dropping record");
            session.output.records.remove(&out_qname);
            return;
        }
        if let Some(r) = session.output.records.get_mut(&out_qname) {
            r.fields = fields;
        }
    }

    materialize_methods(
        session,
        &exported.cpp_qname,
        &exported,
        &lib.methods,
        &out_qname,
        &TemplateEnv::empty(),
        source_file,
    );

    if let Some(r) = session.output.records.get_mut(&out_qname) {
        r.size = lib.size_align_bytes.map(|(s, _)| s);
        r.align = lib.size_align_bytes.map(|(_, a)| a);
    }
    session.output.complete_record(&out_qname);
    session.output.file_mut(source_file).records.push(out_qname);
}

/// Monomorphize one specialization of a dependent record (spec.md §4.E
/// "Method monomorphization").
fn resolve_specialization(
    session: &mut Session,
    exported: &crate::export::ExportedRecord,
    lib: &LibraryRecord,
    spec: &crate::export::ExportedSpecialization,
    source_file: &str,
) {
    let out_qname = QualifiedName::leaf(&spec.alias);
    if !session.output.begin_record(&out_qname, &spec.alias, exported.kind) {
        return;
    }

    let env = TemplateEnv {
        positional: spec.positional_args.clone(),
        named: spec.named_args.clone(),
    };

    let template_args = spec
        .positional_args
        .iter()
        .map(|a| translate(a, &TemplateEnv::empty(), &session.exports))
        .collect();

    materialize_methods(
        session,
        &exported.cpp_qname,
        exported,
        &lib.methods,
        &out_qname,
        &env,
        source_file,
    );

    if let Some(r) = session.output.records.get_mut(&out_qname) {
        r.template_args = template_args;
        // size/align intentionally left None — unreliable for specializations.
    }
    session.output.complete_record(&out_qname);
    session.output.file_mut(source_file).records.push(out_qname);
}

/// Walk a library record's methods, matching each against the exported
/// record's intended method list and translating matches into the output
/// record. Unmatched methods are appended to the per-record rejected list.
fn materialize_methods(
    session: &mut Session,
    reject_owner: &QualifiedName,
    exported: &crate::export::ExportedRecord,
    lib_methods: &[LibraryMethod],
    out_qname: &QualifiedName,
    env: &TemplateEnv,
    source_file: &str,
) {
    for lm in lib_methods {
        match exported.find_method(&lm.signature) {
            None => session.reject_method(reject_owner, lm.signature.clone()),
            Some(em) => {
                if em.directives.ignore {
                    continue; // matched but intentionally dropped, and not rejected
                }
                let method = translate_method(session, lm, em, env, out_qname, source_file);
                if em.directives.manual.is_some() {
                    session.output.file_mut(source_file).manual.push(method.func);
                } else if let Some(r) = session.output.records.get_mut(out_qname) {
                    r.insert_method(method);
                }
            }
        }
    }
}

fn translate_method(
    session: &mut Session,
    lib: &LibraryMethod,
    exported: &crate::export::ExportedMethod,
    env: &TemplateEnv,
    owner_qname: &QualifiedName,
    source_file: &str,
) -> Method {
    // A method's c-name needs the same full-path prefix a free function gets
    // via `join_c` — otherwise two bound records exposing a same-named
    // method collide into identical C symbols (spec.md §6).
    let record_c_name = session
        .output
        .get_record(owner_qname)
        .map(|r| r.c_name.clone())
        .unwrap_or_else(|| owner_qname.join_c(&session.namespaces));
    let c_name = format!("{record_c_name}_{}", exported.c_name);

    let params: Vec<Param> = lib
        .params
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| {
            let pname = if name.is_empty() {
                format!("_param_{i}")
            } else {
                name.clone()
            };
            Param {
                name: pname,
                ty: translate_and_register(session, ty, env, source_file),
            }
        })
        .collect();

    // Clang reports no return type for a constructor entity (it has none in
    // C++); the generated function "returns" a fresh owning handle to the
    // record instead, so override rather than trust `lib.return_type`.
    let return_type = if lib.is_constructor {
        QualifiedType {
            ty: Type::Record(owner_qname.clone()),
            is_const: false,
            is_pointer: false,
            is_reference: false,
            is_unique_ptr: false,
            requires_cast: true,
        }
    } else {
        translate_and_register(session, &lib.return_type, env, source_file)
    };

    let func = Function {
        cpp_qname: QualifiedName::new(vec![owner_qname.name.clone()], lib.signature.name.clone()),
        c_name,
        return_type,
        params,
        source_file: source_file.to_string(),
    };

    let mut method = Method {
        func,
        is_const: lib.signature.is_const,
        is_static: lib.signature.is_static,
        is_constructor: lib.is_constructor,
        is_copy_constructor: lib.is_copy_constructor,
        is_copy_assignment: lib.is_copy_assignment,
        is_operator: lib.is_operator,
        is_conversion_operator: lib.is_conversion_operator,
        operator_symbol: lib.operator_symbol.clone(),
    };
    method.rename_copy_param();
    method
}

/// Resolve a library enum declaration (spec.md §4.E "Enums").
pub fn resolve_enum(session: &mut Session, lib: &LibraryEnum, source_file: &str) {
    if session.exports.enums.get(&lib.cpp_qname).is_none() {
        return;
    }
    let c_name = lib.cpp_qname.join_c(&session.namespaces);
    session.output.insert_enum(Enum {
        cpp_qname: lib.cpp_qname.clone(),
        c_name,
        variants: lib.variants.clone(),
        source_file: source_file.to_string(),
    });
    session
        .output
        .file_mut(source_file)
        .enums
        .push(lib.cpp_qname.clone());
}

/// Resolve a library free-function declaration (spec.md §4.E "Free
/// functions"). Parameter naming prefers the library's name, then the
/// binding re-declaration's positional name, then `_param_NN` — handled one
/// layer up in discovery, where the binding re-declaration is visible; here
/// `lib.params` names are already the best available name or empty.
pub fn resolve_function(session: &mut Session, lib: &LibraryFunction, source_file: &str) {
    if lib.is_template_specialization {
        let Some(spec) = session
            .exports
            .specializations
            .get(&lib.cpp_qname)
            .and_then(|specs| specs.iter().find(|s| s.matches_args(&lib.template_args)).cloned())
        else {
            warn!(func = %lib.cpp_qname, "function specialization with no matching using-alias");
            return;
        };
        let Some(exported) = session.exports.functions.get(&lib.cpp_qname).cloned() else {
            return;
        };
        if exported.directives.ignore {
            return;
        }
        let env = TemplateEnv {
            positional: spec.positional_args.clone(),
            named: spec.named_args.clone(),
        };
        let func = build_function(session, lib, &spec.alias, &env, source_file);
        if exported.directives.manual.is_some() {
            session.output.file_mut(source_file).manual.push(func);
            return;
        }
        session.output.insert_function(func);
        session
            .output
            .file_mut(source_file)
            .functions
            .push(lib.cpp_qname.clone());
        return;
    }

    let Some(exported) = session.exports.functions.get(&lib.cpp_qname).cloned() else {
        return;
    };
    if exported.directives.ignore {
        return;
    }
    let func = build_function(session, lib, &exported.c_name, &TemplateEnv::empty(), source_file);
    if exported.directives.manual.is_some() {
        session.output.file_mut(source_file).manual.push(func);
        return;
    }
    session.output.insert_function(func);
    session
        .output
        .file_mut(source_file)
        .functions
        .push(lib.cpp_qname.clone());
}

fn build_function(
    session: &mut Session,
    lib: &LibraryFunction,
    c_name: &str,
    env: &TemplateEnv,
    source_file: &str,
) -> Function {
    let params = lib
        .params
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| {
            let pname = if name.is_empty() {
                format!("_param_{i}")
            } else {
                name.clone()
            };
            Param {
                name: pname,
                ty: translate_and_register(session, ty, env, source_file),
            }
        })
        .collect();
    let return_type = translate_and_register(session, &lib.return_type, env, source_file);
    Function {
        cpp_qname: lib.cpp_qname.clone(),
        c_name: c_name.to_string(),
        return_type,
        params,
        source_file: source_file.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::DirectiveSet;
    use crate::export::{ExportedMethod, ExportedRecord, ExportedSpecialization, MethodSignature};
    use crate::namespace::NamespaceRegistry;
    use crate::types::{CppQualifiedType, CppTypeRef};
    use std::collections::HashMap;

    fn session() -> Session {
        Session::new(NamespaceRegistry::default(), false)
    }

    fn sig(name: &str) -> MethodSignature {
        MethodSignature {
            name: name.to_string(),
            param_type_spellings: vec![],
            is_const: false,
            is_static: false,
        }
    }

    #[test]
    fn unexported_record_is_skipped_silently() {
        let mut s = session();
        let lib = LibraryRecord {
            cpp_qname: QualifiedName::leaf("Unwanted"),
            is_dependent_template: false,
            is_template_specialization: false,
            template_args: vec![],
            size_align_bytes: Some((8, 8)),
            methods: vec![],
            fields: vec![],
        };
        resolve_record(&mut s, &lib, "a.hpp");
        assert!(s.output.records.is_empty());
    }

    #[test]
    fn matched_method_is_translated_and_unmatched_is_rejected() {
        let mut s = session();
        let qname = QualifiedName::leaf("ImageSpec");
        s.exports.insert_record(ExportedRecord {
            cpp_qname: qname.clone(),
            c_name: "OIIO_ImageSpec".to_string(),
            kind: RecordKind::OpaquePtr,
            source_file: "a.hpp".to_string(),
            is_dependent: false,
            methods: vec![ExportedMethod::new(sig("channel_bytes"), DirectiveSet::default())],
        });

        let lib = LibraryRecord {
            cpp_qname: qname.clone(),
            is_dependent_template: false,
            is_template_specialization: false,
            template_args: vec![],
            size_align_bytes: Some((8, 8)),
            methods: vec![
                LibraryMethod {
                    signature: sig("channel_bytes"),
                    params: vec![],
                    return_type: CppQualifiedType::new(CppTypeRef::Builtin("unsigned long".into())),
                    is_constructor: false,
                    is_copy_constructor: false,
                    is_copy_assignment: false,
                    is_conversion_operator: false,
                    is_operator: false,
                    operator_symbol: None,
                },
                LibraryMethod {
                    signature: sig("unwanted_method"),
                    params: vec![],
                    return_type: CppQualifiedType::new(CppTypeRef::Builtin("void".into())),
                    is_constructor: false,
                    is_copy_constructor: false,
                    is_copy_assignment: false,
                    is_conversion_operator: false,
                    is_operator: false,
                    operator_symbol: None,
                },
            ],
            fields: vec![],
        };
        resolve_record(&mut s, &lib, "a.hpp");

        let record = s.output.get_record(&qname).expect("record materialized");
        assert!(record.methods.contains_key("channel_bytes"));
        assert_eq!(s.rejected.get(&qname).unwrap().len(), 1);
        assert_eq!(s.rejected[&qname][0].name, "unwanted_method");
    }

    #[test]
    fn ignored_method_is_matched_but_not_emitted_and_not_rejected() {
        let mut s = session();
        let qname = QualifiedName::leaf("Foo");
        let mut directives = DirectiveSet::default();
        directives.ignore = true;
        s.exports.insert_record(ExportedRecord {
            cpp_qname: qname.clone(),
            c_name: "Foo".to_string(),
            kind: RecordKind::OpaquePtr,
            source_file: "a.hpp".to_string(),
            is_dependent: false,
            methods: vec![ExportedMethod::new(sig("internal"), directives)],
        });
        let lib = LibraryRecord {
            cpp_qname: qname.clone(),
            is_dependent_template: false,
            is_template_specialization: false,
            template_args: vec![],
            size_align_bytes: Some((4, 4)),
            methods: vec![LibraryMethod {
                signature: sig("internal"),
                params: vec![],
                return_type: CppQualifiedType::new(CppTypeRef::Builtin("void".into())),
                is_constructor: false,
                is_copy_constructor: false,
                is_copy_assignment: false,
                is_conversion_operator: false,
                is_operator: false,
                operator_symbol: None,
            }],
            fields: vec![],
        };
        resolve_record(&mut s, &lib, "a.hpp");
        let record = s.output.get_record(&qname).unwrap();
        assert!(record.methods.is_empty());
        assert!(s.rejected.get(&qname).is_none());
    }

    #[test]
    fn dependent_specialization_monomorphizes_template_param() {
        let mut s = session();
        let base = QualifiedName::leaf("base_vec");
        s.exports.insert_record(ExportedRecord {
            cpp_qname: base.clone(),
            c_name: "base_vec".to_string(),
            kind: RecordKind::ValueType,
            source_file: "a.hpp".to_string(),
            is_dependent: true,
            methods: vec![ExportedMethod::new(
                MethodSignature {
                    name: "x".to_string(),
                    param_type_spellings: vec![],
                    is_const: true,
                    is_static: false,
                },
                DirectiveSet::default(),
            )],
        });
        let float_arg = CppQualifiedType::new(CppTypeRef::Builtin("float".into()));
        s.exports.insert_specialization(ExportedSpecialization {
            base_template: base.clone(),
            positional_args: vec![float_arg],
            named_args: HashMap::new(),
            alias: "vec3f".to_string(),
        });

        let lib = LibraryRecord {
            cpp_qname: base.clone(),
            is_dependent_template: true,
            is_template_specialization: false,
            template_args: vec![],
            size_align_bytes: None,
            methods: vec![LibraryMethod {
                signature: MethodSignature {
                    name: "x".to_string(),
                    param_type_spellings: vec![],
                    is_const: true,
                    is_static: false,
                },
                params: vec![],
                return_type: CppQualifiedType::new(CppTypeRef::TemplateParam(0, "T".to_string())),
                is_constructor: false,
                is_copy_constructor: false,
                is_copy_assignment: false,
                is_conversion_operator: false,
                is_operator: false,
                operator_symbol: None,
            }],
            fields: vec![],
        };
        resolve_record(&mut s, &lib, "a.hpp");

        let record = s
            .output
            .get_record(&QualifiedName::leaf("vec3f"))
            .expect("vec3f materialized");
        assert!(record.size.is_none(), "specializations never get size/align");
        let method = &record.methods["vec3f_x"];
        assert_eq!(method.func.return_type.ty, crate::types::Type::Named("float".to_string()));
    }

    #[test]
    fn copy_constructor_gets_other_param_name() {
        let mut s = session();
        let qname = QualifiedName::leaf("ImageSpec");
        s.exports.insert_record(ExportedRecord {
            cpp_qname: qname.clone(),
            c_name: "OIIO_ImageSpec".to_string(),
            kind: RecordKind::OpaquePtr,
            source_file: "a.hpp".to_string(),
            is_dependent: false,
            methods: vec![ExportedMethod::new(sig("ImageSpec"), DirectiveSet::default())],
        });
        let lib = LibraryRecord {
            cpp_qname: qname.clone(),
            is_dependent_template: false,
            is_template_specialization: false,
            template_args: vec![],
            size_align_bytes: Some((16, 8)),
            methods: vec![LibraryMethod {
                signature: sig("ImageSpec"),
                params: vec![(
                    "".to_string(),
                    CppQualifiedType::new(CppTypeRef::Reference(Box::new(CppQualifiedType::constant(
                        CppTypeRef::Record {
                            qname: qname.clone(),
                            is_template: false,
                        },
                    )))),
                )],
                return_type: CppQualifiedType::new(CppTypeRef::Builtin("void".into())),
                is_constructor: true,
                is_copy_constructor: true,
                is_copy_assignment: false,
                is_conversion_operator: false,
                is_operator: false,
                operator_symbol: None,
            }],
            fields: vec![],
        };
        resolve_record(&mut s, &lib, "a.hpp");
        let record = s.output.get_record(&qname).unwrap();
        assert_eq!(record.methods["OIIO_ImageSpec_ImageSpec"].func.params[0].name, "other");
    }

    #[test]
    fn vector_return_type_registers_element_and_file_association() {
        let mut s = session();
        let qname = QualifiedName::leaf("ImageBuf");
        s.exports.insert_record(ExportedRecord {
            cpp_qname: qname.clone(),
            c_name: "OIIO_ImageBuf".to_string(),
            kind: RecordKind::OpaquePtr,
            source_file: "a.hpp".to_string(),
            is_dependent: false,
            methods: vec![ExportedMethod::new(sig("channels"), DirectiveSet::default())],
        });
        let lib = LibraryRecord {
            cpp_qname: qname.clone(),
            is_dependent_template: false,
            is_template_specialization: false,
            template_args: vec![],
            size_align_bytes: Some((8, 8)),
            methods: vec![LibraryMethod {
                signature: sig("channels"),
                params: vec![],
                return_type: CppQualifiedType::new(CppTypeRef::Vector(Box::new(CppQualifiedType::new(
                    CppTypeRef::Builtin("int".into()),
                )))),
                is_constructor: false,
                is_copy_constructor: false,
                is_copy_assignment: false,
                is_conversion_operator: false,
                is_operator: false,
                operator_symbol: None,
            }],
            fields: vec![],
        };
        resolve_record(&mut s, &lib, "a.hpp");

        let vqname = QualifiedName::leaf("int32_t_vector");
        assert!(s.output.vectors.contains_key(&vqname));
        assert_eq!(
            s.output.vectors[&vqname].element.ty,
            crate::types::Type::Primitive(crate::types::CBuiltin::I32)
        );
        assert!(s.output.file_mut("a.hpp").vectors.contains(&vqname));
    }

    #[test]
    fn manual_method_is_recorded_but_not_inserted_into_record() {
        let mut s = session();
        let qname = QualifiedName::leaf("Foo");
        let mut directives = DirectiveSet::default();
        directives.manual = Some("Foo_internal".to_string());
        s.exports.insert_record(ExportedRecord {
            cpp_qname: qname.clone(),
            c_name: "Foo".to_string(),
            kind: RecordKind::OpaquePtr,
            source_file: "a.hpp".to_string(),
            is_dependent: false,
            methods: vec![ExportedMethod::new(sig("internal"), directives)],
        });
        let lib = LibraryRecord {
            cpp_qname: qname.clone(),
            is_dependent_template: false,
            is_template_specialization: false,
            template_args: vec![],
            size_align_bytes: Some((4, 4)),
            methods: vec![LibraryMethod {
                signature: sig("internal"),
                params: vec![],
                return_type: CppQualifiedType::new(CppTypeRef::Builtin("void".into())),
                is_constructor: false,
                is_copy_constructor: false,
                is_copy_assignment: false,
                is_conversion_operator: false,
                is_operator: false,
                operator_symbol: None,
            }],
            fields: vec![],
        };
        resolve_record(&mut s, &lib, "a.hpp");
        let record = s.output.get_record(&qname).unwrap();
        assert!(record.methods.is_empty());
        assert_eq!(s.output.file_mut("a.hpp").manual.len(), 1);
        assert!(s.rejected.get(&qname).is_none());
    }
}
