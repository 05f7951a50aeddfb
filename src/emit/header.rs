//! Header rendering (spec.md §4.F "Header").

use std::fmt::Write as _;

use crate::export::RecordKind;
use crate::qualified::QualifiedName;
use crate::session::{Method, OutputFile, Record, Session};

use super::{render_param_list, render_qualified_type};

/// Render one binding source file's header: include guard, raw includes,
/// record/enum typedefs, Vector helper prototypes, and every resolved
/// function/method prototype (spec.md §4.F).
pub fn render_header(session: &Session, file: &OutputFile, source_file: &str, header_name: &str) -> String {
    let mut out = String::new();
    let guard = include_guard(header_name);

    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}");
    let _ = writeln!(out);
    let _ = writeln!(out, "#include <stdint.h>");
    let _ = writeln!(out, "#include <stddef.h>");
    let _ = writeln!(out, "#include <stdbool.h>");
    let _ = writeln!(out, "#include \"cppmm_support.h\"");

    if let Some(exported_file) = session.exports.files.get(source_file) {
        for include in &exported_file.raw_includes {
            let _ = writeln!(out, "{include}");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "#ifdef __cplusplus");
    let _ = writeln!(out, "extern \"C\" {{");
    let _ = writeln!(out, "#endif");
    let _ = writeln!(out);

    for qname in &file.records {
        if let Some(record) = session.output.get_record(qname) {
            render_record_typedef(session, record, &mut out);
        }
    }

    for qname in &file.enums {
        if let Some(en) = session.output.enums.get(qname) {
            let _ = writeln!(out, "typedef enum {{");
            for (name, value) in &en.variants {
                let _ = writeln!(out, "    {}_{} = {},", en.c_name, name, value);
            }
            let _ = writeln!(out, "}} {};", en.c_name);
            let _ = writeln!(out);
        }
    }

    let mut vectors: Vec<&QualifiedName> = file.vectors.iter().collect();
    vectors.sort();
    for vqname in vectors {
        if let Some(vector) = session.output.vectors.get(vqname) {
            render_vector_prototypes(session, &vqname.name, &vector.element, &mut out);
        }
    }

    for qname in &file.records {
        if let Some(record) = session.output.get_record(qname) {
            let mut methods: Vec<&Method> = record.methods.values().collect();
            methods.sort_by(|a, b| a.func.c_name.cmp(&b.func.c_name));
            for method in methods {
                render_method_prototype(session, record, method, &mut out);
            }
        }
    }

    for qname in &file.functions {
        if let Some(func) = session.output.functions.get(qname) {
            let ret = render_qualified_type(session, &func.return_type);
            let params = render_param_list(session, &func.params);
            let _ = writeln!(out, "{ret} {}({params});", func.c_name);
        }
    }

    if !file.manual.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "/* Hand-implemented (cppmm:manual) — not generated. */");
        for func in &file.manual {
            let ret = render_qualified_type(session, &func.return_type);
            let params = render_param_list(session, &func.params);
            let _ = writeln!(out, "{ret} {}({params});", func.c_name);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "#ifdef __cplusplus");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out, "#endif");
    let _ = writeln!(out);
    let _ = writeln!(out, "#endif /* {guard} */");
    out
}

fn render_record_typedef(session: &Session, record: &Record, out: &mut String) {
    match record.kind {
        RecordKind::OpaquePtr => {
            let _ = writeln!(out, "typedef struct {0}_t {0};", record.c_name);
        }
        RecordKind::OpaqueBytes => {
            let size = record.size.unwrap_or(0);
            let align = record.align.unwrap_or(1);
            let _ = writeln!(out, "typedef struct {{");
            let _ = writeln!(out, "    _Alignas({align}) unsigned char bytes[{size}];");
            let _ = writeln!(out, "}} {};", record.c_name);
        }
        RecordKind::ValueType => {
            let _ = writeln!(out, "typedef struct {{");
            for field in &record.fields {
                let ty = render_qualified_type(session, &field.ty);
                let _ = writeln!(out, "    {ty} {};", field.name);
            }
            let _ = writeln!(out, "}} {};", record.c_name);
        }
    }
    // Every heap- or storage-owning record gets a paired destroy function;
    // `ValueType` is plain data the caller already owns outright.
    if record.kind != RecordKind::ValueType {
        let _ = writeln!(out, "void {}_destroy({}* self);", record.c_name, record.c_name);
    }
    let _ = writeln!(out);
}

fn render_method_prototype(session: &Session, record: &Record, method: &Method, out: &mut String) {
    let mut params = Vec::new();
    if !method.is_static && !method.is_constructor {
        let self_ty = if method.is_const {
            format!("const {}*", record.c_name)
        } else {
            format!("{}*", record.c_name)
        };
        params.push(format!("{self_ty} self"));
    }
    for p in &method.func.params {
        params.push(format!("{} {}", render_qualified_type(session, &p.ty), p.name));
    }
    let params = if params.is_empty() {
        "void".to_string()
    } else {
        params.join(", ")
    };
    let ret = render_qualified_type(session, &method.func.return_type);
    let _ = writeln!(out, "{ret} {}({params});", method.func.c_name);
}

fn render_vector_prototypes(session: &Session, vec_name: &str, element: &crate::types::QualifiedType, out: &mut String) {
    let elem_ty = render_qualified_type(session, element);
    let _ = writeln!(out, "typedef struct {vec_name}_t {vec_name};");
    let _ = writeln!(out, "{vec_name}* {vec_name}_new(void);");
    let _ = writeln!(out, "void {vec_name}_free({vec_name}* self);");
    let _ = writeln!(out, "size_t {vec_name}_size(const {vec_name}* self);");
    let _ = writeln!(out, "{elem_ty}* {vec_name}_data({vec_name}* self);");
    let _ = writeln!(out, "{elem_ty} {vec_name}_get(const {vec_name}* self, size_t index);");
    let _ = writeln!(out, "void {vec_name}_set({vec_name}* self, size_t index, {elem_ty} value);");
    let _ = writeln!(out);
}

fn include_guard(header_name: &str) -> String {
    header_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect::<String>()
        + "_"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NamespaceRegistry;
    use crate::qualified::QualifiedName;
    use crate::session::{Function, OutputFile};
    use crate::types::{CBuiltin, QualifiedType, Type};

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
    fn include_guard_upcases_and_replaces_punctuation() {
        assert_eq!(include_guard("point.h"), "POINT_H_");
    }

    #[test]
    fn opaque_ptr_record_gets_typedef_and_destroy_prototype() {
        let mut session = Session::new(NamespaceRegistry::default(), false);
        let qname = QualifiedName::leaf("Widget");
        session.output.begin_record(&qname, "Widget", RecordKind::OpaquePtr);
        session.output.complete_record(&qname);

        let mut out = String::new();
        render_record_typedef(&session, session.output.get_record(&qname).unwrap(), &mut out);
        assert!(out.contains("typedef struct Widget_t Widget;"));
        assert!(out.contains("void Widget_destroy(Widget* self);"));
    }

    #[test]
    fn value_type_record_has_no_destroy_prototype() {
        let mut session = Session::new(NamespaceRegistry::default(), false);
        let qname = QualifiedName::leaf("Point");
        session.output.begin_record(&qname, "Point", RecordKind::ValueType);
        session.output.complete_record(&qname);
        {
            let record = session.output.records.get_mut(&qname).unwrap();
            record.fields.push(crate::session::Field {
                name: "x".to_string(),
                ty: qtype(Type::Primitive(CBuiltin::F64)),
            });
        }

        let mut out = String::new();
        render_record_typedef(&session, session.output.get_record(&qname).unwrap(), &mut out);
        assert!(out.contains("double x;"));
        assert!(!out.contains("_destroy"));
    }

    #[test]
    fn render_header_emits_function_prototype_and_manual_stub() {
        let mut session = Session::new(NamespaceRegistry::default(), false);
        session.output.insert_function(Function {
            cpp_qname: QualifiedName::leaf("make_widget"),
            c_name: "make_widget".to_string(),
            return_type: qtype(Type::Primitive(CBuiltin::I32)),
            params: vec![],
            source_file: "widget.hpp".to_string(),
        });

        let mut file = OutputFile::default();
        file.functions.push(QualifiedName::leaf("make_widget"));
        file.manual.push(Function {
            cpp_qname: QualifiedName::leaf("do_it_by_hand"),
            c_name: "do_it_by_hand".to_string(),
            return_type: qtype(Type::Primitive(CBuiltin::Void)),
            params: vec![],
            source_file: "widget.hpp".to_string(),
        });

        let header = render_header(&session, &file, "widget.hpp", "widget.h");
        assert!(header.contains("int32_t make_widget(void);"));
        assert!(header.contains("void do_it_by_hand(void);"));
        assert!(header.contains("#include \"cppmm_support.h\""));
    }
}
