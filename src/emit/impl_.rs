//! Implementation rendering (spec.md §4.F "Implementation"): bridges every
//! resolved C prototype to the real C++ declaration it matched, dispatching
//! the call-through body shape on the return type and crossing every
//! handle boundary with a `reinterpret_cast` (spec.md §4.F's return-shape
//! table).

use std::fmt::Write as _;

use crate::export::RecordKind;
use crate::session::{Function, Method, OutputFile, Record, Session};
use crate::types::{CBuiltin, Param, QualifiedType, Type};

use super::{bare_type_name, cpp_type_name_for, is_handle_type, render_param_list, render_qualified_type};

pub fn render_impl(session: &Session, file: &OutputFile, header_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#include \"{header_name}\"");
    let _ = writeln!(out, "#include \"cppmm_support_internal.hpp\"");
    let _ = writeln!(out);
    let _ = writeln!(out, "#include <cstring>");
    let _ = writeln!(out, "#include <new>");
    let _ = writeln!(out, "#include <utility>");
    let _ = writeln!(out, "#include <vector>");
    let _ = writeln!(out);
    let _ = writeln!(out, "extern \"C\" {{");
    let _ = writeln!(out);

    for qname in &file.records {
        if let Some(record) = session.output.get_record(qname) {
            render_record_destroy(record, &mut out);
            let mut methods: Vec<&Method> = record.methods.values().collect();
            methods.sort_by(|a, b| a.func.c_name.cmp(&b.func.c_name));
            for method in methods {
                render_method_body(session, record, method, &mut out);
            }
        }
    }

    for qname in &file.functions {
        if let Some(func) = session.output.functions.get(qname) {
            render_function_body(session, func, &mut out);
        }
    }

    let _ = writeln!(out, "}} // extern \"C\"");
    out
}

fn render_record_destroy(record: &Record, out: &mut String) {
    if record.kind == RecordKind::ValueType {
        return;
    }
    let cpp_type = record.cpp_qname.join_cpp();
    let _ = writeln!(out, "void {}_destroy({}* self) {{", record.c_name, record.c_name);
    match record.kind {
        RecordKind::OpaquePtr => {
            let _ = writeln!(out, "    delete reinterpret_cast<{cpp_type}*>(self);");
        }
        RecordKind::OpaqueBytes => {
            let _ = writeln!(out, "    reinterpret_cast<{cpp_type}*>(self)->~{}();", record.cpp_qname.name);
        }
        RecordKind::ValueType => unreachable!(),
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

fn render_method_body(session: &Session, record: &Record, method: &Method, out: &mut String) {
    let mut c_params = Vec::new();
    if !method.is_static && !method.is_constructor {
        let self_ty = if method.is_const {
            format!("const {}*", record.c_name)
        } else {
            format!("{}*", record.c_name)
        };
        c_params.push(format!("{self_ty} self"));
    }
    for p in &method.func.params {
        c_params.push(format!("{} {}", render_qualified_type(session, &p.ty), p.name));
    }
    let c_params = if c_params.is_empty() {
        "void".to_string()
    } else {
        c_params.join(", ")
    };
    let ret = render_qualified_type(session, &method.func.return_type);
    let _ = writeln!(out, "{ret} {}({c_params}) {{", method.func.c_name);

    let args = render_cpp_args(session, &method.func.params);
    let call_expr = if method.is_constructor {
        format!("{}({args})", record.cpp_qname.join_cpp())
    } else {
        let cpp_type = record.cpp_qname.join_cpp();
        let const_q = if method.is_const { "const " } else { "" };
        let target = if method.is_static {
            cpp_type
        } else {
            format!("reinterpret_cast<{const_q}{cpp_type}*>(self)->")
        };
        if method.is_static {
            format!("{target}::{}({args})", method.func.cpp_qname.name)
        } else {
            format!("{target}{}({args})", method.func.cpp_qname.name)
        }
    };

    if method.is_constructor {
        render_constructing_return(record, &call_expr, out);
    } else {
        for line in render_return(session, &method.func.return_type, &call_expr) {
            let _ = writeln!(out, "    {line}");
        }
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

fn render_function_body(session: &Session, func: &Function, out: &mut String) {
    let params = render_param_list(session, &func.params);
    let ret = render_qualified_type(session, &func.return_type);
    let _ = writeln!(out, "{ret} {}({params}) {{", func.c_name);
    let args = render_cpp_args(session, &func.params);
    let call_expr = format!("{}({args})", func.cpp_qname.join_cpp());
    for line in render_return(session, &func.return_type, &call_expr) {
        let _ = writeln!(out, "    {line}");
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

/// A constructor "returns" a fresh owning handle; `record.kind` picks
/// whether that handle is a heap pointer or placement-constructed aligned
/// storage (spec.md §4.F: "Constructors emit `new`.").
fn render_constructing_return(record: &Record, call_expr: &str, out: &mut String) {
    let cpp_type = record.cpp_qname.join_cpp();
    let c_type = record.c_name.clone();
    match record.kind {
        RecordKind::OpaquePtr => {
            let _ = writeln!(out, "    return reinterpret_cast<{c_type}*>(new {call_expr});");
        }
        RecordKind::OpaqueBytes => {
            let _ = writeln!(
                out,
                "    void* _mem = ::operator new(sizeof({cpp_type}), std::align_val_t(alignof({cpp_type})));"
            );
            let _ = writeln!(out, "    new (_mem) {call_expr};");
            let _ = writeln!(out, "    return reinterpret_cast<{c_type}*>(_mem);");
        }
        RecordKind::ValueType => {
            let _ = writeln!(out, "    auto _tmp = {call_expr};");
            let _ = writeln!(out, "    {c_type} _out;");
            let _ = writeln!(out, "    std::memcpy(&_out, &_tmp, sizeof(_out));");
            let _ = writeln!(out, "    return _out;");
        }
    }
}

/// Every return-shape dispatch from spec.md §4.F's table, minus the
/// constructor case (handled separately, see [`render_constructing_return`]
/// — constructors don't evaluate an expression of the record type, they
/// construct one, so the two code paths don't share a return value to wrap).
fn render_return(session: &Session, ret: &QualifiedType, call_expr: &str) -> Vec<String> {
    // `void*` also translates to `Primitive(Void)` (with `is_pointer` set);
    // only a genuine `void` return skips the `return`.
    if ret.ty == Type::Primitive(CBuiltin::Void) && !ret.is_pointer {
        return vec![format!("{call_expr};")];
    }

    match &ret.ty {
        Type::Primitive(CBuiltin::String) => vec![
            format!("auto _tmp = {call_expr};"),
            "return new cppmm_string_t{std::move(_tmp)};".to_string(),
        ],
        Type::Primitive(CBuiltin::StringView) => vec![
            format!("auto _tmp = {call_expr};"),
            "return cppmm_string_view{_tmp.data(), _tmp.size()};".to_string(),
        ],
        Type::Primitive(_) | Type::Enum(_) | Type::Named(_) | Type::Unhandled => {
            vec![format!("return {call_expr};")]
        }
        Type::Record(qname) => {
            let kind = session
                .output
                .get_record(qname)
                .map(|r| r.kind)
                .unwrap_or(RecordKind::OpaquePtr);
            render_indirect_return(session, ret, kind, call_expr)
        }
        Type::Vector(_) => render_indirect_return(session, ret, RecordKind::OpaquePtr, call_expr),
    }
}

/// A record or vector return: the four ways ownership can reach the caller
/// depending on whether the real C++ method returned a pointer, a
/// reference, a `unique_ptr`, or a plain value (spec.md §4.F: "Owning
/// unique pointer: release into a raw pointer and return.").
fn render_indirect_return(
    session: &Session,
    ret: &QualifiedType,
    kind: RecordKind,
    call_expr: &str,
) -> Vec<String> {
    let c_type = bare_type_name(session, &ret.ty);
    let cpp_type = cpp_type_name_for(session, &ret.ty);

    if ret.is_unique_ptr {
        return vec![
            format!("auto _tmp = {call_expr};"),
            format!("return reinterpret_cast<{c_type}*>(_tmp.release());"),
        ];
    }
    if ret.is_pointer {
        return vec![format!("return reinterpret_cast<{c_type}*>({call_expr});")];
    }
    if ret.is_reference {
        return vec![format!("return reinterpret_cast<{c_type}*>(&({call_expr}));")];
    }

    match kind {
        RecordKind::OpaqueBytes => vec![
            format!("auto _tmp = {call_expr};"),
            format!(
                "void* _mem = ::operator new(sizeof({cpp_type}), std::align_val_t(alignof({cpp_type})));"
            ),
            format!("new (_mem) {cpp_type}(std::move(_tmp));"),
            format!("return reinterpret_cast<{c_type}*>(_mem);"),
        ],
        RecordKind::ValueType => vec![
            format!("auto _tmp = {call_expr};"),
            format!("{c_type} _out;"),
            "std::memcpy(&_out, &_tmp, sizeof(_out));".to_string(),
            "return _out;".to_string(),
        ],
        RecordKind::OpaquePtr => vec![format!(
            "return reinterpret_cast<{c_type}*>(new {cpp_type}({call_expr}));"
        )],
    }
}

/// `arg0, arg1, ...` bridged across the C/C++ boundary: primitives and enums
/// pass straight through, anything `requires_cast` crosses through a
/// `reinterpret_cast` at the appropriate indirection (spec.md §4.F:
/// "Parameters requiring a cast are bridged through reinterpret_cast
/// helpers between C handle types and their C++ counterparts.").
fn render_cpp_args(session: &Session, params: &[Param]) -> String {
    params
        .iter()
        .map(|p| cpp_arg_expr(session, &p.ty, &p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NamespaceRegistry;
    use crate::qualified::QualifiedName;
    use crate::session::Function;

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

    fn widget_session() -> (Session, QualifiedName) {
        let mut session = Session::new(NamespaceRegistry::default(), false);
        let qname = QualifiedName::new(vec!["ns".into()], "Widget");
        session.output.begin_record(&qname, "ns_Widget", RecordKind::OpaquePtr);
        session.output.complete_record(&qname);
        (session, qname)
    }

    #[test]
    fn opaque_ptr_destroy_deletes_through_a_reinterpret_cast() {
        let (session, qname) = widget_session();
        let record = session.output.get_record(&qname).unwrap();
        let mut out = String::new();
        render_record_destroy(record, &mut out);
        assert!(out.contains("void ns_Widget_destroy(ns_Widget* self) {"));
        assert!(out.contains("delete reinterpret_cast<ns::Widget*>(self);"));
    }

    #[test]
    fn value_type_destroy_is_skipped() {
        let mut session = Session::new(NamespaceRegistry::default(), false);
        let qname = QualifiedName::leaf("Point");
        session.output.begin_record(&qname, "Point", RecordKind::ValueType);
        session.output.complete_record(&qname);
        let record = session.output.get_record(&qname).unwrap();
        let mut out = String::new();
        render_record_destroy(record, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn constructor_returns_a_heap_allocated_handle() {
        let (session, qname) = widget_session();
        let ctor = Method {
            func: Function {
                cpp_qname: QualifiedName::leaf("Widget"),
                c_name: "ns_Widget_new".to_string(),
                return_type: qtype(Type::Record(qname.clone())),
                params: vec![],
                source_file: "widget.hpp".to_string(),
            },
            is_const: false,
            is_static: false,
            is_constructor: true,
            is_copy_constructor: false,
            is_copy_assignment: false,
            is_operator: false,
            is_conversion_operator: false,
            operator_symbol: None,
        };
        let record = session.output.get_record(&qname).unwrap();
        let mut out = String::new();
        render_method_body(&session, record, &ctor, &mut out);
        assert!(out.contains("ns_Widget* ns_Widget_new(void) {"));
        assert!(out.contains("return reinterpret_cast<ns_Widget*>(new ns::Widget());"));
    }

    #[test]
    fn builtin_return_passes_through_unwrapped() {
        let session = Session::new(NamespaceRegistry::default(), false);
        let lines = render_return(&session, &qtype(Type::Primitive(CBuiltin::I32)), "foo()");
        assert_eq!(lines, vec!["return foo();".to_string()]);
    }

    #[test]
    fn void_return_has_no_return_statement() {
        let session = Session::new(NamespaceRegistry::default(), false);
        let lines = render_return(&session, &qtype(Type::Primitive(CBuiltin::Void)), "foo()");
        assert_eq!(lines, vec!["foo();".to_string()]);
    }

    #[test]
    fn void_pointer_return_is_not_mistaken_for_void() {
        let session = Session::new(NamespaceRegistry::default(), false);
        let mut ret = qtype(Type::Primitive(CBuiltin::Void));
        ret.is_pointer = true;
        let lines = render_return(&session, &ret, "foo()");
        assert_eq!(lines, vec!["return foo();".to_string()]);
    }

    #[test]
    fn string_return_heap_allocates_a_cppmm_string() {
        let session = Session::new(NamespaceRegistry::default(), false);
        let lines = render_return(&session, &qtype(Type::Primitive(CBuiltin::String)), "foo()");
        assert_eq!(lines[0], "auto _tmp = foo();");
        assert!(lines[1].contains("new cppmm_string_t"));
    }

    #[test]
    fn unique_ptr_return_releases_into_a_raw_pointer() {
        let (session, qname) = widget_session();
        let mut ret = qtype(Type::Record(qname));
        ret.is_unique_ptr = true;
        let lines = render_return(&session, &ret, "make_widget()");
        assert!(lines[1].contains(".release()"));
    }

    #[test]
    fn cast_required_pointer_param_bridges_with_reinterpret_cast() {
        let (session, qname) = widget_session();
        let mut qt = qtype(Type::Record(qname));
        qt.requires_cast = true;
        qt.is_pointer = true;
        let expr = cpp_arg_expr(&session, &qt, "w");
        assert_eq!(expr, "reinterpret_cast<ns::Widget*>(w)");
    }

    #[test]
    fn plain_builtin_param_passes_through_unchanged() {
        let session = Session::new(NamespaceRegistry::default(), false);
        let expr = cpp_arg_expr(&session, &qtype(Type::Primitive(CBuiltin::I32)), "n");
        assert_eq!(expr, "n");
    }
}

fn cpp_arg_expr(session: &Session, qt: &QualifiedType, c_name: &str) -> String {
    if !qt.requires_cast {
        return c_name.to_string();
    }

    let cpp_type = cpp_type_name_for(session, &qt.ty);
    let const_q = if qt.is_const { "const " } else { "" };

    if qt.is_unique_ptr {
        return format!("std::unique_ptr<{cpp_type}>(reinterpret_cast<{cpp_type}*>({c_name}))");
    }

    let c_is_pointer = is_handle_type(session, &qt.ty) || qt.is_pointer || qt.is_reference;
    if !c_is_pointer {
        // A `ValueType` passed genuinely by value: the C struct is a
        // byte-identical mirror, so its address reinterprets directly.
        return format!("*reinterpret_cast<{cpp_type}*>(&{c_name})");
    }
    if qt.is_pointer {
        return format!("reinterpret_cast<{const_q}{cpp_type}*>({c_name})");
    }
    format!("*reinterpret_cast<{const_q}{cpp_type}*>({c_name})")
}
