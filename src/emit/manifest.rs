//! Build manifest rendering (spec.md §4.F "Manifest"): the generated
//! header/implementation paths per source file, the library includes each
//! one carries, and the link libraries configuration specified.

use std::fmt::Write as _;

use crate::config::Config;
use crate::session::Session;

use super::EmittedFile;

/// Plain-text, not anything `cmake`/`meson` would consume directly — the
/// manifest is a record of what this run produced, left for the author's own
/// build wiring to read (spec.md §6: no claim is made about the downstream
/// build system).
pub fn render_manifest(session: &Session, config: &Config, files: &[EmittedFile]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# cxxcapi build manifest");
    let _ = writeln!(out, "output_dir = {}", config.output_dir.display());
    let _ = writeln!(out);

    let mut source_files: Vec<&String> = session.output.files.keys().collect();
    source_files.sort();

    for source_file in source_files {
        let stem = std::path::Path::new(source_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(source_file);
        let _ = writeln!(out, "[{source_file}]");
        let _ = writeln!(out, "header = {stem}.h");
        let _ = writeln!(out, "implementation = {stem}.cpp");
        if let Some(exported) = session.exports.files.get(source_file) {
            for include in &exported.raw_includes {
                let _ = writeln!(out, "include = {include}");
            }
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "[support]");
    let _ = writeln!(out, "header = cppmm_support.h");
    let _ = writeln!(out, "implementation = cppmm_support.cpp");
    let _ = writeln!(out);

    let _ = writeln!(out, "[link]");
    for lib in &config.extra_link_libs {
        let _ = writeln!(out, "library = {lib}");
    }

    let total = files.len();
    let _ = writeln!(out);
    let _ = writeln!(out, "# {total} files emitted");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportedFile;
    use crate::namespace::NamespaceRegistry;
    use crate::session::OutputFile;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            binding_files: vec![],
            output_dir: PathBuf::from("generated"),
            extra_includes: vec![],
            extra_clang_args: vec![],
            namespace_renames: vec![],
            extra_link_libs: vec!["mylib".to_string()],
            manual_suffix: "-manual".to_string(),
            warn_unbound: false,
        }
    }

    #[test]
    fn lists_header_impl_and_includes_per_source_file() {
        let mut session = Session::new(NamespaceRegistry::default(), false);
        session.output.files.insert("widget.hpp".to_string(), OutputFile::default());
        session.exports.files.insert(
            "widget.hpp".to_string(),
            ExportedFile {
                raw_includes: vec!["#include <widget.h>".to_string()],
                ..Default::default()
            },
        );

        let manifest = render_manifest(&session, &config(), &[]);
        assert!(manifest.contains("[widget.hpp]"));
        assert!(manifest.contains("header = widget.h"));
        assert!(manifest.contains("implementation = widget.cpp"));
        assert!(manifest.contains("include = #include <widget.h>"));
    }

    #[test]
    fn records_extra_link_libraries() {
        let manifest = render_manifest(&Session::default(), &config(), &[]);
        assert!(manifest.contains("library = mylib"));
    }
}
