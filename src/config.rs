//! CLI-driven configuration (spec.md §6). Unlike `bindscrape`/`bnd-winmd`'s
//! TOML file, every option here is a repeatable command-line flag — there is
//! no persistent project file format to version or migrate, and a single
//! binding run is almost always invoked from a build script or Makefile
//! target where flags are already the natural configuration surface.

use std::path::PathBuf;

use clap::Parser;

use crate::namespace::{self, NamespaceRegistry};

/// Generate a C API wrapper around a curated subset of a C++ library.
#[derive(Parser, Debug)]
#[command(name = "cxxcapi", version, about)]
pub struct Config {
    /// Binding declaration file(s) — headers containing a `cppmm_bind`
    /// namespace describing the intended exports.
    #[arg(required = true)]
    pub binding_files: Vec<PathBuf>,

    /// Directory the generated header/implementation/manifest files are
    /// written into.
    #[arg(short, long, default_value = "generated")]
    pub output_dir: PathBuf,

    /// Extra `-I` include directories passed to libclang for both the
    /// binding and library parses.
    #[arg(short = 'I', long = "include")]
    pub extra_includes: Vec<PathBuf>,

    /// Extra raw clang arguments (e.g. `-DFOO=1`), appended after
    /// `-I`/`ast::BASE_CLANG_ARGS`.
    #[arg(long = "clang-arg")]
    pub extra_clang_args: Vec<String>,

    /// Namespace rename, `FROM=TO` (spec.md §4.B). May be repeated.
    #[arg(long = "rename-namespace", value_parser = namespace::parse_rename_arg)]
    pub namespace_renames: Vec<(String, String)>,

    /// Extra libraries to link the generated implementation against (e.g.
    /// `-lmylib`), recorded in the build manifest for the caller's build
    /// system to consume.
    #[arg(long = "link")]
    pub extra_link_libs: Vec<String>,

    /// Suffix appended to the generated manual-code stub file name for
    /// symbols marked `cppmm:manual` (spec.md §4.A).
    #[arg(long, default_value = "-manual")]
    pub manual_suffix: String,

    /// Emit a warning listing every record's unmatched (rejected) methods
    /// at the end of the run (spec.md §7).
    #[arg(long)]
    pub warn_unbound: bool,
}

impl Config {
    /// Build the [`NamespaceRegistry`] described by `--rename-namespace`
    /// flags.
    pub fn namespace_registry(&self) -> NamespaceRegistry {
        let mut registry = NamespaceRegistry::default();
        for (from, to) in &self.namespace_renames {
            registry.add_rename(from, to);
        }
        registry
    }

    /// Every `-I` directory as a `-I<path>` clang argument, followed by the
    /// user's raw extra arguments.
    pub fn clang_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .extra_includes
            .iter()
            .map(|p| format!("-I{}", p.display()))
            .collect();
        args.extend(self.extra_clang_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Config::command().debug_assert();
    }

    #[test]
    fn namespace_registry_applies_every_rename_flag() {
        let cfg = Config {
            binding_files: vec![],
            output_dir: PathBuf::from("generated"),
            extra_includes: vec![],
            extra_clang_args: vec![],
            namespace_renames: vec![("OpenImageIO::v2_4".to_string(), "OIIO".to_string())],
            extra_link_libs: vec![],
            manual_suffix: "-manual".to_string(),
            warn_unbound: false,
        };
        let registry = cfg.namespace_registry();
        assert_eq!(
            registry.rename_all(&["OpenImageIO".to_string(), "v2_4".to_string()]),
            vec!["OIIO".to_string()]
        );
    }

    #[test]
    fn clang_args_combines_includes_and_raw_args() {
        let cfg = Config {
            binding_files: vec![],
            output_dir: PathBuf::from("generated"),
            extra_includes: vec![PathBuf::from("/usr/include/OpenImageIO")],
            extra_clang_args: vec!["-DFOO=1".to_string()],
            namespace_renames: vec![],
            extra_link_libs: vec![],
            manual_suffix: "-manual".to_string(),
            warn_unbound: false,
        };
        assert_eq!(
            cfg.clang_args(),
            vec!["-I/usr/include/OpenImageIO".to_string(), "-DFOO=1".to_string()]
        );
    }
}
