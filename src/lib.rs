//! cxxcapi — generates a C API wrapper around a curated subset of a C++
//! library from hand-written binding declarations (spec.md §1).
//!
//! # Quick start
//!
//! Run the full pipeline from an already-parsed [`Config`] (suitable for a
//! `build.rs` script):
//!
//! ```no_run
//! use clap::Parser;
//!
//! let config = cxxcapi::Config::parse_from(["cxxcapi", "binding.hpp"]);
//! cxxcapi::run(&config).unwrap();
//! ```

pub mod annotation;
pub mod ast;
pub mod config;
pub mod discover;
pub mod emit;
pub mod error;
pub mod export;
pub mod library;
pub mod namespace;
pub mod qualified;
pub mod resolve;
pub mod session;
pub mod types;

use anyhow::{Context, Result};
use tracing::info;

pub use config::Config;
pub use emit::EmitOutput;
pub use error::FatalError;
pub use session::Session;

/// Run the full pipeline: parse every binding file with libclang, walk Pass 1
/// then Pass 2 on each, and emit the header/implementation/manifest files
/// under `config.output_dir` (spec.md §5).
///
/// Returns the populated [`Session`] alongside the emitted files, so a
/// programmatic caller (a `build.rs` script, a test) can inspect the
/// resolved registries without re-parsing the output text.
pub fn run(config: &Config) -> Result<(Session, EmitOutput)> {
    let mut session = Session::new(config.namespace_registry(), config.warn_unbound);

    let clang = clang::Clang::new().map_err(|e| anyhow::anyhow!("failed to initialize libclang: {e}"))?;
    let index = clang::Index::new(&clang, false, false);

    let clang_args = config.clang_args();

    for binding_file in &config.binding_files {
        let source_file = binding_file
            .to_str()
            .with_context(|| format!("non-UTF8 path: {}", binding_file.display()))?
            .to_string();

        info!(file = %source_file, "parsing binding declarations");
        let tu = parse(&index, &source_file, &clang_args)?;
        discover::discover_bindings(&mut session, &tu.get_entity(), &source_file).map_err(anyhow::Error::new)?;

        info!(file = %source_file, "walking library declarations");
        discover::discover_library(&mut session, &tu.get_entity(), &source_file);
    }

    let output = emit::emit_session(&session, config)?;
    info!(files = output.files.len(), out_dir = %config.output_dir.display(), "emitted bindings");

    Ok((session, output))
}

/// Pass 1 and Pass 2 both read the binding declaration file's own
/// translation unit (spec.md §1): the `cppmm_bind` namespace and the real
/// declarations it names normally live behind the same `#include` chain, so
/// one parse serves both passes.
fn parse<'i>(index: &'i clang::Index<'i>, source_file: &str, clang_args: &[String]) -> Result<clang::TranslationUnit<'i>> {
    let mut args: Vec<&str> = ast::BASE_CLANG_ARGS.to_vec();
    args.extend(clang_args.iter().map(String::as_str));

    index
        .parser(source_file)
        .arguments(&args)
        .detailed_preprocessing_record(true)
        .parse()
        .map_err(|e| {
            anyhow::Error::new(FatalError::Parse {
                file: source_file.to_string(),
                detail: format!("{e:?}"),
            })
        })
}
