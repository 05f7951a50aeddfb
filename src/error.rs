//! Error taxonomy and process exit codes (spec.md §7).
//!
//! Most failures during a run are recoverable — an unmatched method, a
//! malformed annotation on one declaration — and are handled where they
//! occur via `tracing::warn!` plus [`crate::session::Session`]'s rejected-
//! method bookkeeping. The variants here are the run-ending failures: ones
//! `anyhow::Error` alone wouldn't let `main` map to a distinct process exit
//! code (grounded on `bnd-winmd`/`bindscrape`'s flat `anyhow::Result`
//! propagation, extended with an explicit taxonomy since this crate's
//! contract promises specific exit codes per failure class).

use std::fmt;

use crate::qualified::QualifiedName;

/// A run-ending failure, each mapped to a distinct process exit code.
#[derive(Debug)]
pub enum FatalError {
    /// A CLI flag or rename argument was malformed.
    Config(String),
    /// A recognized `cppmm:` verb was given a missing/empty argument
    /// (spec.md §4.A; see [`crate::annotation::MalformedAnnotation`]).
    MalformedAnnotation(crate::annotation::MalformedAnnotation),
    /// A binding or library file could not be parsed by libclang.
    Parse { file: String, detail: String },
    /// A `cppmm:opaquebytes` record is a dependent template — size/alignment
    /// can never be queried on an uninstantiated template, so the directive
    /// is contradictory (spec.md §4.E failure semantics).
    OpaqueBytesOnDependentTemplate(QualifiedName),
    /// A template argument used in a `using` specialization alias was not a
    /// builtin — dependent-context translation only supports builtin
    /// arguments (spec.md §4.D step 6).
    NonBuiltinTemplateArgument { alias: String, spelling: String },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::Config(msg) => write!(f, "configuration error: {msg}"),
            FatalError::MalformedAnnotation(e) => write!(f, "{e}"),
            FatalError::Parse { file, detail } => {
                write!(f, "failed to parse '{file}': {detail}")
            }
            FatalError::OpaqueBytesOnDependentTemplate(qname) => write!(
                f,
                "'{qname}' is annotated cppmm:opaquebytes but is a dependent template; \
                 size and alignment cannot be queried before instantiation"
            ),
            FatalError::NonBuiltinTemplateArgument { alias, spelling } => write!(
                f,
                "specialization alias '{alias}' uses non-builtin template argument '{spelling}'"
            ),
        }
    }
}

impl std::error::Error for FatalError {}

impl From<crate::annotation::MalformedAnnotation> for FatalError {
    fn from(e: crate::annotation::MalformedAnnotation) -> Self {
        FatalError::MalformedAnnotation(e)
    }
}

impl FatalError {
    /// The process exit code this error maps to (spec.md §7).
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::Config(_) => 2,
            FatalError::MalformedAnnotation(_) => 3,
            FatalError::Parse { .. } => 4,
            FatalError::OpaqueBytesOnDependentTemplate(_) => 5,
            FatalError::NonBuiltinTemplateArgument { .. } => 5,
        }
    }
}
