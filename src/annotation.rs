//! 4.A Annotation Parser — reads a single annotation string of the form
//! `cppmm:<verb>[:<arg>]` and yields an [`AttrDirective`] or nothing.

use std::fmt;

/// One parsed attribute directive. Multiple directives on one declaration
/// compose: `rename` overrides the c-name, `ignore` suppresses emission
/// (but the entity still counts as matched), `manual` routes the symbol to
/// the separate manual-code pipeline (out of scope here).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrDirective {
    Ignore,
    Rename(String),
    Manual(String),
    ValueType,
    OpaquePtr,
    OpaqueBytes,
}

/// A recognized verb was given a malformed (missing/empty) argument. This is
/// a configuration error per DESIGN.md's resolution of spec.md §9's "attribute
/// parsing fragility" open question — distinct from "not our annotation at
/// all", which is silently ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAnnotation {
    pub raw: String,
    pub verb: String,
}

impl fmt::Display for MalformedAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed `cppmm:{}` annotation '{}': missing required argument",
            self.verb, self.raw
        )
    }
}

impl std::error::Error for MalformedAnnotation {}

const PREFIX: &str = "cppmm:";

/// Parse a single annotation string. Returns `Ok(None)` for strings that
/// aren't `cppmm:`-prefixed or that use an unrecognized verb (both are
/// silent no-ops per spec.md §4.A). Returns `Err` only when a *recognized*
/// verb is missing its required argument.
pub fn parse(raw: &str) -> Result<Option<AttrDirective>, MalformedAnnotation> {
    let Some(rest) = raw.strip_prefix(PREFIX) else {
        return Ok(None);
    };
    let mut parts = rest.splitn(2, ':');
    let verb = parts.next().unwrap_or("");
    let arg = parts.next();

    let directive = match verb {
        "ignore" => AttrDirective::Ignore,
        "valuetype" => AttrDirective::ValueType,
        "opaqueptr" => AttrDirective::OpaquePtr,
        "opaquebytes" => AttrDirective::OpaqueBytes,
        "rename" => match arg.filter(|a| !a.is_empty()) {
            Some(name) => AttrDirective::Rename(name.to_string()),
            None => {
                return Err(MalformedAnnotation {
                    raw: raw.to_string(),
                    verb: verb.to_string(),
                });
            }
        },
        "manual" => match arg.filter(|a| !a.is_empty()) {
            Some(sym) => AttrDirective::Manual(sym.to_string()),
            None => {
                return Err(MalformedAnnotation {
                    raw: raw.to_string(),
                    verb: verb.to_string(),
                });
            }
        },
        _ => return Ok(None),
    };
    Ok(Some(directive))
}

/// Parse every annotation string attached to a declaration, collecting
/// directives and propagating the first malformed one.
pub fn parse_all(raws: &[String]) -> Result<Vec<AttrDirective>, MalformedAnnotation> {
    let mut out = Vec::with_capacity(raws.len());
    for raw in raws {
        if let Some(d) = parse(raw)? {
            out.push(d);
        }
    }
    Ok(out)
}

/// Directives reduced to the flags the rest of the pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct DirectiveSet {
    pub ignore: bool,
    pub manual: Option<String>,
    pub rename: Option<String>,
    pub value_type: bool,
    pub opaque_ptr: bool,
    pub opaque_bytes: bool,
}

impl DirectiveSet {
    pub fn from_directives(directives: &[AttrDirective]) -> Self {
        let mut set = DirectiveSet::default();
        for d in directives {
            match d {
                AttrDirective::Ignore => set.ignore = true,
                AttrDirective::Manual(sym) => set.manual = Some(sym.clone()),
                AttrDirective::Rename(name) => set.rename = Some(name.clone()),
                AttrDirective::ValueType => set.value_type = true,
                AttrDirective::OpaquePtr => set.opaque_ptr = true,
                AttrDirective::OpaqueBytes => set.opaque_bytes = true,
            }
        }
        set
    }

    /// Does this entity get emitted at all? `ignore` and `manual` both match
    /// but do not emit (spec.md §4.A).
    pub fn emits(&self) -> bool {
        !self.ignore && self.manual.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_cppmm_string_is_ignored() {
        assert_eq!(parse("something else").unwrap(), None);
    }

    #[test]
    fn unknown_verb_is_ignored_silently() {
        assert_eq!(parse("cppmm:frobnicate").unwrap(), None);
    }

    #[test]
    fn ignore_verb() {
        assert_eq!(parse("cppmm:ignore").unwrap(), Some(AttrDirective::Ignore));
    }

    #[test]
    fn rename_verb_with_arg() {
        assert_eq!(
            parse("cppmm:rename:new_with_dimensions").unwrap(),
            Some(AttrDirective::Rename("new_with_dimensions".to_string()))
        );
    }

    #[test]
    fn rename_verb_without_arg_is_malformed() {
        let err = parse("cppmm:rename").unwrap_err();
        assert_eq!(err.verb, "rename");
    }

    #[test]
    fn manual_verb_with_arg() {
        assert_eq!(
            parse("cppmm:manual:my_symbol").unwrap(),
            Some(AttrDirective::Manual("my_symbol".to_string()))
        );
    }

    #[test]
    fn valuetype_opaqueptr_opaquebytes() {
        assert_eq!(parse("cppmm:valuetype").unwrap(), Some(AttrDirective::ValueType));
        assert_eq!(parse("cppmm:opaqueptr").unwrap(), Some(AttrDirective::OpaquePtr));
        assert_eq!(
            parse("cppmm:opaquebytes").unwrap(),
            Some(AttrDirective::OpaqueBytes)
        );
    }

    #[test]
    fn directive_set_composes_ignore_and_rename() {
        let directives = vec![
            AttrDirective::Rename("foo".to_string()),
            AttrDirective::ValueType,
        ];
        let set = DirectiveSet::from_directives(&directives);
        assert_eq!(set.rename.as_deref(), Some("foo"));
        assert!(set.value_type);
        assert!(set.emits());
    }

    #[test]
    fn directive_set_ignore_suppresses_emission() {
        let set = DirectiveSet::from_directives(&[AttrDirective::Ignore]);
        assert!(!set.emits());
    }

    #[test]
    fn directive_set_manual_suppresses_emission() {
        let set = DirectiveSet::from_directives(&[AttrDirective::Manual("sym".to_string())]);
        assert!(!set.emits());
        assert_eq!(set.manual.as_deref(), Some("sym"));
    }
}
