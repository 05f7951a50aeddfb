//! [`QualifiedName`] — the namespace-path + leaf-identifier key shared by every
//! exported and resolved entity.

use crate::namespace::NamespaceRegistry;

/// An ordered sequence of namespace segments plus a leaf identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub namespaces: Vec<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespaces: Vec<String>, name: impl Into<String>) -> Self {
        QualifiedName {
            namespaces,
            name: name.into(),
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        QualifiedName {
            namespaces: Vec::new(),
            name: name.into(),
        }
    }

    /// Append an inner segment, e.g. turning a record's qname into the
    /// namespace prefix for one of its methods.
    pub fn nested(&self, name: impl Into<String>) -> Self {
        let mut namespaces = self.namespaces.clone();
        namespaces.push(self.name.clone());
        QualifiedName {
            namespaces,
            name: name.into(),
        }
    }

    /// The original C++ spelling, e.g. `OpenImageIO::v2_4::ImageSpec`.
    pub fn join_cpp(&self) -> String {
        if self.namespaces.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespaces.join("::"), self.name)
        }
    }

    /// The rename-aware underscore-joined C identifier, e.g. `OIIO_ImageSpec`.
    pub fn join_c(&self, registry: &NamespaceRegistry) -> String {
        let renamed = registry.rename_all(&self.namespaces);
        format!("{}{}", registry.prefix(&renamed, "_"), self.name)
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.join_cpp())
    }
}
