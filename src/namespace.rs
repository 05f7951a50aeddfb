//! 4.B Namespace Registry — a process-wide (here: session-wide) bidirectional
//! string map between source namespace names and renamed output prefixes.

use std::collections::HashMap;

/// Bidirectional rename table populated from CLI `--rename from=to` flags
/// before Pass 1 begins. Renames only affect emitted C identifiers; matching
/// against the library's C++ AST always uses the original spelling.
#[derive(Debug, Default, Clone)]
pub struct NamespaceRegistry {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl NamespaceRegistry {
    /// Register `from=to`. Both directions are tracked so a rename can later
    /// be read back for reporting, but `rename_namespace` only ever uses the
    /// forward direction.
    pub fn add_rename(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        let to = to.into();
        self.reverse.insert(to.clone(), from.clone());
        self.forward.insert(from, to);
    }

    /// `rename_namespace(name) -> name'`: the rewrite if present, else identity.
    pub fn rename_namespace(&self, name: &str) -> String {
        self.forward
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Rewrite a namespace path, collapsing the longest registered prefix
    /// (joined with `::`) into its single renamed segment and leaving the
    /// remainder untouched. A rename of `OpenImageIO::v2_4` to `OIIO`
    /// registers under the joined key, so `["OpenImageIO", "v2_4", "detail"]`
    /// becomes `["OIIO", "detail"]`.
    pub fn rename_all(&self, path: &[String]) -> Vec<String> {
        for prefix_len in (1..=path.len()).rev() {
            let candidate = path[..prefix_len].join("::");
            if let Some(renamed) = self.forward.get(&candidate) {
                let mut result = vec![renamed.clone()];
                result.extend(path[prefix_len..].iter().cloned());
                return result;
            }
        }
        path.to_vec()
    }

    /// Join a path with `sep`, with a trailing copy of `sep` iff the path is
    /// non-empty (so callers can simply prepend the result to a leaf name).
    pub fn prefix(&self, path: &[String], sep: &str) -> String {
        if path.is_empty() {
            String::new()
        } else {
            format!("{}{}", path.join(sep), sep)
        }
    }
}

/// Parse a single `from=to` CLI rename argument.
pub fn parse_rename_arg(arg: &str) -> anyhow::Result<(String, String)> {
    let (from, to) = arg
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("malformed --rename '{arg}', expected FROM=TO"))?;
    if from.is_empty() || to.is_empty() {
        anyhow::bail!("malformed --rename '{arg}', expected FROM=TO with both sides non-empty");
    }
    Ok((from.to_string(), to.to_string()))
}
