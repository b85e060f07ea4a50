//! SOP identity derived from the source file name.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Identifier and display name of a procedure document.
///
/// File names follow the `<ID><name>` convention, e.g.
/// `VPO.MGT.WH.3.5.4.001成品酒仓库管理.docx`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopIdentity {
    /// Leading `[A-Z0-9.-]` run of the file stem
    pub id: String,

    /// Remainder of the stem
    pub name: String,
}

fn id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z0-9.\-]+)").unwrap())
}

impl SopIdentity {
    /// Derive identity from a file stem.
    ///
    /// When the stem has no identifier prefix, `unknown_id` is used and the
    /// whole stem becomes the name. An empty remainder also falls back to
    /// the whole stem.
    pub fn from_stem(stem: &str, unknown_id: &str) -> Self {
        match id_regex().captures(stem).and_then(|c| c.get(1)) {
            Some(m) => {
                let rest = stem[m.end()..].trim();
                Self {
                    id: m.as_str().to_string(),
                    name: if rest.is_empty() {
                        stem.to_string()
                    } else {
                        rest.to_string()
                    },
                }
            }
            None => Self {
                id: unknown_id.to_string(),
                name: stem.to_string(),
            },
        }
    }

    /// Derive identity from a file path.
    pub fn from_path(path: &Path, unknown_id: &str) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_stem(&stem, unknown_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_with_prefix() {
        let id = SopIdentity::from_stem("VPO.MGT.WH.3.5.4.001成品酒仓库管理", "未知");
        assert_eq!(id.id, "VPO.MGT.WH.3.5.4.001");
        assert_eq!(id.name, "成品酒仓库管理");
    }

    #[test]
    fn test_identity_without_prefix() {
        let id = SopIdentity::from_stem("仓库管理规程", "未知");
        assert_eq!(id.id, "未知");
        assert_eq!(id.name, "仓库管理规程");
    }

    #[test]
    fn test_identity_only_prefix() {
        let id = SopIdentity::from_stem("RTP-001", "未知");
        assert_eq!(id.id, "RTP-001");
        assert_eq!(id.name, "RTP-001");
    }

    #[test]
    fn test_identity_from_path() {
        let id = SopIdentity::from_path(Path::new("/tmp/SOP-12 收货检验.docx"), "未知");
        assert_eq!(id.id, "SOP-12");
        assert_eq!(id.name, "收货检验");
    }
}
