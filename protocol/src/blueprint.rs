//! Contract blueprints and constructor encoding.
//!
//! A blueprint artifact is JSON with the code hash under `source.hash` and
//! constructors under `spec.constructors`:
//!
//! ```json
//! {
//!   "source": { "hash": "0x96ca…" },
//!   "spec": {
//!     "constructors": [
//!       { "label": "with_core", "selector": "0x9bae9d5e",
//!         "args": [{ "label": "core_js" }, { "label": "settings" }] }
//!     ]
//!   }
//! }
//! ```
//!
//! Call data is `selector || (u32 LE length || arg bytes)*`. Only its
//! length matters to the cost oracle.

use std::path::Path;

use serde::Deserialize;

use deploykit_primitives::{bytes_from_hex, hash_from_hex, CodeHash};

/// Errors raised while loading a blueprint or encoding a constructor call.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("cannot read blueprint: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blueprint json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("unknown constructor '{0}'")]
    UnknownConstructor(String),

    #[error("constructor '{label}' takes {expected} arguments, got {got}")]
    ArgumentCount {
        label: String,
        expected: usize,
        got: usize,
    },
}

/// Something that can turn a constructor label and arguments into call data.
pub trait ConstructorEncoder {
    /// Hash of the code this encoder's constructors instantiate.
    fn code_hash(&self) -> CodeHash;

    fn encode_constructor(&self, label: &str, args: &[Vec<u8>]) -> Result<Vec<u8>, BlueprintError>;
}

/// One constructor entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub label: String,
    pub selector: [u8; 4],
    /// Declared argument labels, when the artifact lists them.
    pub args: Option<Vec<String>>,
}

/// A loaded blueprint artifact.
#[derive(Debug, Clone)]
pub struct Blueprint {
    code_hash: CodeHash,
    constructors: Vec<Constructor>,
}

// ── Artifact schema ──

#[derive(Deserialize)]
struct Artifact {
    source: Source,
    spec: Spec,
}

#[derive(Deserialize)]
struct Source {
    hash: String,
}

#[derive(Deserialize)]
struct Spec {
    #[serde(default)]
    constructors: Vec<ConstructorEntry>,
}

#[derive(Deserialize)]
struct ConstructorEntry {
    label: String,
    selector: String,
    #[serde(default)]
    args: Option<Vec<ArgEntry>>,
}

#[derive(Deserialize)]
struct ArgEntry {
    label: String,
}

impl Blueprint {
    pub fn from_json(json: &str) -> Result<Self, BlueprintError> {
        let artifact: Artifact = serde_json::from_str(json)?;
        let code_hash = hash_from_hex(&artifact.source.hash).map_err(|e| {
            BlueprintError::InvalidField {
                field: "source.hash",
                message: e.to_string(),
            }
        })?;

        let mut constructors = Vec::with_capacity(artifact.spec.constructors.len());
        for entry in artifact.spec.constructors {
            let raw = bytes_from_hex(&entry.selector).map_err(|e| BlueprintError::InvalidField {
                field: "selector",
                message: e.to_string(),
            })?;
            let selector: [u8; 4] =
                raw.as_slice()
                    .try_into()
                    .map_err(|_| BlueprintError::InvalidField {
                        field: "selector",
                        message: format!("expected 4 bytes, got {}", raw.len()),
                    })?;
            constructors.push(Constructor {
                label: entry.label,
                selector,
                args: entry
                    .args
                    .map(|args| args.into_iter().map(|a| a.label).collect()),
            });
        }

        Ok(Self {
            code_hash,
            constructors,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, BlueprintError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn constructor(&self, label: &str) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.label == label)
    }
}

impl ConstructorEncoder for Blueprint {
    fn code_hash(&self) -> CodeHash {
        self.code_hash
    }

    fn encode_constructor(&self, label: &str, args: &[Vec<u8>]) -> Result<Vec<u8>, BlueprintError> {
        let constructor = self
            .constructor(label)
            .ok_or_else(|| BlueprintError::UnknownConstructor(label.to_string()))?;
        if let Some(declared) = &constructor.args {
            if declared.len() != args.len() {
                return Err(BlueprintError::ArgumentCount {
                    label: label.to_string(),
                    expected: declared.len(),
                    got: args.len(),
                });
            }
        }

        let body: usize = args.iter().map(|a| 4 + a.len()).sum();
        let mut out = Vec::with_capacity(4 + body);
        out.extend_from_slice(&constructor.selector);
        for arg in args {
            let len = u32::try_from(arg.len()).map_err(|_| BlueprintError::InvalidField {
                field: "argument",
                message: format!("{} bytes exceeds u32", arg.len()),
            })?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(arg);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ARTIFACT: &str = r#"{
        "source": { "hash": "0x96ca5480eb52b8087b1e64cae52c75e6db037e1920320653584ef920db5d29d5" },
        "spec": {
            "constructors": [
                { "label": "default", "selector": "0xed4b9d1b" },
                { "label": "with_core", "selector": "0x9bae9d5e",
                  "args": [{ "label": "core_js" }, { "label": "settings" }, { "label": "brick_profile" }] }
            ]
        }
    }"#;

    #[test]
    fn test_parse_artifact() {
        let blueprint = Blueprint::from_json(ARTIFACT).unwrap();
        assert_eq!(blueprint.code_hash()[0], 0x96);
        assert_eq!(blueprint.constructors().len(), 2);
        let with_core = blueprint.constructor("with_core").unwrap();
        assert_eq!(with_core.selector, [0x9b, 0xae, 0x9d, 0x5e]);
        assert_eq!(with_core.args.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_encode_layout() {
        let blueprint = Blueprint::from_json(ARTIFACT).unwrap();
        let args = vec![b"abc".to_vec(), vec![], b"z".to_vec()];
        let encoded = blueprint.encode_constructor("with_core", &args).unwrap();
        assert_eq!(&encoded[..4], &[0x9b, 0xae, 0x9d, 0x5e]);
        assert_eq!(&encoded[4..8], &3u32.to_le_bytes());
        assert_eq!(&encoded[8..11], b"abc");
        assert_eq!(&encoded[11..15], &0u32.to_le_bytes());
        assert_eq!(encoded.len(), 4 + (4 + 3) + 4 + (4 + 1));
    }

    #[test]
    fn test_undeclared_args_accept_any_count() {
        let blueprint = Blueprint::from_json(ARTIFACT).unwrap();
        let encoded = blueprint.encode_constructor("default", &[]).unwrap();
        assert_eq!(encoded, vec![0xed, 0x4b, 0x9d, 0x1b]);
    }

    #[test]
    fn test_argument_count_checked() {
        let blueprint = Blueprint::from_json(ARTIFACT).unwrap();
        let err = blueprint
            .encode_constructor("with_core", &[b"only one".to_vec()])
            .unwrap_err();
        assert!(matches!(
            err,
            BlueprintError::ArgumentCount {
                expected: 3,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_constructor() {
        let blueprint = Blueprint::from_json(ARTIFACT).unwrap();
        assert!(matches!(
            blueprint.encode_constructor("new", &[]),
            Err(BlueprintError::UnknownConstructor(_))
        ));
    }

    #[test]
    fn test_bad_selector_rejected() {
        let json = ARTIFACT.replace("0xed4b9d1b", "0xed4b");
        assert!(matches!(
            Blueprint::from_json(&json),
            Err(BlueprintError::InvalidField { field: "selector", .. })
        ));
    }

    #[test]
    fn test_bad_code_hash_rejected() {
        let json = ARTIFACT.replace("0x96ca", "0xzzca");
        assert!(matches!(
            Blueprint::from_json(&json),
            Err(BlueprintError::InvalidField { field: "source.hash", .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ARTIFACT.as_bytes()).unwrap();
        let blueprint = Blueprint::from_file(file.path()).unwrap();
        assert_eq!(blueprint.constructors().len(), 2);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Blueprint::from_file(Path::new("/nonexistent/blueprint.contract")),
            Err(BlueprintError::Io(_))
        ));
    }
}
