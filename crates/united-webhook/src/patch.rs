//! Annotation patch synthesis
//!
//! Produces the JSON Patch operations that bring a Deployment's annotation map
//! up to date with a set of desired annotations. Only `add` and `replace` are
//! ever emitted, and only against `/metadata/annotations` or a single key below
//! it.

use std::collections::BTreeMap;

use json_patch::{AddOperation, Patch, PatchOperation, ReplaceOperation};
use json_patch::jsonptr::PointerBuf;
use serde_json::Value;

/// Annotation map as carried in `metadata.annotations`
pub type AnnotationMap = BTreeMap<String, String>;

/// Value carried by an annotation patch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchValue {
    /// A whole annotation map, used when creating `/metadata/annotations`
    Map(AnnotationMap),
    /// A single annotation value
    Scalar(String),
}

impl From<PatchValue> for Value {
    fn from(value: PatchValue) -> Self {
        match value {
            PatchValue::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            PatchValue::Scalar(s) => Value::String(s),
        }
    }
}

/// A single operation against the annotation map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationPatch {
    /// Create the map or a missing key
    Add {
        /// Target location
        path: PointerBuf,
        /// Value to insert
        value: PatchValue,
    },
    /// Overwrite an existing key
    Replace {
        /// Target location
        path: PointerBuf,
        /// Replacement value
        value: PatchValue,
    },
}

impl AnnotationPatch {
    /// Target location of the operation
    pub fn path(&self) -> &PointerBuf {
        match self {
            AnnotationPatch::Add { path, .. } | AnnotationPatch::Replace { path, .. } => path,
        }
    }

    /// Value written by the operation
    pub fn value(&self) -> &PatchValue {
        match self {
            AnnotationPatch::Add { value, .. } | AnnotationPatch::Replace { value, .. } => value,
        }
    }
}

impl From<AnnotationPatch> for PatchOperation {
    fn from(op: AnnotationPatch) -> Self {
        match op {
            AnnotationPatch::Add { path, value } => PatchOperation::Add(AddOperation {
                path,
                value: value.into(),
            }),
            AnnotationPatch::Replace { path, value } => PatchOperation::Replace(ReplaceOperation {
                path,
                value: value.into(),
            }),
        }
    }
}

/// Pointer to `/metadata/annotations`
pub fn annotations_root() -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "annotations"])
}

/// Pointer to `/metadata/annotations/<key>`, with `/` and `~` escaped
pub fn annotation_key(key: &str) -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "annotations", key])
}

/// Build the operations that set every key of `additions` on top of `current`.
///
/// Keys are visited in sorted order, so the output is deterministic. An absent
/// or empty map is created with a single whole-map `add`; after that, missing
/// keys are added individually so sibling annotations are never overwritten.
/// Keys that already hold a non-empty value are replaced in place.
pub fn synthesize(
    current: Option<&AnnotationMap>,
    additions: &AnnotationMap,
) -> Vec<AnnotationPatch> {
    let mut map_exists = current.is_some_and(|c| !c.is_empty());
    let mut ops = Vec::with_capacity(additions.len());

    for (key, value) in additions {
        let has_value = current
            .and_then(|c| c.get(key))
            .is_some_and(|v| !v.is_empty());

        let op = if !map_exists {
            map_exists = true;
            AnnotationPatch::Add {
                path: annotations_root(),
                value: PatchValue::Map(BTreeMap::from([(key.clone(), value.clone())])),
            }
        } else if has_value {
            AnnotationPatch::Replace {
                path: annotation_key(key),
                value: PatchValue::Scalar(value.clone()),
            }
        } else {
            AnnotationPatch::Add {
                path: annotation_key(key),
                value: PatchValue::Scalar(value.clone()),
            }
        };
        ops.push(op);
    }

    ops
}

/// Convert synthesized operations into an RFC 6902 patch document
pub fn to_json_patch(ops: Vec<AnnotationPatch>) -> Patch {
    Patch(ops.into_iter().map(PatchOperation::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marker() -> AnnotationMap {
        BTreeMap::from([("marker".to_string(), "true".to_string())])
    }

    #[test]
    fn absent_map_gets_whole_map_add() {
        let ops = synthesize(None, &marker());

        assert_eq!(
            ops,
            vec![AnnotationPatch::Add {
                path: annotations_root(),
                value: PatchValue::Map(marker()),
            }]
        );
    }

    #[test]
    fn empty_map_gets_whole_map_add() {
        let ops = synthesize(Some(&AnnotationMap::new()), &marker());

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path().as_str(), "/metadata/annotations");
        assert_eq!(ops[0].value(), &PatchValue::Map(marker()));
    }

    #[test]
    fn existing_value_is_replaced_in_place() {
        let current = BTreeMap::from([("marker".to_string(), "false".to_string())]);
        let ops = synthesize(Some(&current), &marker());

        assert_eq!(
            ops,
            vec![AnnotationPatch::Replace {
                path: annotation_key("marker"),
                value: PatchValue::Scalar("true".to_string()),
            }]
        );
    }

    #[test]
    fn missing_key_in_populated_map_is_added_by_key() {
        let current = BTreeMap::from([("team".to_string(), "core".to_string())]);
        let ops = synthesize(Some(&current), &marker());

        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], AnnotationPatch::Add { .. }));
        assert_eq!(ops[0].path().as_str(), "/metadata/annotations/marker");
        assert_eq!(ops[0].value(), &PatchValue::Scalar("true".to_string()));
    }

    #[test]
    fn empty_value_in_populated_map_is_added_by_key() {
        let current = BTreeMap::from([
            ("team".to_string(), "core".to_string()),
            ("marker".to_string(), String::new()),
        ]);
        let ops = synthesize(Some(&current), &marker());

        assert!(matches!(ops[0], AnnotationPatch::Add { .. }));
        assert_eq!(ops[0].path().as_str(), "/metadata/annotations/marker");
    }

    #[test]
    fn only_first_key_creates_the_map() {
        let additions = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        let ops = synthesize(None, &additions);

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].path().as_str(), "/metadata/annotations");
        assert_eq!(ops[1].path().as_str(), "/metadata/annotations/b");
    }

    #[test]
    fn key_with_slash_and_tilde_is_escaped() {
        let path = annotation_key("example.com/owner~x");
        assert_eq!(path.as_str(), "/metadata/annotations/example.com~1owner~0x");
    }

    #[test]
    fn no_additions_yield_no_operations() {
        assert!(synthesize(None, &AnnotationMap::new()).is_empty());
    }

    #[test]
    fn json_patch_document_uses_add_and_replace() {
        let current = BTreeMap::from([("a".to_string(), "old".to_string())]);
        let additions = BTreeMap::from([
            ("a".to_string(), "new".to_string()),
            ("b".to_string(), "x".to_string()),
        ]);
        let patch = to_json_patch(synthesize(Some(&current), &additions));

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([
                {"op": "replace", "path": "/metadata/annotations/a", "value": "new"},
                {"op": "add", "path": "/metadata/annotations/b", "value": "x"}
            ])
        );
    }

    #[test]
    fn applied_patch_preserves_sibling_annotations() {
        let mut doc = json!({"metadata": {"annotations": {"team": "core"}}});
        let current = BTreeMap::from([("team".to_string(), "core".to_string())]);
        let patch = to_json_patch(synthesize(Some(&current), &marker()));

        json_patch::patch(&mut doc, &patch.0).unwrap();

        assert_eq!(
            doc["metadata"]["annotations"],
            json!({"team": "core", "marker": "true"})
        );
    }
}
