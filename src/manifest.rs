//! # Manifest Parsing and Ordering
//!
//! A play manifest is a multi-document YAML stream. This module turns the raw
//! bytes into classified [`Document`]s and orders them for creation:
//!
//! ```text
//!   bytes ──► split_documents ──► Document::from_yaml ──► sort_documents
//!             (streaming decode,   (kind envelope)        (prerequisites
//!              nulls dropped)                               first)
//! ```
//!
//! ## Ordering
//!
//! [`sort_documents`] is a single-pass two-bucket split, not a dependency
//! graph. Pods and Deployments keep their relative order at the back; every
//! other document is pushed to the front, so prerequisites come out in
//! reverse manifest order:
//!
//! ```text
//!   [Pod A, PVC X, Pod B, PVC Y]  ──►  [PVC Y, PVC X, Pod A, Pod B]
//! ```

use crate::constants::MAX_MANIFEST_SIZE;
use crate::error::{Error, Result};
use crate::kube::TypeMeta;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use tracing::debug;

// =============================================================================
// Kind
// =============================================================================

/// Kubernetes kind of a manifest document, as far as the engine cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// `kind: Pod`.
    Pod,
    /// `kind: Deployment`.
    Deployment,
    /// `kind: PersistentVolumeClaim`.
    PersistentVolumeClaim,
    /// Any other kind, including `ConfigMap` embedded in the manifest.
    Unsupported(String),
}

impl Kind {
    /// Classifies a `kind` string. Matching is case-sensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Pod" => Self::Pod,
            "Deployment" => Self::Deployment,
            "PersistentVolumeClaim" => Self::PersistentVolumeClaim,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Returns the declared kind string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::Unsupported(name) => name,
        }
    }

    /// Returns true for kinds that produce pods.
    #[must_use]
    pub fn is_workload(&self) -> bool {
        matches!(self, Self::Pod | Self::Deployment)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Document
// =============================================================================

/// One YAML document of a manifest, in canonical form, with its kind.
#[derive(Debug, Clone)]
pub struct Document {
    kind: Kind,
    yaml: String,
}

impl Document {
    /// Classifies a single canonical YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the `apiVersion`/`kind`/`metadata` envelope
    /// cannot be decoded.
    pub fn from_yaml(yaml: String) -> Result<Self> {
        let meta: TypeMeta =
            serde_yaml::from_str(&yaml).map_err(|e| Error::parse("kube YAML", e))?;
        Ok(Self {
            kind: Kind::from_name(&meta.kind),
            yaml,
        })
    }

    /// Returns the document kind.
    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Returns the canonical YAML text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.yaml
    }

    /// Decodes the document into its kind-specific schema.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_yaml::from_str(&self.yaml)
            .map_err(|e| Error::parse(format!("YAML as Kube {}", self.kind), e))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Splits a multi-document YAML stream into canonical per-document YAML.
///
/// Documents are decoded one at a time. Aliases are expanded and `<<` merge
/// keys resolved before re-serializing. Empty documents (`---` followed by
/// nothing, or an explicit `null`) are dropped.
///
/// # Errors
///
/// Returns [`Error::Parse`] on the first document that is not valid YAML.
pub fn split_documents(content: &[u8]) -> Result<Vec<String>> {
    let mut documents = Vec::new();

    for de in serde_yaml::Deserializer::from_slice(content) {
        let mut value = serde_yaml::Value::deserialize(de)
            .map_err(|e| Error::parse("multi doc yaml", e))?;
        if value.is_null() {
            continue;
        }
        value
            .apply_merge()
            .map_err(|e| Error::parse("multi doc yaml", e))?;
        let document =
            serde_yaml::to_string(&value).map_err(|e| Error::parse("individual doc yaml", e))?;
        documents.push(document);
    }

    Ok(documents)
}

/// Parses a manifest into classified documents, in manifest order.
///
/// # Errors
///
/// - [`Error::ManifestTooLarge`] above `MAX_MANIFEST_SIZE`
/// - [`Error::Parse`] for invalid YAML or an invalid kind envelope
pub fn parse_manifest(content: &[u8]) -> Result<Vec<Document>> {
    if content.len() > MAX_MANIFEST_SIZE {
        return Err(Error::ManifestTooLarge {
            size: content.len(),
            limit: MAX_MANIFEST_SIZE,
        });
    }

    let documents = split_documents(content)?
        .into_iter()
        .map(Document::from_yaml)
        .collect::<Result<Vec<_>>>()?;

    debug!(count = documents.len(), "parsed manifest documents");
    Ok(documents)
}

/// Orders documents so that pod prerequisites are created first.
///
/// See the module documentation for the exact ordering rule.
#[must_use]
pub fn sort_documents(documents: Vec<Document>) -> Vec<Document> {
    let mut sorted = VecDeque::with_capacity(documents.len());

    for document in documents {
        if document.kind.is_workload() {
            sorted.push_back(document);
        } else {
            sorted.push_front(document);
        }
    }

    sorted.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(documents: &[Document]) -> Vec<String> {
        documents
            .iter()
            .map(|d| {
                let meta: TypeMeta = serde_yaml::from_str(d.as_str()).unwrap();
                format!("{} {}", meta.kind, meta.metadata.name)
            })
            .collect()
    }

    #[test]
    fn test_split_drops_empty_documents() {
        let content = b"---\n---\nkind: Pod\nmetadata:\n  name: a\n---\n\n---\nkind: Pod\nmetadata:\n  name: b\n";
        let documents = split_documents(content).unwrap();
        assert_eq!(documents.len(), 2);
    }

    #[test]
    fn test_split_rejects_invalid_document() {
        let content = b"kind: Pod\n---\nkind: [unclosed\n";
        let err = split_documents(content).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_split_resolves_merge_keys() {
        let content = b"kind: Pod
metadata:
  name: web
spec:
  containers:
    - &base
      name: a
      image: alpine
      workingDir: /srv
    - <<: *base
      name: b
";
        let documents = split_documents(content).unwrap();
        let pod: crate::kube::Pod = serde_yaml::from_str(&documents[0]).unwrap();
        let b = &pod.spec.containers[1];

        assert_eq!(b.name, "b");
        assert_eq!(b.image, "alpine");
        assert_eq!(b.working_dir.as_deref(), Some("/srv"));
        assert!(!documents[0].contains("<<"));
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split_documents(b"").unwrap().is_empty());
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(Kind::from_name("Pod"), Kind::Pod);
        assert_eq!(Kind::from_name("Deployment"), Kind::Deployment);
        assert_eq!(
            Kind::from_name("PersistentVolumeClaim"),
            Kind::PersistentVolumeClaim
        );
        assert_eq!(
            Kind::from_name("ConfigMap"),
            Kind::Unsupported("ConfigMap".to_string())
        );
        assert_eq!(Kind::from_name("pod"), Kind::Unsupported("pod".to_string()));
    }

    #[test]
    fn test_envelope_rejects_scalar_document() {
        let err = Document::from_yaml("just a string\n".to_string()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_sort_reverses_prerequisites() {
        let content = b"kind: Pod\nmetadata:\n  name: A\n---\nkind: PersistentVolumeClaim\nmetadata:\n  name: X\n---\nkind: Pod\nmetadata:\n  name: B\n---\nkind: PersistentVolumeClaim\nmetadata:\n  name: Y\n";
        let sorted = sort_documents(parse_manifest(content).unwrap());
        assert_eq!(
            names(&sorted),
            vec![
                "PersistentVolumeClaim Y",
                "PersistentVolumeClaim X",
                "Pod A",
                "Pod B"
            ]
        );
    }

    #[test]
    fn test_sort_keeps_workload_order() {
        let content = b"kind: Deployment\nmetadata:\n  name: d\n---\nkind: ConfigMap\nmetadata:\n  name: c\n---\nkind: Pod\nmetadata:\n  name: p\n";
        let sorted = sort_documents(parse_manifest(content).unwrap());
        assert_eq!(names(&sorted), vec!["ConfigMap c", "Deployment d", "Pod p"]);
    }

    #[test]
    fn test_manifest_size_limit() {
        let content = vec![b'#'; MAX_MANIFEST_SIZE + 1];
        let err = parse_manifest(&content).unwrap_err();
        assert!(matches!(err, Error::ManifestTooLarge { .. }));
    }
}
