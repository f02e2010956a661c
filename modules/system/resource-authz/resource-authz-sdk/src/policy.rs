//! Policy documents and the policy id ↔ store path mapping.
//!
//! Only the root element of a document is interpreted here: its name decides
//! between [`PolicyKind::Policy`] and [`PolicyKind::PolicySet`] and its id
//! attribute gives the policy identifier. Everything else is opaque content
//! for the PDP.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyIdError, PolicyLoadError};

/// Scheme prefix used for policy ids unless configured otherwise.
pub const DEFAULT_POLICY_URI_PREFIX: &str = "info:fedora";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    Policy,
    PolicySet,
}

impl PolicyKind {
    /// Root element name of documents of this kind.
    #[must_use]
    pub fn element_name(self) -> &'static str {
        match self {
            Self::Policy => "Policy",
            Self::PolicySet => "PolicySet",
        }
    }

    /// Name of the root attribute holding the identifier.
    #[must_use]
    pub fn id_attribute(self) -> &'static str {
        match self {
            Self::Policy => "PolicyId",
            Self::PolicySet => "PolicySetId",
        }
    }

    fn from_element(name: &[u8]) -> Option<Self> {
        match name {
            b"Policy" => Some(Self::Policy),
            b"PolicySet" => Some(Self::PolicySet),
            _ => None,
        }
    }
}

/// A loaded policy or policy set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub id: String,
    pub kind: PolicyKind,
    /// Store path the document was loaded from, if any.
    pub source_path: Option<String>,
    pub content: Arc<[u8]>,
}

impl PolicyDocument {
    /// Parse and classify a policy document.
    ///
    /// The whole document is read so that malformed content is rejected here
    /// rather than inside the PDP.
    ///
    /// # Errors
    ///
    /// [`PolicyLoadError`] if the document is malformed, has an unrecognized
    /// root element or no identifier.
    pub fn parse(content: &[u8]) -> Result<Self, PolicyLoadError> {
        let (kind, id) = read_root(content)?;
        Ok(Self {
            id,
            kind,
            source_path: None,
            content: Arc::from(content),
        })
    }

    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Document content as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Extract the declared id of a policy document.
///
/// # Errors
///
/// See [`PolicyDocument::parse`].
pub fn policy_id_of(content: &[u8]) -> Result<String, PolicyLoadError> {
    read_root(content).map(|(_, id)| id)
}

fn read_root(content: &[u8]) -> Result<(PolicyKind, String), PolicyLoadError> {
    let mut reader = Reader::from_reader(content);
    let mut buf = Vec::new();
    let mut root: Option<(PolicyKind, String)> = None;
    let mut depth = 0_usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            PolicyLoadError::Malformed(format!("at byte {}: {e}", reader.error_position()))
        })?;
        match &event {
            Event::Start(e) | Event::Empty(e) if depth == 0 => {
                if root.is_some() {
                    return Err(PolicyLoadError::Malformed(
                        "more than one root element".to_owned(),
                    ));
                }
                root = Some(classify(e)?);
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof if depth > 0 => {
                return Err(PolicyLoadError::Malformed(format!(
                    "document ends with {depth} unclosed element(s)"
                )));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| PolicyLoadError::Malformed("document has no root element".to_owned()))
}

fn classify(root: &BytesStart<'_>) -> Result<(PolicyKind, String), PolicyLoadError> {
    let local = root.local_name();
    let Some(kind) = PolicyKind::from_element(local.as_ref()) else {
        return Err(PolicyLoadError::UnknownRoot(
            String::from_utf8_lossy(local.as_ref()).into_owned(),
        ));
    };

    let attr = root
        .try_get_attribute(kind.id_attribute())
        .map_err(|e| PolicyLoadError::Malformed(e.to_string()))?
        .ok_or(PolicyLoadError::MissingId)?;
    let id = attr
        .unescape_value()
        .map_err(|e| PolicyLoadError::Malformed(e.to_string()))?;
    if id.is_empty() {
        return Err(PolicyLoadError::MissingId);
    }
    Ok((kind, id.into_owned()))
}

/// Bidirectional mapping between policy ids and store paths.
///
/// `info:fedora/policies/GlobalRolesPolicySet` ↔ `/policies/GlobalRolesPolicySet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyIdMapper {
    prefix: String,
}

impl Default for PolicyIdMapper {
    fn default() -> Self {
        Self::new(DEFAULT_POLICY_URI_PREFIX)
    }
}

impl PolicyIdMapper {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Store path for a policy id.
    ///
    /// # Errors
    ///
    /// [`PolicyIdError::MissingPrefix`] if `id` lacks the scheme prefix or the
    /// remainder is not an absolute path.
    pub fn path_for_id<'a>(&self, id: &'a str) -> Result<&'a str, PolicyIdError> {
        id.strip_prefix(self.prefix.as_str())
            .filter(|path| path.starts_with('/'))
            .ok_or_else(|| PolicyIdError::MissingPrefix {
                id: id.to_owned(),
                prefix: self.prefix.clone(),
            })
    }

    /// Policy id for a store path.
    #[must_use]
    pub fn id_for_path(&self, path: &str) -> String {
        format!("{}{path}", self.prefix)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const POLICY_SET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PolicySet xmlns="urn:oasis:names:tc:xacml:2.0:policy:schema:os"
    PolicySetId="info:fedora/policies/GlobalRolesPolicySet"
    PolicyCombiningAlgId="urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable">
  <Target/>
  <PolicySetIdReference>info:fedora/policies/AdminRolePolicySet</PolicySetIdReference>
</PolicySet>"#;

    const POLICY: &str = r#"<Policy PolicyId="info:fedora/policies/ReadOnly" RuleCombiningAlgId="x"><Target/></Policy>"#;

    #[test]
    fn classifies_policy_set() {
        let doc = PolicyDocument::parse(POLICY_SET.as_bytes()).unwrap();
        assert_eq!(doc.kind, PolicyKind::PolicySet);
        assert_eq!(doc.id, "info:fedora/policies/GlobalRolesPolicySet");
        assert_eq!(doc.text(), Some(POLICY_SET));
    }

    #[test]
    fn classifies_policy() {
        let doc = PolicyDocument::parse(POLICY.as_bytes()).unwrap();
        assert_eq!(doc.kind, PolicyKind::Policy);
        assert_eq!(doc.id, "info:fedora/policies/ReadOnly");
    }

    #[test]
    fn prefixed_root_is_classified_by_local_name() {
        let xml = r#"<x:Policy xmlns:x="urn:x" PolicyId="info:fedora/p"></x:Policy>"#;
        assert_eq!(policy_id_of(xml.as_bytes()).unwrap(), "info:fedora/p");
    }

    #[test]
    fn rejects_unknown_root() {
        let err = PolicyDocument::parse(b"<Rule RuleId=\"r\"/>").unwrap_err();
        assert_eq!(err, PolicyLoadError::UnknownRoot("Rule".to_owned()));
    }

    #[test]
    fn rejects_missing_id() {
        let err = PolicyDocument::parse(b"<Policy RuleCombiningAlgId=\"x\"/>").unwrap_err();
        assert_eq!(err, PolicyLoadError::MissingId);
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = PolicyDocument::parse(b"<Policy PolicyId=\"p\"><Target></Policy>").unwrap_err();
        assert!(matches!(err, PolicyLoadError::Malformed(_)));
    }

    #[test]
    fn rejects_truncated_document() {
        let err = PolicyDocument::parse(br#"<Policy PolicyId="info:fedora/p"><Rule Effect="Permit">"#)
            .unwrap_err();
        assert!(matches!(err, PolicyLoadError::Malformed(_)));
    }

    #[test]
    fn rejects_second_root_element() {
        let err = PolicyDocument::parse(br#"<Policy PolicyId="info:fedora/p"/><Junk/>"#).unwrap_err();
        assert!(matches!(err, PolicyLoadError::Malformed(_)));

        let err = PolicyDocument::parse(br#"<Policy PolicyId="info:fedora/p"></Policy><Policy PolicyId="q"/>"#)
            .unwrap_err();
        assert!(matches!(err, PolicyLoadError::Malformed(_)));
    }

    #[test]
    fn nested_elements_are_accepted() {
        let doc = PolicyDocument::parse(
            br#"<Policy PolicyId="info:fedora/p"><Target/><Rule Effect="Permit"><Condition/></Rule></Policy>"#,
        )
        .unwrap();
        assert_eq!(doc.id, "info:fedora/p");
    }

    #[test]
    fn rejects_empty_document() {
        assert!(matches!(
            PolicyDocument::parse(b""),
            Err(PolicyLoadError::Malformed(_))
        ));
    }

    #[test]
    fn id_path_mapping_round_trips() {
        let mapper = PolicyIdMapper::default();
        let id = "info:fedora/policies/GlobalRolesPolicySet";
        let path = mapper.path_for_id(id).unwrap();
        assert_eq!(path, "/policies/GlobalRolesPolicySet");
        assert_eq!(mapper.id_for_path(path), id);

        for path in ["/", "/a", "/a/b/{ns}c", "/policies/x y"] {
            let id = mapper.id_for_path(path);
            assert_eq!(mapper.path_for_id(&id).unwrap(), path);
        }
    }

    #[test]
    fn id_without_prefix_is_rejected() {
        let mapper = PolicyIdMapper::default();
        assert!(matches!(
            mapper.path_for_id("urn:other/policies/x"),
            Err(PolicyIdError::MissingPrefix { .. })
        ));
    }

    #[test]
    fn id_continuing_the_prefix_is_rejected() {
        let mapper = PolicyIdMapper::default();
        assert!(matches!(
            mapper.path_for_id("info:fedoraX/evil"),
            Err(PolicyIdError::MissingPrefix { .. })
        ));
        assert!(matches!(
            mapper.path_for_id("info:fedora"),
            Err(PolicyIdError::MissingPrefix { .. })
        ));
    }
}
