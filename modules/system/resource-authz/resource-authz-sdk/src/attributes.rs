//! Attribute model shared by the request builder, the finder modules and the PDP.
//!
//! Attributes are identified by URI strings (see [`ids`]) and carry a single
//! typed value. Values resolved through designators and selectors are always
//! returned as an [`AttributeBag`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known attribute identifiers.
pub mod ids {
    /// Principal name of the requesting subject.
    pub const SUBJECT_ID: &str = "urn:oasis:names:tc:xacml:1.0:subject:subject-id";
    /// One effective role of the requesting subject.
    pub const SUBJECT_ROLE: &str = "urn:fedora:xacml:2.0:subject:role";
    /// Requested action name (store permission name).
    pub const ACTION_ID: &str = "urn:oasis:names:tc:xacml:1.0:action:action-id";
    /// Raw store path of the node or property being accessed.
    pub const RESOURCE_ID: &str = "urn:oasis:names:tc:xacml:1.0:resource:resource-id";
    /// Store workspace the resource lives in.
    pub const RESOURCE_WORKSPACE: &str = "urn:fedora:xacml:2.0:resource:resource-workspace";
    /// Resource scope; present only for destructive requests.
    pub const RESOURCE_SCOPE: &str = "urn:oasis:names:tc:xacml:1.0:resource:scope";
    /// Address the original request came from.
    pub const ORIGINAL_IP_ADDRESS: &str =
        "urn:fedora:xacml:2.0:environment:original-ip-address";
    pub const CURRENT_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-time";
    pub const CURRENT_DATE: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-date";
    pub const CURRENT_DATE_TIME: &str =
        "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";
    /// Category of the default (access) subject.
    pub const ACCESS_SUBJECT: &str =
        "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
}

/// Value of the scope attribute for requests that also affect descendants.
pub const SCOPE_DESCENDANTS: &str = "descendants";

/// XML-Schema data types understood by the attribute model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    AnyUri,
    Boolean,
    Integer,
    DateTime,
    Date,
    Time,
}

impl DataType {
    /// The XML-Schema URI of this data type.
    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            Self::String => "http://www.w3.org/2001/XMLSchema#string",
            Self::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            Self::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Self::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Self::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            Self::Date => "http://www.w3.org/2001/XMLSchema#date",
            Self::Time => "http://www.w3.org/2001/XMLSchema#time",
        }
    }
}

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    String(String),
    AnyUri(String),
    Boolean(bool),
    Integer(i64),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl AttributeValue {
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::AnyUri(_) => DataType::AnyUri,
            Self::Boolean(_) => DataType::Boolean,
            Self::Integer(_) => DataType::Integer,
            Self::DateTime(_) => DataType::DateTime,
            Self::Date(_) => DataType::Date,
            Self::Time(_) => DataType::Time,
        }
    }

    /// Borrow the textual payload of string-like values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::AnyUri(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a lexical value into the requested data type.
    ///
    /// Returns `None` when `raw` is not a valid lexical form of `data_type`.
    #[must_use]
    pub fn parse(data_type: DataType, raw: &str) -> Option<Self> {
        match data_type {
            DataType::String => Some(Self::String(raw.to_owned())),
            DataType::AnyUri => Some(Self::AnyUri(raw.to_owned())),
            DataType::Boolean => raw.parse().ok().map(Self::Boolean),
            DataType::Integer => raw.parse().ok().map(Self::Integer),
            DataType::DateTime => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| Self::DateTime(dt.with_timezone(&Utc))),
            DataType::Date => raw.parse().ok().map(Self::Date),
            DataType::Time => raw.parse().ok().map(Self::Time),
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) | Self::AnyUri(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Date(d) => write!(f, "{d}"),
            Self::Time(t) => write!(f, "{t}"),
        }
    }
}

/// A literal request attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub value: AttributeValue,
}

impl Attribute {
    #[must_use]
    pub fn new(id: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            id: id.into(),
            issuer: None,
            value,
        }
    }
}

/// A (possibly empty) bag of values of one data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeBag {
    pub data_type: DataType,
    pub values: Vec<AttributeValue>,
}

impl AttributeBag {
    #[must_use]
    pub fn empty(data_type: DataType) -> Self {
        Self {
            data_type,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn new(data_type: DataType, values: Vec<AttributeValue>) -> Self {
        Self { data_type, values }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a AttributeBag {
    type Item = &'a AttributeValue;
    type IntoIter = std::slice::Iter<'a, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Category an attribute designator targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignatorCategory {
    Subject,
    Resource,
    Action,
    Environment,
}

/// A typed reference to an attribute the PDP needs a value for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDesignator {
    pub category: DesignatorCategory,
    pub attribute_id: String,
    pub data_type: DataType,
    pub issuer: Option<String>,
    /// Subject category, only meaningful for subject designators.
    pub subject_category: Option<String>,
}

impl AttributeDesignator {
    #[must_use]
    pub fn new(
        category: DesignatorCategory,
        attribute_id: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            category,
            attribute_id: attribute_id.into(),
            data_type,
            issuer: None,
            subject_category: None,
        }
    }

    #[must_use]
    pub fn resource(attribute_id: impl Into<String>, data_type: DataType) -> Self {
        Self::new(DesignatorCategory::Resource, attribute_id, data_type)
    }
}

/// A store-specific query expression the PDP wants evaluated against the
/// current resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub context_path: String,
    pub data_type: DataType,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parse_respects_data_type() {
        assert_eq!(
            AttributeValue::parse(DataType::Integer, "42"),
            Some(AttributeValue::Integer(42))
        );
        assert_eq!(AttributeValue::parse(DataType::Integer, "forty-two"), None);
        assert_eq!(
            AttributeValue::parse(DataType::Boolean, "true"),
            Some(AttributeValue::Boolean(true))
        );
        assert!(matches!(
            AttributeValue::parse(DataType::DateTime, "2024-05-01T10:00:00Z"),
            Some(AttributeValue::DateTime(_))
        ));
    }

    #[test]
    fn string_like_values_expose_text() {
        assert_eq!(AttributeValue::string("reader").as_str(), Some("reader"));
        assert_eq!(
            AttributeValue::AnyUri("info:fedora/x".to_owned()).as_str(),
            Some("info:fedora/x")
        );
        assert_eq!(AttributeValue::Integer(1).as_str(), None);
    }

    #[test]
    fn value_serializes_with_type_tag() {
        let json = serde_json::to_value(AttributeValue::string("read")).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["value"], "read");
    }
}
