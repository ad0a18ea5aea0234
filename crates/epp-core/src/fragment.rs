//! Owned, namespace-qualified document fragments.
//!
//! The codec consumes and produces these trees; turning them into or out
//! of XML text is the transport's job. Content is never mixed: an element
//! carries either child elements or text.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EppError, Result};

/// XML Schema instance namespace, used for `xsi:schemaLocation`.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Qualified name of the schema location attribute.
pub const SCHEMA_LOCATION: &str = "xsi:schemaLocation";

/// A single attribute. Names are kept as written (`x`, `op`, `xsi:schemaLocation`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A namespace-qualified element with ordered attributes and children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Element {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Element holding only text.
    pub fn leaf(namespace: &str, name: &str, text: impl Into<String>) -> Self {
        Self::new(namespace, name).with_text(text)
    }

    /// `true` when this element has the given namespace and local name.
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }

    /// `{namespace}name`, for diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{{{}}}{}", self.namespace, self.name)
    }

    // ── Building ─────────────────────────────────────────────────────

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Adds the attribute only when a value is present.
    pub fn with_opt_attr(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_attr(name, value),
            None => self,
        }
    }

    /// Sets or replaces an attribute, keeping its original position.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Appends the child when present; absent optional children are never emitted.
    pub fn with_opt_child(mut self, child: Option<Element>) -> Self {
        if let Some(child) = child {
            self.children.push(child);
        }
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    // ── Reading ──────────────────────────────────────────────────────

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn required_attr(&self, name: &str) -> Result<&str> {
        self.attr(name)
            .ok_or_else(|| EppError::decode(&self.name, format!("missing attribute '{name}'")))
    }

    /// Trimmed text content, empty when there is none.
    pub fn text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }

    /// First child with this local name in this element's own namespace.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_in(&self.namespace, name)
    }

    pub fn child_in(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// All children with this local name in this element's own namespace.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter(move |c| c.namespace == self.namespace && c.name == name)
    }

    pub fn first_child(&self) -> Option<&Element> {
        self.children.first()
    }

    pub fn required_child(&self, name: &str) -> Result<&Element> {
        self.child(name).ok_or_else(|| EppError::missing_child(name))
    }

    pub fn required_child_in(&self, namespace: &str, name: &str) -> Result<&Element> {
        self.child_in(namespace, name)
            .ok_or_else(|| EppError::missing_child(name))
    }

    /// Text of a required, non-empty child.
    pub fn required_text(&self, name: &str) -> Result<String> {
        let text = self.required_child(name)?.text();
        if text.is_empty() {
            return Err(EppError::decode(name, "must not be empty"));
        }
        Ok(text.to_string())
    }

    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text().to_string())
    }

    pub fn texts(&self, name: &str) -> Vec<String> {
        self.children_named(name)
            .map(|c| c.text().to_string())
            .collect()
    }

    pub fn required_timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
        parse_timestamp(name, self.required_child(name)?.text())
    }

    pub fn optional_timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        self.child(name)
            .map(|c| parse_timestamp(name, c.text()))
            .transpose()
    }
}

/// Fails with a decode error unless `element` is `{namespace}name`.
pub fn expect_element(element: &Element, namespace: &str, name: &str) -> Result<()> {
    if element.is(namespace, name) {
        Ok(())
    } else {
        Err(EppError::decode(
            &element.name,
            format!(
                "expected {{{namespace}}}{name}, found {}",
                element.qualified_name()
            ),
        ))
    }
}

/// RFC 3339 in UTC with a `Z` suffix; fractional seconds are kept exactly.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(element: &str, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EppError::decode(element, format!("invalid timestamp '{text}': {e}")))
}

/// XML Schema boolean: `1`/`true` or `0`/`false`.
pub fn parse_bool(element: &str, text: &str) -> Result<bool> {
    match text.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(EppError::decode(element, format!("invalid boolean '{other}'"))),
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Schema file for a namespace URI: `urn:ietf:params:xml:ns:contact-1.0` → `contact-1.0.xsd`.
pub fn schema_file(namespace: &str) -> String {
    let tail = namespace
        .rsplit(|c| c == ':' || c == '/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(namespace);
    format!("{tail}.xsd")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NS: &str = "urn:ietf:params:xml:ns:contact-1.0";

    fn sample() -> Element {
        Element::new(NS, "check")
            .with_child(Element::leaf(NS, "id", "sh8013"))
            .with_child(Element::leaf(NS, "id", " sah8013 "))
            .with_child(Element::leaf("urn:other", "id", "foreign"))
    }

    #[test]
    fn child_lookup_is_namespace_scoped() {
        let el = sample();
        assert_eq!(el.texts("id"), vec!["sh8013", "sah8013"]);
        assert_eq!(el.child_in("urn:other", "id").unwrap().text(), "foreign");
        assert!(el.child("missing").is_none());
    }

    #[test]
    fn required_child_names_the_element() {
        let err = sample().required_child("postalInfo").unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.subject(), "postalInfo");
    }

    #[test]
    fn empty_required_text_is_rejected() {
        let el = Element::new(NS, "info").with_child(Element::leaf(NS, "id", "  "));
        assert!(el.required_text("id").unwrap_err().is_decode());
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut el = Element::new(NS, "voice").with_attr("x", "1").with_attr("y", "2");
        el.set_attr("x", "3");
        assert_eq!(el.attributes[0].value, "3");
        assert_eq!(el.attributes.len(), 2);
    }

    #[test]
    fn optional_attr_is_omitted_when_absent() {
        let el = Element::new(NS, "voice").with_opt_attr("x", None);
        assert!(el.attributes.is_empty());
    }

    #[test]
    fn timestamps_round_trip_with_fraction() {
        let at = Utc.with_ymd_and_hms(1999, 4, 4, 22, 0, 0).unwrap()
            + chrono::Duration::milliseconds(100);
        let text = format_timestamp(&at);
        assert_eq!(text, "1999-04-04T22:00:00.100Z");
        assert_eq!(parse_timestamp("paDate", &text).unwrap(), at);
        assert_eq!(
            parse_timestamp("paDate", "1999-04-04T22:00:00.0Z").unwrap(),
            Utc.with_ymd_and_hms(1999, 4, 4, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn bad_timestamp_names_element() {
        let err = parse_timestamp("crDate", "yesterday").unwrap_err();
        assert_eq!(err.subject(), "crDate");
    }

    #[test]
    fn booleans() {
        assert!(parse_bool("avail", "1").unwrap());
        assert!(parse_bool("avail", "true").unwrap());
        assert!(!parse_bool("avail", "0").unwrap());
        assert!(parse_bool("avail", "yes").is_err());
        assert_eq!(format_bool(true), "1");
    }

    #[test]
    fn schema_file_from_namespace() {
        assert_eq!(schema_file(NS), "contact-1.0.xsd");
        assert_eq!(schema_file("urn:ietf:params:xml:ns:epp-1.0"), "epp-1.0.xsd");
    }

    #[test]
    fn fragments_serialize_with_serde() {
        let el = sample();
        let json = serde_json::to_string(&el).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(el, back);
    }
}
