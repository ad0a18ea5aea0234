//! Object status values and the policy that validates them.
//!
//! Registries are allowed to publish status values beyond the ones a
//! mapping's schema lists. Whether such values are accepted is a
//! configuration decision: [`StatusPolicy::Closed`] accepts only the
//! mapping's published vocabulary, [`StatusPolicy::Open`] accepts any
//! well-formed token.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::component::{CodecContext, Component};
use crate::error::{EppError, Result};
use crate::fragment::{expect_element, Element};
use crate::object::ObjectMapping;

/// How status values are validated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Only the mapping's published values are accepted.
    Closed,
    /// Any token made of ASCII letters and digits, starting with a letter.
    #[default]
    Open,
}

impl StatusPolicy {
    pub fn accepts<M: ObjectMapping>(&self, value: &str) -> bool {
        match self {
            StatusPolicy::Closed => M::STATUS_VALUES.contains(&value),
            StatusPolicy::Open => is_status_token(value),
        }
    }
}

fn is_status_token(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// One `<status s="…" lang="…">reason</status>` entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectStatus<M: ObjectMapping> {
    pub value: String,
    pub reason: Option<String>,
    pub language: Option<String>,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> ObjectStatus<M> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: None,
            language: None,
            _mapping: PhantomData,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>, language: Option<&str>) -> Self {
        self.reason = Some(reason.into());
        self.language = language.map(str::to_string);
        self
    }

    /// Client-settable values carry the `client` prefix; the rest are server-managed.
    pub fn is_client_settable(&self) -> bool {
        self.value.starts_with("client")
    }
}

impl<M: ObjectMapping> Component for ObjectStatus<M> {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        if !ctx.config().status_policy.accepts::<M>(&self.value) {
            return Err(EppError::state(
                "status",
                format!("'{}' is not an accepted status for {}", self.value, M::NAMESPACE),
            ));
        }
        let mut element = Element::new(M::NAMESPACE, "status").with_attr("s", &self.value);
        if let Some(reason) = &self.reason {
            element = element
                .with_opt_attr("lang", self.language.as_deref())
                .with_text(reason);
        }
        Ok(element)
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "status")?;
        let value = element.required_attr("s")?;
        if !ctx.config().status_policy.accepts::<M>(value) {
            return Err(EppError::decode(
                "status",
                format!("'{value}' is not an accepted status"),
            ));
        }
        self.value = value.to_string();
        self.reason = Some(element.text().to_string()).filter(|r| !r.is_empty());
        self.language = element.attr("lang").map(str::to_string);
        Ok(())
    }
}
