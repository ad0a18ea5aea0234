//! `<check>` command and `<chkData>` response, shared by every object type.

use std::marker::PhantomData;

use epp_core::component::{require_non_empty, require_text};
use epp_core::fragment::{expect_element, format_bool, parse_bool};
use epp_core::{CodecContext, Component, Element, EppError, ObjectMapping, Result, RootElement};

/// Asks whether objects can be provisioned, one identifier per entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckCommand<M: ObjectMapping> {
    pub identifiers: Vec<String>,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> CheckCommand<M> {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            _mapping: PhantomData,
        }
    }
}

impl<M: ObjectMapping> Component for CheckCommand<M> {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let identifiers = require_non_empty(&self.identifiers, "object-identifier")?;
        let mut element = Element::new(M::NAMESPACE, "check");
        for id in identifiers {
            element.push(Element::leaf(M::NAMESPACE, M::IDENTIFIER, require_text(id, "object-identifier")?));
        }
        Ok(element)
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "check")?;
        self.identifiers = element.texts(M::IDENTIFIER);
        if self.identifiers.is_empty() {
            return Err(EppError::missing_child(M::IDENTIFIER));
        }
        Ok(())
    }
}

impl<M: ObjectMapping> RootElement for CheckCommand<M> {
    const NAMESPACE: &'static str = M::NAMESPACE;
    const ELEMENT: &'static str = "check";
}

/// One `<cd>` entry of a check response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckResult {
    pub identifier: String,
    pub available: bool,
    /// Why the object is unavailable, when the server says.
    pub reason: Option<String>,
}

impl CheckResult {
    pub fn available(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            available: true,
            reason: None,
        }
    }

    pub fn unavailable(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            available: false,
            reason: Some(reason.into()),
        }
    }
}

/// `<chkData>`: availability of each checked object, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckData<M: ObjectMapping> {
    pub results: Vec<CheckResult>,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> CheckData<M> {
    pub fn new(results: Vec<CheckResult>) -> Self {
        Self {
            results,
            _mapping: PhantomData,
        }
    }

    pub fn is_available(&self, identifier: &str) -> Option<bool> {
        self.results
            .iter()
            .find(|r| r.identifier == identifier)
            .map(|r| r.available)
    }
}

impl<M: ObjectMapping> Component for CheckData<M> {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let results = require_non_empty(&self.results, "check-results")?;
        let ns = M::NAMESPACE;
        let mut element = Element::new(ns, "chkData");
        for result in results {
            let id = require_text(&result.identifier, "object-identifier")?;
            element.push(
                Element::new(ns, "cd")
                    .with_child(
                        Element::leaf(ns, M::IDENTIFIER, id).with_attr("avail", format_bool(result.available)),
                    )
                    .with_opt_child(result.reason.as_ref().map(|r| Element::leaf(ns, "reason", r.as_str()))),
            );
        }
        Ok(element)
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "chkData")?;
        self.results = element
            .children_named("cd")
            .map(|cd| -> Result<CheckResult> {
                let id = cd.required_child(M::IDENTIFIER)?;
                Ok(CheckResult {
                    identifier: id.text().to_string(),
                    available: parse_bool("avail", id.required_attr("avail")?)?,
                    reason: cd.optional_text("reason"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if self.results.is_empty() {
            return Err(EppError::missing_child("cd"));
        }
        Ok(())
    }
}

impl<M: ObjectMapping> RootElement for CheckData<M> {
    const NAMESPACE: &'static str = M::NAMESPACE;
    const ELEMENT: &'static str = "chkData";
}
