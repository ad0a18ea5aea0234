//! The component contract every data element implements.
//!
//! A component turns its fields into a fragment (`encode`) and populates
//! itself from one (`decode`). Deep equality and deep copy come from
//! `PartialEq` and `Clone` over owned data, so a command stored after
//! submission never aliases memory the caller still holds.
//!
//! Root elements (the payload of a command, response or extension) are
//! additionally reachable as `Box<dyn Payload>`, which is what the
//! factory registry constructs and the envelope carries.

use std::any::Any;
use std::fmt;

use crate::config::CodecConfig;
use crate::error::{EppError, Result};
use crate::fragment::{schema_file, Attribute, Element, SCHEMA_LOCATION};

/// Configuration threaded through every encode and decode call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodecContext {
    config: CodecConfig,
}

impl CodecContext {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn language(&self) -> &str {
        &self.config.language
    }

    /// Declares the schema location of a root element, if configured.
    pub fn declare_schema(&self, element: &mut Element) {
        if self.config.emit_schema_location && element.attr(SCHEMA_LOCATION).is_none() {
            let location = format!("{} {}", element.namespace, schema_file(&element.namespace));
            element.set_attr(SCHEMA_LOCATION, location);
        }
    }
}

/// Bidirectional transform between a typed value and a fragment.
pub trait Component: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Build a fragment from the current fields.
    ///
    /// Required-field invariants are checked first and fail with a state
    /// error naming the missing field.
    fn encode(&self, ctx: &CodecContext) -> Result<Element>;

    /// Populate fields from a fragment. Unknown children are ignored.
    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()>;
}

/// A component that can stand as the root payload of a message.
pub trait RootElement: Component + Default {
    const NAMESPACE: &'static str;
    const ELEMENT: &'static str;

    /// Attributes carried by the enclosing command verb (e.g. `op` on `<transfer>`).
    fn verb_attributes(&self) -> Vec<Attribute> {
        Vec::new()
    }

    /// Absorb the enclosing command verb's attributes on decode.
    fn absorb_verb(&mut self, _verb: &Element) -> Result<()> {
        Ok(())
    }
}

/// Object-safe view of a [`RootElement`].
pub trait Payload: fmt::Debug + Send + Sync {
    fn namespace(&self) -> &'static str;
    fn element_name(&self) -> &'static str;
    fn encode_payload(&self, ctx: &CodecContext) -> Result<Element>;
    fn decode_payload(&mut self, element: &Element, ctx: &CodecContext) -> Result<()>;
    fn payload_verb_attributes(&self) -> Vec<Attribute>;
    fn absorb_payload_verb(&mut self, verb: &Element) -> Result<()>;
    fn clone_payload(&self) -> Box<dyn Payload>;
    fn eq_payload(&self, other: &dyn Payload) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: RootElement> Payload for T {
    fn namespace(&self) -> &'static str {
        T::NAMESPACE
    }

    fn element_name(&self) -> &'static str {
        T::ELEMENT
    }

    fn encode_payload(&self, ctx: &CodecContext) -> Result<Element> {
        let mut element = self.encode(ctx)?;
        ctx.declare_schema(&mut element);
        Ok(element)
    }

    fn decode_payload(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        self.decode(element, ctx)
    }

    fn payload_verb_attributes(&self) -> Vec<Attribute> {
        self.verb_attributes()
    }

    fn absorb_payload_verb(&mut self, verb: &Element) -> Result<()> {
        self.absorb_verb(verb)
    }

    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn eq_payload(&self, other: &dyn Payload) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Payload {
    pub fn downcast_ref<T: RootElement>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: RootElement>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl Clone for Box<dyn Payload> {
    fn clone(&self) -> Self {
        self.clone_payload()
    }
}

impl PartialEq for Box<dyn Payload> {
    fn eq(&self, other: &Self) -> bool {
        self.eq_payload(other.as_ref())
    }
}

// ── Required-field helpers ──────────────────────────────────────────────

/// Returns the value or a state error naming `field`.
pub fn require<'a, T>(value: &'a Option<T>, field: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| EppError::missing_field(field))
}

/// Fails unless `value` has non-whitespace content.
pub fn require_text<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(EppError::missing_field(field))
    } else {
        Ok(value)
    }
}

/// Fails unless the sequence has at least one entry.
pub fn require_non_empty<'a, T>(values: &'a [T], field: &str) -> Result<&'a [T]> {
    if values.is_empty() {
        Err(EppError::state(field, "at least one entry is required"))
    } else {
        Ok(values)
    }
}

/// Encodes an optional component, omitting it entirely when absent.
pub fn encode_opt<C: Component>(value: &Option<C>, ctx: &CodecContext) -> Result<Option<Element>> {
    value.as_ref().map(|v| v.encode(ctx)).transpose()
}

/// Decodes a fresh component from a fragment.
pub fn decode_new<C: Component + Default>(element: &Element, ctx: &CodecContext) -> Result<C> {
    let mut value = C::default();
    value.decode(element, ctx)?;
    Ok(value)
}

/// Decodes the named child if present.
pub fn decode_opt_child<C: Component + Default>(
    parent: &Element,
    name: &str,
    ctx: &CodecContext,
) -> Result<Option<C>> {
    parent
        .child(name)
        .map(|child| decode_new::<C>(child, ctx))
        .transpose()
}

/// Decodes every child with this local name, in document order.
pub fn decode_children<C: Component + Default>(
    parent: &Element,
    name: &str,
    ctx: &CodecContext,
) -> Result<Vec<C>> {
    parent
        .children_named(name)
        .map(|child| decode_new::<C>(child, ctx))
        .collect()
}
