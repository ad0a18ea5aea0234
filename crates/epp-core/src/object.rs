//! Object mapping descriptors and the small value records every mapping shares.

use std::fmt;
use std::marker::PhantomData;

use crate::component::{require_text, CodecContext, Component};
use crate::error::{EppError, Result};
use crate::fragment::{expect_element, Element};

/// Describes one provisionable object type (domain, host, contact, ...).
///
/// Generic records such as transfers and pending-action notifications are
/// written once and instantiated per mapping through this trait.
pub trait ObjectMapping:
    fmt::Debug + Clone + Copy + Default + PartialEq + Eq + Send + Sync + 'static
{
    /// Namespace URI of the mapping.
    const NAMESPACE: &'static str;
    /// Local name of the identifying child (`id` for contacts, `name` otherwise).
    const IDENTIFIER: &'static str;
    /// Status values the mapping publishes.
    const STATUS_VALUES: &'static [&'static str];
}

/// Authorization information (`<authInfo><pw roid=…>…</pw></authInfo>`).
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AuthInfo<M: ObjectMapping> {
    pub password: String,
    /// Repository id of the object whose password this is, when not the object itself.
    pub roid: Option<String>,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> fmt::Debug for AuthInfo<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("password", &"<redacted>")
            .field("roid", &self.roid)
            .finish()
    }
}

impl<M: ObjectMapping> AuthInfo<M> {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            roid: None,
            _mapping: PhantomData,
        }
    }

    pub fn with_roid(mut self, roid: impl Into<String>) -> Self {
        self.roid = Some(roid.into());
        self
    }
}

impl<M: ObjectMapping> Component for AuthInfo<M> {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let password = require_text(&self.password, "authorization-token")?;
        let pw = Element::leaf(M::NAMESPACE, "pw", password).with_opt_attr("roid", self.roid.as_deref());
        Ok(Element::new(M::NAMESPACE, "authInfo").with_child(pw))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "authInfo")?;
        let pw = element.required_child("pw")?;
        self.password = pw.text().to_string();
        self.roid = pw.attr("roid").map(str::to_string);
        Ok(())
    }
}

/// Unit of a registration period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    #[default]
    Year,
    Month,
}

impl PeriodUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Year => "y",
            PeriodUnit::Month => "m",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "y" => Some(PeriodUnit::Year),
            "m" => Some(PeriodUnit::Month),
            _ => None,
        }
    }
}

/// Registration or extension period (`<period unit="y">1</period>`), 1 to 99 units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Period<M: ObjectMapping> {
    pub value: u8,
    pub unit: PeriodUnit,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> Period<M> {
    pub fn years(value: u8) -> Self {
        Self {
            value,
            unit: PeriodUnit::Year,
            _mapping: PhantomData,
        }
    }

    pub fn months(value: u8) -> Self {
        Self {
            value,
            unit: PeriodUnit::Month,
            _mapping: PhantomData,
        }
    }
}

impl<M: ObjectMapping> Component for Period<M> {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        if !(1..=99).contains(&self.value) {
            return Err(EppError::state("period", format!("{} is outside 1..=99", self.value)));
        }
        Ok(Element::leaf(M::NAMESPACE, "period", self.value.to_string())
            .with_attr("unit", self.unit.as_str()))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "period")?;
        let unit = element.required_attr("unit")?;
        self.unit = PeriodUnit::parse(unit)
            .ok_or_else(|| EppError::decode("period", format!("unknown unit '{unit}'")))?;
        self.value = element
            .text()
            .parse::<u8>()
            .ok()
            .filter(|v| (1..=99).contains(v))
            .ok_or_else(|| EppError::decode("period", format!("invalid value '{}'", element.text())))?;
        Ok(())
    }
}
