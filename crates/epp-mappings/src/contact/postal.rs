use epp_core::component::require_text;
use epp_core::fragment::expect_element;
use epp_core::{CodecContext, Component, Element, EppError, ObjectMapping, Result};
use serde::{Deserialize, Serialize};

use super::Contact;

const MAX_STREETS: usize = 3;

/// Internationalized (7-bit ASCII only) or localized postal information.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostalType {
    #[default]
    Int,
    Loc,
}

impl PostalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostalType::Int => "int",
            PostalType::Loc => "loc",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "int" => Some(PostalType::Int),
            "loc" => Some(PostalType::Loc),
            _ => None,
        }
    }
}

/// `<addr>`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Address {
    /// Up to three street lines.
    pub streets: Vec<String>,
    pub city: String,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    /// ISO 3166 alpha-2 code.
    pub country_code: String,
}

impl Address {
    pub fn new(city: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country_code: country_code.into(),
            ..Default::default()
        }
    }

    pub fn with_street(mut self, street: impl Into<String>) -> Self {
        self.streets.push(street.into());
        self
    }

    pub fn with_state_province(mut self, sp: impl Into<String>) -> Self {
        self.state_province = Some(sp.into());
        self
    }

    pub fn with_postal_code(mut self, pc: impl Into<String>) -> Self {
        self.postal_code = Some(pc.into());
        self
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        self.streets
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.city.as_str()))
            .chain(self.state_province.as_deref())
            .chain(self.postal_code.as_deref())
    }
}

impl Component for Address {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let ns = Contact::NAMESPACE;
        if self.streets.len() > MAX_STREETS {
            return Err(EppError::state(
                "street",
                format!("{} lines given, at most {MAX_STREETS} allowed", self.streets.len()),
            ));
        }
        let city = require_text(&self.city, "city")?;
        let cc = &self.country_code;
        if cc.len() != 2 || !cc.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(EppError::state("country-code", format!("'{cc}' is not an alpha-2 code")));
        }
        Ok(Element::new(ns, "addr")
            .with_children(self.streets.iter().map(|s| Element::leaf(ns, "street", s.as_str())))
            .with_child(Element::leaf(ns, "city", city))
            .with_opt_child(self.state_province.as_ref().map(|sp| Element::leaf(ns, "sp", sp.as_str())))
            .with_opt_child(self.postal_code.as_ref().map(|pc| Element::leaf(ns, "pc", pc.as_str())))
            .with_child(Element::leaf(ns, "cc", cc.as_str())))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, Contact::NAMESPACE, "addr")?;
        self.streets = element.texts("street");
        self.city = element.required_text("city")?;
        self.state_province = element.optional_text("sp");
        self.postal_code = element.optional_text("pc");
        self.country_code = element.required_text("cc")?;
        Ok(())
    }
}

/// `<postalInfo type="int|loc">`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostalInfo {
    pub kind: PostalType,
    pub name: String,
    pub organization: Option<String>,
    pub address: Address,
}

impl PostalInfo {
    pub fn new(kind: PostalType, name: impl Into<String>, address: Address) -> Self {
        Self {
            kind,
            name: name.into(),
            organization: None,
            address,
        }
    }

    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }
}

impl Component for PostalInfo {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let ns = Contact::NAMESPACE;
        let name = require_text(&self.name, "postal-name")?;
        if self.kind == PostalType::Int {
            let mut texts = std::iter::once(name)
                .chain(self.organization.as_deref())
                .chain(self.address.texts());
            if texts.any(|t| !t.is_ascii()) {
                return Err(EppError::state(
                    "postal-info",
                    "internationalized postal information must be 7-bit ASCII",
                ));
            }
        }
        Ok(Element::new(ns, "postalInfo")
            .with_attr("type", self.kind.as_str())
            .with_child(Element::leaf(ns, "name", name))
            .with_opt_child(self.organization.as_ref().map(|o| Element::leaf(ns, "org", o.as_str())))
            .with_child(self.address.encode(ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, Contact::NAMESPACE, "postalInfo")?;
        let kind = element.required_attr("type")?;
        self.kind = PostalType::parse(kind)
            .ok_or_else(|| EppError::decode("postalInfo", format!("unknown type '{kind}'")))?;
        self.name = element.required_text("name")?;
        self.organization = element.optional_text("org");
        self.address.decode(element.required_child("addr")?, ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epp_core::component::decode_new;

    fn dulles() -> Address {
        Address::new("Dulles", "US")
            .with_street("123 Example Dr.")
            .with_street("Suite 100")
            .with_state_province("VA")
            .with_postal_code("20166-6503")
    }

    #[test]
    fn postal_info_roundtrip() {
        let ctx = CodecContext::default();
        let info = PostalInfo::new(PostalType::Int, "John Doe", dulles()).with_organization("Example Inc.");
        let el = info.encode(&ctx).unwrap();
        assert_eq!(el.attr("type"), Some("int"));
        let addr = el.child("addr").unwrap();
        assert_eq!(addr.texts("street").len(), 2);
        assert_eq!(decode_new::<PostalInfo>(&el, &ctx).unwrap(), info);
    }

    #[test]
    fn int_form_is_ascii_only() {
        let ctx = CodecContext::default();
        let info = PostalInfo::new(PostalType::Int, "Jürgen", Address::new("Köln", "DE"));
        assert_eq!(info.encode(&ctx).unwrap_err().subject(), "postal-info");

        let loc = PostalInfo { kind: PostalType::Loc, ..info };
        assert!(loc.encode(&ctx).is_ok());
    }

    #[test]
    fn address_limits() {
        let ctx = CodecContext::default();
        let four = dulles().with_street("a").with_street("b");
        assert_eq!(four.encode(&ctx).unwrap_err().subject(), "street");
        assert_eq!(Address::new("Dulles", "usa").encode(&ctx).unwrap_err().subject(), "country-code");
        assert_eq!(Address::new("", "US").encode(&ctx).unwrap_err().subject(), "city");
    }

    #[test]
    fn optional_address_parts_are_omitted() {
        let el = Address::new("Dulles", "US").encode(&CodecContext::default()).unwrap();
        let names: Vec<&str> = el.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["city", "cc"]);
    }
}
