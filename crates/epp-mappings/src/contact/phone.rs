use epp_core::fragment::expect_element;
use epp_core::{CodecContext, Component, Element, EppError, ObjectMapping, Result};
use serde::{Deserialize, Serialize};

use super::Contact;

/// Which telephone line an entry describes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneKind {
    #[default]
    Voice,
    Fax,
}

impl PhoneKind {
    pub fn element(&self) -> &'static str {
        match self {
            PhoneKind::Voice => "voice",
            PhoneKind::Fax => "fax",
        }
    }
}

/// A telephone number in `+CC.NUMBER` form with an optional extension.
///
/// The extension (`x` attribute) is kept exactly as given. When absent or
/// empty it is omitted from the wire, never sent as an empty attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Phone {
    pub kind: PhoneKind,
    pub number: String,
    pub extension: Option<String>,
}

impl Phone {
    pub fn voice(number: impl Into<String>) -> Self {
        Self {
            kind: PhoneKind::Voice,
            number: number.into(),
            extension: None,
        }
    }

    pub fn fax(number: impl Into<String>) -> Self {
        Self {
            kind: PhoneKind::Fax,
            number: number.into(),
            extension: None,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// `+` country code (1-3 digits) `.` subscriber number (1-14 digits).
fn is_e164(number: &str) -> bool {
    let Some(rest) = number.strip_prefix('+') else {
        return false;
    };
    let Some((cc, subscriber)) = rest.split_once('.') else {
        return false;
    };
    let digits = |s: &str, max: usize| !s.is_empty() && s.len() <= max && s.bytes().all(|b| b.is_ascii_digit());
    digits(cc, 3) && digits(subscriber, 14)
}

impl Component for Phone {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let field = self.kind.element();
        if !is_e164(&self.number) {
            return Err(EppError::state(
                field,
                format!("'{}' is not in +CC.NUMBER form", self.number),
            ));
        }
        Ok(Element::leaf(Contact::NAMESPACE, field, self.number.as_str())
            .with_opt_attr("x", self.extension.as_deref().filter(|x| !x.is_empty())))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        self.kind = match element.name.as_str() {
            "fax" => PhoneKind::Fax,
            _ => PhoneKind::Voice,
        };
        expect_element(element, Contact::NAMESPACE, self.kind.element())?;
        self.number = element.text().to_string();
        if !is_e164(&self.number) {
            return Err(EppError::decode(
                self.kind.element(),
                format!("'{}' is not in +CC.NUMBER form", self.number),
            ));
        }
        self.extension = element.attr("x").map(str::to_string);
        Ok(())
    }
}
