//! Contact mapping (`urn:ietf:params:xml:ns:contact-1.0`).

mod phone;
mod postal;

use chrono::{DateTime, Utc};
use epp_core::component::{
    decode_children, decode_opt_child, decode_new, encode_opt, require, require_non_empty, require_text,
};
use epp_core::fragment::{expect_element, format_timestamp};
use epp_core::{
    AuthInfo, CodecContext, Component, Element, EppError, ObjectMapping, ObjectStatus,
    PendingActionNotification, Result, RootElement, TransferCommand, TransferData,
};

use crate::check::{CheckCommand, CheckData};
use crate::info::{DeleteCommand, InfoCommand};

pub use phone::{Phone, PhoneKind};
pub use postal::{Address, PostalInfo, PostalType};

/// Contact objects: identified by `<contact:id>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Contact;

impl ObjectMapping for Contact {
    const NAMESPACE: &'static str = "urn:ietf:params:xml:ns:contact-1.0";
    const IDENTIFIER: &'static str = "id";
    const STATUS_VALUES: &'static [&'static str] = &[
        "clientDeleteProhibited",
        "clientTransferProhibited",
        "clientUpdateProhibited",
        "linked",
        "ok",
        "pendingCreate",
        "pendingDelete",
        "pendingTransfer",
        "pendingUpdate",
        "serverDeleteProhibited",
        "serverTransferProhibited",
        "serverUpdateProhibited",
    ];
}

pub type ContactCheck = CheckCommand<Contact>;
pub type ContactCheckData = CheckData<Contact>;
pub type ContactInfo = InfoCommand<Contact>;
pub type ContactDelete = DeleteCommand<Contact>;
pub type ContactTransfer = TransferCommand<Contact>;
pub type ContactTransferData = TransferData<Contact>;
pub type ContactPendingAction = PendingActionNotification<Contact>;
pub type ContactStatus = ObjectStatus<Contact>;

const NS: &str = Contact::NAMESPACE;
const ID_LEN: std::ops::RangeInclusive<usize> = 3..=16;

fn validate_id(id: &str) -> Result<&str> {
    let id = require_text(id, "contact-id")?;
    if !ID_LEN.contains(&id.chars().count()) {
        return Err(EppError::state(
            "contact-id",
            format!("'{id}' must be {} to {} characters", ID_LEN.start(), ID_LEN.end()),
        ));
    }
    Ok(id)
}

fn validate_postal_info(postal_info: &[PostalInfo]) -> Result<()> {
    require_non_empty(postal_info, "postal-info")?;
    let ints = postal_info.iter().filter(|p| p.kind == PostalType::Int).count();
    if postal_info.len() > 2 || ints > 1 || postal_info.len() - ints > 1 {
        return Err(EppError::state(
            "postal-info",
            "at most one int and one loc entry are allowed",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<&str> {
    let email = require_text(email, "email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(EppError::state("email", format!("'{email}' is not an address"))),
    }
}

/// Encodes the voice/fax/email block shared by create and info.
fn encode_lines(
    voice: &Option<Phone>,
    fax: &Option<Phone>,
    email: &str,
    ctx: &CodecContext,
) -> Result<Vec<Element>> {
    for (line, expected) in [(voice, PhoneKind::Voice), (fax, PhoneKind::Fax)] {
        if let Some(phone) = line {
            if phone.kind != expected {
                return Err(EppError::state(
                    expected.element(),
                    format!("a {} number cannot fill this line", phone.kind.element()),
                ));
            }
        }
    }
    let mut lines = Vec::with_capacity(3);
    lines.extend(encode_opt(voice, ctx)?);
    lines.extend(encode_opt(fax, ctx)?);
    lines.push(Element::leaf(NS, "email", validate_email(email)?));
    Ok(lines)
}

/// Creates a contact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactCreate {
    pub id: String,
    pub postal_info: Vec<PostalInfo>,
    pub voice: Option<Phone>,
    pub fax: Option<Phone>,
    pub email: String,
    pub auth_info: Option<AuthInfo<Contact>>,
}

impl ContactCreate {
    pub fn new(id: impl Into<String>, postal_info: PostalInfo, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            postal_info: vec![postal_info],
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_postal_info(mut self, postal_info: PostalInfo) -> Self {
        self.postal_info.push(postal_info);
        self
    }

    pub fn with_voice(mut self, voice: Phone) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_fax(mut self, fax: Phone) -> Self {
        self.fax = Some(fax);
        self
    }

    pub fn with_auth_info(mut self, auth_info: AuthInfo<Contact>) -> Self {
        self.auth_info = Some(auth_info);
        self
    }
}

impl Component for ContactCreate {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let id = validate_id(&self.id)?;
        validate_postal_info(&self.postal_info)?;
        let auth_info = require(&self.auth_info, "authorization-token")?;

        let mut element = Element::new(NS, "create").with_child(Element::leaf(NS, "id", id));
        for postal in &self.postal_info {
            element.push(postal.encode(ctx)?);
        }
        Ok(element
            .with_children(encode_lines(&self.voice, &self.fax, &self.email, ctx)?)
            .with_child(auth_info.encode(ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "create")?;
        self.id = element.required_text("id")?;
        self.postal_info = decode_children(element, "postalInfo", ctx)?;
        if self.postal_info.is_empty() {
            return Err(EppError::missing_child("postalInfo"));
        }
        self.voice = decode_opt_child(element, "voice", ctx)?;
        self.fax = decode_opt_child(element, "fax", ctx)?;
        self.email = element.required_text("email")?;
        self.auth_info = decode_opt_child(element, "authInfo", ctx)?;
        Ok(())
    }
}

impl RootElement for ContactCreate {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "create";
}

/// `<creData>` answering a contact create.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactCreateData {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl Component for ContactCreateData {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let id = require_text(&self.id, "contact-id")?;
        Ok(Element::new(NS, "creData")
            .with_child(Element::leaf(NS, "id", id))
            .with_child(Element::leaf(NS, "crDate", format_timestamp(&self.created_at))))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "creData")?;
        self.id = element.required_text("id")?;
        self.created_at = element.required_timestamp("crDate")?;
        Ok(())
    }
}

impl RootElement for ContactCreateData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "creData";
}

/// `<infData>`: the full contact record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactInfoData {
    pub id: String,
    /// Repository object id.
    pub roid: String,
    pub statuses: Vec<ContactStatus>,
    pub postal_info: Vec<PostalInfo>,
    pub voice: Option<Phone>,
    pub fax: Option<Phone>,
    pub email: String,
    /// Sponsoring client.
    pub client_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub transferred_at: Option<DateTime<Utc>>,
    /// Only returned to the sponsoring client.
    pub auth_info: Option<AuthInfo<Contact>>,
}

impl ContactInfoData {
    pub fn has_status(&self, value: &str) -> bool {
        self.statuses.iter().any(|s| s.value == value)
    }
}

impl Component for ContactInfoData {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let id = validate_id(&self.id)?;
        let roid = require_text(&self.roid, "roid")?;
        require_non_empty(&self.statuses, "status")?;
        validate_postal_info(&self.postal_info)?;
        let client_id = require_text(&self.client_id, "sponsoring-client-id")?;
        let created_by = require_text(&self.created_by, "creating-client-id")?;

        let mut element = Element::new(NS, "infData")
            .with_child(Element::leaf(NS, "id", id))
            .with_child(Element::leaf(NS, "roid", roid));
        for status in &self.statuses {
            element.push(status.encode(ctx)?);
        }
        for postal in &self.postal_info {
            element.push(postal.encode(ctx)?);
        }
        Ok(element
            .with_children(encode_lines(&self.voice, &self.fax, &self.email, ctx)?)
            .with_child(Element::leaf(NS, "clID", client_id))
            .with_child(Element::leaf(NS, "crID", created_by))
            .with_child(Element::leaf(NS, "crDate", format_timestamp(&self.created_at)))
            .with_opt_child(self.updated_by.as_ref().map(|u| Element::leaf(NS, "upID", u.as_str())))
            .with_opt_child(self.updated_at.map(|at| Element::leaf(NS, "upDate", format_timestamp(&at))))
            .with_opt_child(self.transferred_at.map(|at| Element::leaf(NS, "trDate", format_timestamp(&at))))
            .with_opt_child(encode_opt(&self.auth_info, ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "infData")?;
        self.id = element.required_text("id")?;
        self.roid = element.required_text("roid")?;
        self.statuses = decode_children(element, "status", ctx)?;
        if self.statuses.is_empty() {
            return Err(EppError::missing_child("status"));
        }
        self.postal_info = decode_children(element, "postalInfo", ctx)?;
        self.voice = decode_opt_child(element, "voice", ctx)?;
        self.fax = decode_opt_child(element, "fax", ctx)?;
        self.email = element.required_text("email")?;
        self.client_id = element.required_text("clID")?;
        self.created_by = element.required_text("crID")?;
        self.created_at = element.required_timestamp("crDate")?;
        self.updated_by = element.optional_text("upID");
        self.updated_at = element.optional_timestamp("upDate")?;
        self.transferred_at = element.optional_timestamp("trDate")?;
        self.auth_info = element
            .child("authInfo")
            .map(|a| decode_new::<AuthInfo<Contact>>(a, ctx))
            .transpose()?;
        Ok(())
    }
}

impl RootElement for ContactInfoData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "infData";
}
