//! Domain name mapping (`urn:ietf:params:xml:ns:domain-1.0`).

use chrono::{DateTime, Utc};
use epp_core::component::{
    decode_children, decode_opt_child, encode_opt, require, require_non_empty, require_text,
};
use epp_core::fragment::{expect_element, format_timestamp};
use epp_core::{
    AuthInfo, CodecContext, Component, Element, EppError, ObjectMapping, ObjectStatus,
    PendingActionNotification, Period, Result, RootElement, TransferCommand, TransferData,
};
use serde::{Deserialize, Serialize};

use crate::check::{CheckCommand, CheckData};
use crate::info::{DeleteCommand, InfoCommand};

/// Domain objects: identified by `<domain:name>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Domain;

impl ObjectMapping for Domain {
    const NAMESPACE: &'static str = "urn:ietf:params:xml:ns:domain-1.0";
    const IDENTIFIER: &'static str = "name";
    const STATUS_VALUES: &'static [&'static str] = &[
        "clientDeleteProhibited",
        "clientHold",
        "clientRenewProhibited",
        "clientTransferProhibited",
        "clientUpdateProhibited",
        "inactive",
        "ok",
        "pendingCreate",
        "pendingDelete",
        "pendingRenew",
        "pendingTransfer",
        "pendingUpdate",
        "serverDeleteProhibited",
        "serverHold",
        "serverRenewProhibited",
        "serverTransferProhibited",
        "serverUpdateProhibited",
    ];
}

pub type DomainCheck = CheckCommand<Domain>;
pub type DomainCheckData = CheckData<Domain>;
pub type DomainInfo = InfoCommand<Domain>;
pub type DomainDelete = DeleteCommand<Domain>;
pub type DomainTransfer = TransferCommand<Domain>;
pub type DomainTransferData = TransferData<Domain>;
pub type DomainPendingAction = PendingActionNotification<Domain>;
pub type DomainStatus = ObjectStatus<Domain>;

const NS: &str = Domain::NAMESPACE;

/// Role of a contact linked to a domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactRole {
    #[default]
    Admin,
    Billing,
    Tech,
}

impl ContactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactRole::Admin => "admin",
            ContactRole::Billing => "billing",
            ContactRole::Tech => "tech",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "admin" => Some(ContactRole::Admin),
            "billing" => Some(ContactRole::Billing),
            "tech" => Some(ContactRole::Tech),
            _ => None,
        }
    }
}

/// `<domain:contact type="…">id</domain:contact>`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainContact {
    pub role: ContactRole,
    pub id: String,
}

impl DomainContact {
    pub fn new(role: ContactRole, id: impl Into<String>) -> Self {
        Self { role, id: id.into() }
    }
}

impl Component for DomainContact {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let id = require_text(&self.id, "contact-id")?;
        Ok(Element::leaf(NS, "contact", id).with_attr("type", self.role.as_str()))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "contact")?;
        let role = element.required_attr("type")?;
        self.role = ContactRole::parse(role)
            .ok_or_else(|| EppError::decode("contact", format!("unknown type '{role}'")))?;
        self.id = element.text().to_string();
        if self.id.is_empty() {
            return Err(EppError::decode("contact", "must not be empty"));
        }
        Ok(())
    }
}

/// Checks that a name is a plausible fully qualified host name.
fn validate_name<'a>(name: &'a str, field: &str) -> Result<&'a str> {
    let name = require_text(name, field)?;
    let valid = name.len() <= 253
        && name.split('.').count() >= 2
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        });
    if valid {
        Ok(name)
    } else {
        Err(EppError::state(field, format!("'{name}' is not a valid host name")))
    }
}

fn encode_nameservers(nameservers: &[String]) -> Result<Option<Element>> {
    if nameservers.is_empty() {
        return Ok(None);
    }
    let mut ns = Element::new(NS, "ns");
    for host in nameservers {
        ns.push(Element::leaf(NS, "hostObj", validate_name(host, "nameserver")?));
    }
    Ok(Some(ns))
}

fn decode_nameservers(element: &Element) -> Vec<String> {
    element.child("ns").map(|ns| ns.texts("hostObj")).unwrap_or_default()
}

/// Creates a domain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainCreate {
    pub name: String,
    pub period: Option<Period<Domain>>,
    /// Host object names, in preference order.
    pub nameservers: Vec<String>,
    pub registrant: Option<String>,
    pub contacts: Vec<DomainContact>,
    pub auth_info: Option<AuthInfo<Domain>>,
}

impl DomainCreate {
    pub fn new(name: impl Into<String>, auth_info: AuthInfo<Domain>) -> Self {
        Self {
            name: name.into(),
            auth_info: Some(auth_info),
            ..Default::default()
        }
    }

    pub fn with_period(mut self, period: Period<Domain>) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_nameserver(mut self, host: impl Into<String>) -> Self {
        self.nameservers.push(host.into());
        self
    }

    pub fn with_registrant(mut self, id: impl Into<String>) -> Self {
        self.registrant = Some(id.into());
        self
    }

    pub fn with_contact(mut self, role: ContactRole, id: impl Into<String>) -> Self {
        self.contacts.push(DomainContact::new(role, id));
        self
    }
}

impl Component for DomainCreate {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let name = validate_name(&self.name, "object-identifier")?;
        let auth_info = require(&self.auth_info, "authorization-token")?;

        let mut element = Element::new(NS, "create")
            .with_child(Element::leaf(NS, "name", name))
            .with_opt_child(encode_opt(&self.period, ctx)?)
            .with_opt_child(encode_nameservers(&self.nameservers)?)
            .with_opt_child(self.registrant.as_ref().map(|r| Element::leaf(NS, "registrant", r.as_str())));
        for contact in &self.contacts {
            element.push(contact.encode(ctx)?);
        }
        Ok(element.with_child(auth_info.encode(ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "create")?;
        self.name = element.required_text("name")?;
        self.period = decode_opt_child(element, "period", ctx)?;
        self.nameservers = decode_nameservers(element);
        self.registrant = element.optional_text("registrant");
        self.contacts = decode_children(element, "contact", ctx)?;
        self.auth_info = decode_opt_child(element, "authInfo", ctx)?;
        Ok(())
    }
}

impl RootElement for DomainCreate {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "create";
}

/// Items added to or removed from a domain by `<domain:add>` / `<domain:rem>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainUpdateSet {
    pub nameservers: Vec<String>,
    pub contacts: Vec<DomainContact>,
    pub statuses: Vec<DomainStatus>,
}

impl DomainUpdateSet {
    pub fn is_empty(&self) -> bool {
        self.nameservers.is_empty() && self.contacts.is_empty() && self.statuses.is_empty()
    }

    /// `None` when there is nothing to send.
    fn encode_as(&self, name: &str, ctx: &CodecContext) -> Result<Option<Element>> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut element = Element::new(NS, name).with_opt_child(encode_nameservers(&self.nameservers)?);
        for contact in &self.contacts {
            element.push(contact.encode(ctx)?);
        }
        for status in &self.statuses {
            element.push(status.encode(ctx)?);
        }
        Ok(Some(element))
    }

    fn decode_from(parent: &Element, name: &str, ctx: &CodecContext) -> Result<Self> {
        let Some(element) = parent.child(name) else {
            return Ok(Self::default());
        };
        Ok(Self {
            nameservers: decode_nameservers(element),
            contacts: decode_children(element, "contact", ctx)?,
            statuses: decode_children(element, "status", ctx)?,
        })
    }
}

/// `<domain:chg>`: replacement registrant and authorization token.
///
/// An empty change is legal on the wire; the restore extension rides on one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainChange {
    /// `Some("")` clears the registrant.
    pub registrant: Option<String>,
    pub auth_info: Option<AuthInfo<Domain>>,
}

impl Component for DomainChange {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        Ok(Element::new(NS, "chg")
            .with_opt_child(self.registrant.as_ref().map(|r| Element::leaf(NS, "registrant", r.as_str())))
            .with_opt_child(encode_opt(&self.auth_info, ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "chg")?;
        self.registrant = element.optional_text("registrant");
        self.auth_info = decode_opt_child(element, "authInfo", ctx)?;
        Ok(())
    }
}

/// Updates a domain: additions, removals and changes in wire order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainUpdate {
    pub name: String,
    pub add: DomainUpdateSet,
    pub remove: DomainUpdateSet,
    pub change: Option<DomainChange>,
}

impl DomainUpdate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_nameserver(mut self, host: impl Into<String>) -> Self {
        self.add.nameservers.push(host.into());
        self
    }

    pub fn remove_nameserver(mut self, host: impl Into<String>) -> Self {
        self.remove.nameservers.push(host.into());
        self
    }

    pub fn add_contact(mut self, role: ContactRole, id: impl Into<String>) -> Self {
        self.add.contacts.push(DomainContact::new(role, id));
        self
    }

    pub fn remove_contact(mut self, role: ContactRole, id: impl Into<String>) -> Self {
        self.remove.contacts.push(DomainContact::new(role, id));
        self
    }

    pub fn add_status(mut self, status: DomainStatus) -> Self {
        self.add.statuses.push(status);
        self
    }

    pub fn remove_status(mut self, status: DomainStatus) -> Self {
        self.remove.statuses.push(status);
        self
    }

    pub fn with_change(mut self, change: DomainChange) -> Self {
        self.change = Some(change);
        self
    }

    pub fn with_registrant(self, id: impl Into<String>) -> Self {
        let registrant = Some(id.into());
        self.edit_change(|change| change.registrant = registrant)
    }

    pub fn with_auth_info(self, auth_info: AuthInfo<Domain>) -> Self {
        self.edit_change(|change| change.auth_info = Some(auth_info))
    }

    fn edit_change(mut self, edit: impl FnOnce(&mut DomainChange)) -> Self {
        edit(self.change.get_or_insert_with(DomainChange::default));
        self
    }
}

impl Component for DomainUpdate {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let name = validate_name(&self.name, "object-identifier")?;
        if self.add.is_empty() && self.remove.is_empty() && self.change.is_none() {
            return Err(EppError::state(
                "update",
                format!("nothing to add, remove or change on {name}"),
            ));
        }
        Ok(Element::new(NS, "update")
            .with_child(Element::leaf(NS, "name", name))
            .with_opt_child(self.add.encode_as("add", ctx)?)
            .with_opt_child(self.remove.encode_as("rem", ctx)?)
            .with_opt_child(encode_opt(&self.change, ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "update")?;
        self.name = element.required_text("name")?;
        self.add = DomainUpdateSet::decode_from(element, "add", ctx)?;
        self.remove = DomainUpdateSet::decode_from(element, "rem", ctx)?;
        self.change = decode_opt_child(element, "chg", ctx)?;
        Ok(())
    }
}

impl RootElement for DomainUpdate {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "update";
}

/// `<creData>` answering a domain create.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainCreateData {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Component for DomainCreateData {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let name = require_text(&self.name, "object-identifier")?;
        Ok(Element::new(NS, "creData")
            .with_child(Element::leaf(NS, "name", name))
            .with_child(Element::leaf(NS, "crDate", format_timestamp(&self.created_at)))
            .with_opt_child(self.expires_at.map(|at| Element::leaf(NS, "exDate", format_timestamp(&at)))))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "creData")?;
        self.name = element.required_text("name")?;
        self.created_at = element.required_timestamp("crDate")?;
        self.expires_at = element.optional_timestamp("exDate")?;
        Ok(())
    }
}

impl RootElement for DomainCreateData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "creData";
}

/// `<infData>`: the full domain record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainInfoData {
    pub name: String,
    pub roid: String,
    pub statuses: Vec<DomainStatus>,
    pub registrant: Option<String>,
    pub contacts: Vec<DomainContact>,
    pub nameservers: Vec<String>,
    /// Subordinate hosts.
    pub hosts: Vec<String>,
    pub client_id: String,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub transferred_at: Option<DateTime<Utc>>,
    pub auth_info: Option<AuthInfo<Domain>>,
}

impl DomainInfoData {
    pub fn contact(&self, role: ContactRole) -> Option<&str> {
        self.contacts
            .iter()
            .find(|c| c.role == role)
            .map(|c| c.id.as_str())
    }
}

impl Component for DomainInfoData {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let name = require_text(&self.name, "object-identifier")?;
        let roid = require_text(&self.roid, "roid")?;
        let client_id = require_text(&self.client_id, "sponsoring-client-id")?;
        require_non_empty(&self.statuses, "status")?;

        let stamp = |name: &str, at: &Option<DateTime<Utc>>| {
            at.map(|at| Element::leaf(NS, name, format_timestamp(&at)))
        };
        let text = |name: &str, value: &Option<String>| {
            value.as_ref().map(|v| Element::leaf(NS, name, v.as_str()))
        };

        let mut element = Element::new(NS, "infData")
            .with_child(Element::leaf(NS, "name", name))
            .with_child(Element::leaf(NS, "roid", roid));
        for status in &self.statuses {
            element.push(status.encode(ctx)?);
        }
        element = element.with_opt_child(text("registrant", &self.registrant));
        for contact in &self.contacts {
            element.push(contact.encode(ctx)?);
        }
        Ok(element
            .with_opt_child(encode_nameservers(&self.nameservers)?)
            .with_children(self.hosts.iter().map(|h| Element::leaf(NS, "host", h.as_str())))
            .with_child(Element::leaf(NS, "clID", client_id))
            .with_opt_child(text("crID", &self.created_by))
            .with_opt_child(stamp("crDate", &self.created_at))
            .with_opt_child(text("upID", &self.updated_by))
            .with_opt_child(stamp("upDate", &self.updated_at))
            .with_opt_child(stamp("exDate", &self.expires_at))
            .with_opt_child(stamp("trDate", &self.transferred_at))
            .with_opt_child(encode_opt(&self.auth_info, ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "infData")?;
        self.name = element.required_text("name")?;
        self.roid = element.required_text("roid")?;
        self.statuses = decode_children(element, "status", ctx)?;
        self.registrant = element.optional_text("registrant");
        self.contacts = decode_children(element, "contact", ctx)?;
        self.nameservers = decode_nameservers(element);
        self.hosts = element.texts("host");
        self.client_id = element.required_text("clID")?;
        self.created_by = element.optional_text("crID");
        self.created_at = element.optional_timestamp("crDate")?;
        self.updated_by = element.optional_text("upID");
        self.updated_at = element.optional_timestamp("upDate")?;
        self.expires_at = element.optional_timestamp("exDate")?;
        self.transferred_at = element.optional_timestamp("trDate")?;
        self.auth_info = decode_opt_child(element, "authInfo", ctx)?;
        Ok(())
    }
}

impl RootElement for DomainInfoData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "infData";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use epp_core::component::decode_new;

    fn create() -> DomainCreate {
        DomainCreate::new("example.com", AuthInfo::new("2fooBAR"))
            .with_period(Period::years(2))
            .with_nameserver("ns1.example.net")
            .with_nameserver("ns2.example.net")
            .with_registrant("jd1234")
            .with_contact(ContactRole::Admin, "sh8013")
            .with_contact(ContactRole::Tech, "sh8013")
    }

    #[test]
    fn create_wire_shape() {
        let el = create().encode(&CodecContext::default()).unwrap();
        let names: Vec<&str> = el.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["name", "period", "ns", "registrant", "contact", "contact", "authInfo"]
        );
        assert_eq!(el.child("ns").unwrap().texts("hostObj"), vec!["ns1.example.net", "ns2.example.net"]);
        assert_eq!(el.children_named("contact").next().unwrap().attr("type"), Some("admin"));
    }

    #[test]
    fn create_roundtrip() {
        let ctx = CodecContext::default();
        let create = create();
        let el = create.encode(&ctx).unwrap();
        assert_eq!(decode_new::<DomainCreate>(&el, &ctx).unwrap(), create);
    }

    #[test]
    fn minimal_create_omits_optional_children() {
        let el = DomainCreate::new("example.com", AuthInfo::new("2fooBAR"))
            .encode(&CodecContext::default())
            .unwrap();
        assert!(el.child("ns").is_none());
        assert!(el.child("period").is_none());
        assert!(el.child("registrant").is_none());
    }

    #[test]
    fn invalid_names_are_refused() {
        let ctx = CodecContext::default();
        for bad in ["", "localhost", "-bad.example", "exa mple.com", "a..b"] {
            let err = DomainCreate::new(bad, AuthInfo::new("x")).encode(&ctx).unwrap_err();
            assert!(err.is_state(), "{bad}");
        }
        let err = create().with_nameserver("ns3").encode(&ctx).unwrap_err();
        assert_eq!(err.subject(), "nameserver");
    }

    #[test]
    fn info_data_roundtrip() {
        let ctx = CodecContext::default();
        let created = Utc.with_ymd_and_hms(1999, 4, 3, 22, 0, 0).unwrap();
        let info = DomainInfoData {
            name: "example.com".into(),
            roid: "EXAMPLE1-REP".into(),
            statuses: vec![DomainStatus::new("ok")],
            registrant: Some("jd1234".into()),
            contacts: vec![DomainContact::new(ContactRole::Billing, "sh8013")],
            nameservers: vec!["ns1.example.com".into()],
            hosts: vec!["ns1.example.com".into(), "ns2.example.com".into()],
            client_id: "ClientX".into(),
            created_by: Some("ClientY".into()),
            created_at: Some(created),
            expires_at: Some(created + chrono::Duration::days(365 * 6)),
            ..Default::default()
        };
        let el = info.encode(&ctx).unwrap();
        let back = decode_new::<DomainInfoData>(&el, &ctx).unwrap();
        assert_eq!(back, info);
        assert_eq!(back.contact(ContactRole::Billing), Some("sh8013"));
        assert_eq!(back.contact(ContactRole::Admin), None);
    }

    #[test]
    fn update_wire_shape() {
        let update = DomainUpdate::new("example.com")
            .add_nameserver("ns2.example.com")
            .add_contact(ContactRole::Tech, "mak21")
            .add_status(DomainStatus::new("clientHold"))
            .remove_contact(ContactRole::Tech, "sh8013")
            .with_registrant("sh8013");
        let ctx = CodecContext::default();
        let el = update.encode(&ctx).unwrap();
        let names: Vec<&str> = el.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "add", "rem", "chg"]);
        let add: Vec<&str> = el.child("add").unwrap().children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(add, vec!["ns", "contact", "status"]);
        assert!(el.child("rem").unwrap().child("ns").is_none());
        assert_eq!(decode_new::<DomainUpdate>(&el, &ctx).unwrap(), update);
    }

    #[test]
    fn empty_change_is_kept_and_bare_update_refused() {
        let ctx = CodecContext::default();
        let restore = DomainUpdate::new("example.com").with_change(DomainChange::default());
        let el = restore.encode(&ctx).unwrap();
        assert!(el.child("chg").unwrap().children.is_empty());
        assert!(el.child("add").is_none());
        assert_eq!(decode_new::<DomainUpdate>(&el, &ctx).unwrap(), restore);

        let err = DomainUpdate::new("example.com").encode(&ctx).unwrap_err();
        assert!(err.is_state());
        assert_eq!(err.subject(), "update");
    }

    #[test]
    fn update_change_builders_share_one_chg() {
        let update = DomainUpdate::new("example.com")
            .with_registrant("")
            .with_auth_info(AuthInfo::new("2BARfoo"));
        let change = update.change.as_ref().unwrap();
        assert_eq!(change.registrant.as_deref(), Some(""));
        assert!(change.auth_info.is_some());
    }

    #[test]
    fn unknown_contact_type_is_a_decode_error() {
        let el = Element::leaf(NS, "contact", "sh8013").with_attr("type", "owner");
        let err = decode_new::<DomainContact>(&el, &CodecContext::default()).unwrap_err();
        assert!(err.is_decode());
    }
}
