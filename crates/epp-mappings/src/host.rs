//! Host mapping (`urn:ietf:params:xml:ns:host-1.0`).
//!
//! Hosts have no transfer of their own; they move with their
//! superordinate domain. Pending create/update/delete actions are still
//! reported through the poll queue.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use epp_core::component::{decode_children, require_non_empty, require_text};
use epp_core::fragment::{expect_element, format_timestamp};
use epp_core::{
    CodecContext, Component, Element, EppError, ObjectMapping, ObjectStatus,
    PendingActionNotification, Result, RootElement,
};
use serde::{Deserialize, Serialize};

use crate::check::{CheckCommand, CheckData};
use crate::info::{DeleteCommand, InfoCommand};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Host;

impl ObjectMapping for Host {
    const NAMESPACE: &'static str = "urn:ietf:params:xml:ns:host-1.0";
    const IDENTIFIER: &'static str = "name";
    const STATUS_VALUES: &'static [&'static str] = &[
        "clientDeleteProhibited",
        "clientUpdateProhibited",
        "linked",
        "ok",
        "pendingCreate",
        "pendingDelete",
        "pendingTransfer",
        "pendingUpdate",
        "serverDeleteProhibited",
        "serverUpdateProhibited",
    ];
}

pub type HostCheck = CheckCommand<Host>;
pub type HostCheckData = CheckData<Host>;
pub type HostInfo = InfoCommand<Host>;
pub type HostDelete = DeleteCommand<Host>;
pub type HostPendingAction = PendingActionNotification<Host>;
pub type HostStatus = ObjectStatus<Host>;

const NS: &str = Host::NAMESPACE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

impl IpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpVersion::V4 => "v4",
            IpVersion::V6 => "v6",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "v4" => Some(IpVersion::V4),
            "v6" => Some(IpVersion::V6),
            _ => None,
        }
    }

    fn accepts(&self, address: &str) -> bool {
        match self {
            IpVersion::V4 => address.parse::<Ipv4Addr>().is_ok(),
            IpVersion::V6 => address.parse::<Ipv6Addr>().is_ok(),
        }
    }
}

/// `<host:addr ip="v4|v6">`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostAddress {
    pub version: IpVersion,
    pub address: String,
}

impl HostAddress {
    pub fn v4(address: impl Into<String>) -> Self {
        Self {
            version: IpVersion::V4,
            address: address.into(),
        }
    }

    pub fn v6(address: impl Into<String>) -> Self {
        Self {
            version: IpVersion::V6,
            address: address.into(),
        }
    }
}

impl Component for HostAddress {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        if !self.version.accepts(&self.address) {
            return Err(EppError::state(
                "address",
                format!("'{}' is not an IP{} address", self.address, self.version.as_str()),
            ));
        }
        Ok(Element::leaf(NS, "addr", self.address.as_str()).with_attr("ip", self.version.as_str()))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "addr")?;
        // `ip` defaults to v4 when omitted.
        self.version = match element.attr("ip") {
            None => IpVersion::V4,
            Some(token) => IpVersion::parse(token)
                .ok_or_else(|| EppError::decode("addr", format!("unknown ip version '{token}'")))?,
        };
        self.address = element.text().to_string();
        if !self.version.accepts(&self.address) {
            return Err(EppError::decode("addr", format!("'{}' does not parse", self.address)));
        }
        Ok(())
    }
}

/// Creates a host. Addresses are only allowed (and required by most
/// registries) for hosts subordinate to a domain the registry manages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostCreate {
    pub name: String,
    pub addresses: Vec<HostAddress>,
}

impl HostCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addresses: Vec::new(),
        }
    }

    pub fn with_address(mut self, address: HostAddress) -> Self {
        self.addresses.push(address);
        self
    }
}

impl Component for HostCreate {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let name = require_text(&self.name, "object-identifier")?;
        let mut element = Element::new(NS, "create").with_child(Element::leaf(NS, "name", name));
        for address in &self.addresses {
            element.push(address.encode(ctx)?);
        }
        Ok(element)
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "create")?;
        self.name = element.required_text("name")?;
        self.addresses = decode_children(element, "addr", ctx)?;
        Ok(())
    }
}

impl RootElement for HostCreate {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "create";
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostCreateData {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Component for HostCreateData {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let name = require_text(&self.name, "object-identifier")?;
        Ok(Element::new(NS, "creData")
            .with_child(Element::leaf(NS, "name", name))
            .with_child(Element::leaf(NS, "crDate", format_timestamp(&self.created_at))))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "creData")?;
        self.name = element.required_text("name")?;
        self.created_at = element.required_timestamp("crDate")?;
        Ok(())
    }
}

impl RootElement for HostCreateData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "creData";
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostInfoData {
    pub name: String,
    pub roid: String,
    pub statuses: Vec<HostStatus>,
    pub addresses: Vec<HostAddress>,
    pub client_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub transferred_at: Option<DateTime<Utc>>,
}

impl HostInfoData {
    pub fn is_linked(&self) -> bool {
        self.statuses.iter().any(|s| s.value == "linked")
    }
}

impl Component for HostInfoData {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let name = require_text(&self.name, "object-identifier")?;
        let roid = require_text(&self.roid, "roid")?;
        require_non_empty(&self.statuses, "status")?;
        let client_id = require_text(&self.client_id, "sponsoring-client-id")?;
        let created_by = require_text(&self.created_by, "creating-client-id")?;

        let mut element = Element::new(NS, "infData")
            .with_child(Element::leaf(NS, "name", name))
            .with_child(Element::leaf(NS, "roid", roid));
        for status in &self.statuses {
            element.push(status.encode(ctx)?);
        }
        for address in &self.addresses {
            element.push(address.encode(ctx)?);
        }
        Ok(element
            .with_child(Element::leaf(NS, "clID", client_id))
            .with_child(Element::leaf(NS, "crID", created_by))
            .with_child(Element::leaf(NS, "crDate", format_timestamp(&self.created_at)))
            .with_opt_child(self.updated_by.as_ref().map(|u| Element::leaf(NS, "upID", u.as_str())))
            .with_opt_child(self.updated_at.map(|at| Element::leaf(NS, "upDate", format_timestamp(&at))))
            .with_opt_child(self.transferred_at.map(|at| Element::leaf(NS, "trDate", format_timestamp(&at)))))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "infData")?;
        self.name = element.required_text("name")?;
        self.roid = element.required_text("roid")?;
        self.statuses = decode_children(element, "status", ctx)?;
        self.addresses = decode_children(element, "addr", ctx)?;
        self.client_id = element.required_text("clID")?;
        self.created_by = element.required_text("crID")?;
        self.created_at = element.required_timestamp("crDate")?;
        self.updated_by = element.optional_text("upID");
        self.updated_at = element.optional_timestamp("upDate")?;
        self.transferred_at = element.optional_timestamp("trDate")?;
        Ok(())
    }
}

impl RootElement for HostInfoData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "infData";
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use epp_core::component::decode_new;

    #[test]
    fn create_roundtrip_keeps_address_order() {
        let ctx = CodecContext::default();
        let create = HostCreate::new("ns1.example.com")
            .with_address(HostAddress::v4("192.0.2.2"))
            .with_address(HostAddress::v4("192.0.2.29"))
            .with_address(HostAddress::v6("1080:0:0:0:8:800:200C:417A"));
        let el = create.encode(&ctx).unwrap();
        let ips: Vec<_> = el.children_named("addr").filter_map(|a| a.attr("ip")).collect();
        assert_eq!(ips, vec!["v4", "v4", "v6"]);
        assert_eq!(decode_new::<HostCreate>(&el, &ctx).unwrap(), create);
    }

    #[test]
    fn address_must_match_version() {
        let ctx = CodecContext::default();
        let err = HostAddress::v4("::1").encode(&ctx).unwrap_err();
        assert!(err.is_state());
        assert_eq!(err.subject(), "address");
        assert!(HostAddress::v6("::1").encode(&ctx).is_ok());
    }

    #[test]
    fn missing_ip_attribute_means_v4() {
        let el = Element::leaf(NS, "addr", "192.0.2.2");
        let addr = decode_new::<HostAddress>(&el, &CodecContext::default()).unwrap();
        assert_eq!(addr, HostAddress::v4("192.0.2.2"));

        let bad = Element::leaf(NS, "addr", "999.0.2.2");
        assert!(decode_new::<HostAddress>(&bad, &CodecContext::default()).unwrap_err().is_decode());
    }

    #[test]
    fn info_data_roundtrip() {
        let ctx = CodecContext::default();
        let info = HostInfoData {
            name: "ns1.example.com".into(),
            roid: "NS1_EXAMPLE1-REP".into(),
            statuses: vec![HostStatus::new("linked"), HostStatus::new("clientUpdateProhibited")],
            addresses: vec![HostAddress::v4("192.0.2.2")],
            client_id: "ClientY".into(),
            created_by: "ClientX".into(),
            created_at: Utc.with_ymd_and_hms(1999, 4, 2, 22, 0, 0).unwrap(),
            ..Default::default()
        };
        let el = info.encode(&ctx).unwrap();
        let back = decode_new::<HostInfoData>(&el, &ctx).unwrap();
        assert_eq!(back, info);
        assert!(back.is_linked());
    }
}
