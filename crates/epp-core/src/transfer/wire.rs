//! Wire forms of the transfer command and its `<trnData>` response.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};

use super::{TransferOp, TransferStatus};
use crate::component::{decode_opt_child, encode_opt, require_text, CodecContext, Component, RootElement};
use crate::error::{EppError, Result};
use crate::fragment::{expect_element, format_timestamp, Attribute, Element};
use crate::object::{AuthInfo, ObjectMapping, Period};

/// `<transfer op="…">` command payload for mapping `M`.
///
/// The operation travels on the enclosing verb element, the identifier,
/// optional period and authorization token inside the payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferCommand<M: ObjectMapping> {
    pub op: TransferOp,
    pub identifier: String,
    pub period: Option<Period<M>>,
    pub auth_info: Option<AuthInfo<M>>,
}

impl<M: ObjectMapping> TransferCommand<M> {
    pub fn new(op: TransferOp, identifier: impl Into<String>) -> Self {
        Self {
            op,
            identifier: identifier.into(),
            period: None,
            auth_info: None,
        }
    }

    pub fn query(identifier: impl Into<String>) -> Self {
        Self::new(TransferOp::Query, identifier)
    }

    pub fn request(identifier: impl Into<String>, auth_info: AuthInfo<M>) -> Self {
        Self::new(TransferOp::Request, identifier).with_auth_info(auth_info)
    }

    pub fn with_period(mut self, period: Period<M>) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_auth_info(mut self, auth_info: AuthInfo<M>) -> Self {
        self.auth_info = Some(auth_info);
        self
    }
}

impl<M: ObjectMapping> Component for TransferCommand<M> {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let identifier = require_text(&self.identifier, "object-identifier")?;
        if self.period.is_some() && self.op != TransferOp::Request {
            return Err(EppError::state(
                "period",
                format!("only a transfer request carries a period, not {}", self.op),
            ));
        }
        Ok(Element::new(M::NAMESPACE, "transfer")
            .with_child(Element::leaf(M::NAMESPACE, M::IDENTIFIER, identifier))
            .with_opt_child(encode_opt(&self.period, ctx)?)
            .with_opt_child(encode_opt(&self.auth_info, ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "transfer")?;
        self.identifier = element.required_text(M::IDENTIFIER)?;
        self.period = decode_opt_child(element, "period", ctx)?;
        self.auth_info = decode_opt_child(element, "authInfo", ctx)?;
        Ok(())
    }
}

impl<M: ObjectMapping> RootElement for TransferCommand<M> {
    const NAMESPACE: &'static str = M::NAMESPACE;
    const ELEMENT: &'static str = "transfer";

    fn verb_attributes(&self) -> Vec<Attribute> {
        vec![Attribute {
            name: "op".into(),
            value: self.op.as_str().into(),
        }]
    }

    fn absorb_verb(&mut self, verb: &Element) -> Result<()> {
        let op = verb.required_attr("op")?;
        self.op = TransferOp::parse(op)
            .ok_or_else(|| EppError::decode("transfer", format!("unknown op '{op}'")))?;
        Ok(())
    }
}

/// `<trnData>`: the state of a transfer as reported by the server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferData<M: ObjectMapping> {
    pub identifier: String,
    pub status: TransferStatus,
    /// Client that requested the transfer (`reID`).
    pub requesting_client: String,
    pub requested_at: DateTime<Utc>,
    /// Client expected to act, the current sponsor (`acID`).
    pub acting_client: String,
    /// Deadline while pending, otherwise when the transfer ended.
    pub acted_at: DateTime<Utc>,
    /// New expiry date, for mappings whose objects expire.
    pub expires_at: Option<DateTime<Utc>>,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> TransferData<M> {
    pub fn new(
        identifier: impl Into<String>,
        status: TransferStatus,
        requesting_client: impl Into<String>,
        requested_at: DateTime<Utc>,
        acting_client: impl Into<String>,
        acted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            status,
            requesting_client: requesting_client.into(),
            requested_at,
            acting_client: acting_client.into(),
            acted_at,
            expires_at: None,
            _mapping: PhantomData,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

impl<M: ObjectMapping> Component for TransferData<M> {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let identifier = require_text(&self.identifier, "object-identifier")?;
        let requesting = require_text(&self.requesting_client, "requesting-client-id")?;
        let acting = require_text(&self.acting_client, "acting-client-id")?;
        let ns = M::NAMESPACE;
        Ok(Element::new(ns, "trnData")
            .with_child(Element::leaf(ns, M::IDENTIFIER, identifier))
            .with_child(Element::leaf(ns, "trStatus", self.status.as_str()))
            .with_child(Element::leaf(ns, "reID", requesting))
            .with_child(Element::leaf(ns, "reDate", format_timestamp(&self.requested_at)))
            .with_child(Element::leaf(ns, "acID", acting))
            .with_child(Element::leaf(ns, "acDate", format_timestamp(&self.acted_at)))
            .with_opt_child(
                self.expires_at
                    .map(|at| Element::leaf(ns, "exDate", format_timestamp(&at))),
            ))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "trnData")?;
        self.identifier = element.required_text(M::IDENTIFIER)?;
        let status = element.required_child("trStatus")?.text();
        self.status = TransferStatus::parse(status)
            .ok_or_else(|| EppError::decode("trStatus", format!("unknown status '{status}'")))?;
        self.requesting_client = element.required_text("reID")?;
        self.requested_at = element.required_timestamp("reDate")?;
        self.acting_client = element.required_text("acID")?;
        self.acted_at = element.required_timestamp("acDate")?;
        self.expires_at = element.optional_timestamp("exDate")?;
        Ok(())
    }
}

impl<M: ObjectMapping> RootElement for TransferData<M> {
    const NAMESPACE: &'static str = M::NAMESPACE;
    const ELEMENT: &'static str = "trnData";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{decode_new, Payload};
    use crate::config::TransferConfig;
    use crate::object::tests::Widget;
    use crate::transfer::TransferRecord;
    use chrono::TimeZone;

    #[test]
    fn request_carries_op_on_the_verb() {
        let ctx = CodecContext::default();
        let cmd = TransferCommand::<Widget>::request("example.com", AuthInfo::new("2fooBAR"))
            .with_period(Period::years(1));
        let el = cmd.encode(&ctx).unwrap();
        assert_eq!(el.children.len(), 3);
        assert!(el.attr("op").is_none());
        assert_eq!(cmd.payload_verb_attributes()[0].value, "request");

        let verb = Element::new("urn:ietf:params:xml:ns:epp-1.0", "transfer").with_attr("op", "request");
        let mut back = decode_new::<TransferCommand<Widget>>(&el, &ctx).unwrap();
        back.absorb_verb(&verb).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn unknown_op_is_a_decode_error() {
        let verb = Element::new("urn:ietf:params:xml:ns:epp-1.0", "transfer").with_attr("op", "steal");
        let err = TransferCommand::<Widget>::default().absorb_verb(&verb).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn period_only_on_request() {
        let cmd = TransferCommand::<Widget>::query("example.com").with_period(Period::years(1));
        let err = cmd.encode(&CodecContext::default()).unwrap_err();
        assert_eq!(err.subject(), "period");
    }

    #[test]
    fn record_renders_as_transfer_data() {
        let ctx = CodecContext::default();
        let at = Utc.with_ymd_and_hms(2000, 6, 6, 22, 0, 0).unwrap();
        let record = TransferRecord::request(
            "example.com",
            "ClientX",
            "ClientY",
            at,
            &TransferConfig::default(),
            None,
        )
        .unwrap();
        let data = record.to_data::<Widget>();
        let el = data.encode(&ctx).unwrap();
        assert_eq!(el.child("trStatus").unwrap().text(), "pending");
        assert_eq!(el.child("acDate").unwrap().text(), "2000-06-11T22:00:00Z");
        assert_eq!(decode_new::<TransferData<Widget>>(&el, &ctx).unwrap(), data);
    }

    #[test]
    fn status_tokens_are_case_sensitive_on_decode() {
        let ctx = CodecContext::default();
        let at = Utc.with_ymd_and_hms(2000, 6, 6, 22, 0, 0).unwrap();
        let data = TransferData::<Widget>::new("example.com", TransferStatus::Pending, "ClientX", at, "ClientY", at);
        let mut el = data.encode(&ctx).unwrap();
        el.children[1].text = Some("Pending".into());
        let err = decode_new::<TransferData<Widget>>(&el, &ctx).unwrap_err();
        assert_eq!(err.subject(), "trStatus");
    }
}
