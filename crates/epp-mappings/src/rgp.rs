//! Registry grace period extension (`urn:ietf:params:xml:ns:rgp-1.0`).
//!
//! Carried in the `<extension>` section only: [`RgpUpdate`] rides along a
//! [`DomainUpdate`](crate::domain::DomainUpdate) to request or report a
//! restore, [`RgpInfoData`] and [`RgpUpdateData`] accompany info and update
//! responses. The namespace is registered extension-only, so none of these
//! decode as a main payload.

use chrono::{DateTime, Utc};
use epp_core::component::{require, require_non_empty, require_text};
use epp_core::fragment::{expect_element, format_timestamp};
use epp_core::{CodecContext, Component, Element, EppError, Result, RootElement};
use serde::{Deserialize, Serialize};

pub const NAMESPACE: &str = "urn:ietf:params:xml:ns:rgp-1.0";
const NS: &str = NAMESPACE;

/// Grace period states a domain can be in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RgpStatus {
    #[default]
    AddPeriod,
    AutoRenewPeriod,
    RenewPeriod,
    TransferPeriod,
    RedemptionPeriod,
    PendingRestore,
    PendingDelete,
}

impl RgpStatus {
    pub const ALL: [RgpStatus; 7] = [
        RgpStatus::AddPeriod,
        RgpStatus::AutoRenewPeriod,
        RgpStatus::RenewPeriod,
        RgpStatus::TransferPeriod,
        RgpStatus::RedemptionPeriod,
        RgpStatus::PendingRestore,
        RgpStatus::PendingDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RgpStatus::AddPeriod => "addPeriod",
            RgpStatus::AutoRenewPeriod => "autoRenewPeriod",
            RgpStatus::RenewPeriod => "renewPeriod",
            RgpStatus::TransferPeriod => "transferPeriod",
            RgpStatus::RedemptionPeriod => "redemptionPeriod",
            RgpStatus::PendingRestore => "pendingRestore",
            RgpStatus::PendingDelete => "pendingDelete",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == token)
    }

    /// Restores are only accepted while the domain is in redemption.
    pub fn allows_restore(&self) -> bool {
        matches!(self, RgpStatus::RedemptionPeriod)
    }
}

fn encode_statuses(container: &str, statuses: &[RgpStatus]) -> Result<Element> {
    require_non_empty(statuses, "rgp-status")?;
    Ok(Element::new(NS, container).with_children(
        statuses
            .iter()
            .map(|s| Element::new(NS, "rgpStatus").with_attr("s", s.as_str())),
    ))
}

fn decode_statuses(element: &Element) -> Result<Vec<RgpStatus>> {
    let statuses = element
        .children_named("rgpStatus")
        .map(|child| {
            let token = child.required_attr("s")?;
            RgpStatus::parse(token)
                .ok_or_else(|| EppError::decode("rgpStatus", format!("unknown status '{token}'")))
        })
        .collect::<Result<Vec<_>>>()?;
    if statuses.is_empty() {
        return Err(EppError::missing_child("rgpStatus"));
    }
    Ok(statuses)
}

/// The `op` of a restore request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreOp {
    #[default]
    Request,
    Report,
}

impl RestoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreOp::Request => "request",
            RestoreOp::Report => "report",
        }
    }
}

/// The registrar's account of a restored domain, sent with `op="report"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Registration data as it stood before deletion.
    pub pre_data: String,
    /// Registration data as it stands at restore time.
    pub post_data: String,
    pub deleted_at: DateTime<Utc>,
    pub restored_at: DateTime<Utc>,
    pub reason: String,
    /// Both statements (RFC 3915 section 4.3.1) are required.
    pub statements: [String; 2],
    pub other: Option<String>,
}

impl Component for RestoreReport {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let pre = require_text(&self.pre_data, "pre-data")?;
        let post = require_text(&self.post_data, "post-data")?;
        let reason = require_text(&self.reason, "restore-reason")?;
        for statement in &self.statements {
            require_text(statement, "statement")?;
        }
        Ok(Element::new(NS, "report")
            .with_child(Element::leaf(NS, "preData", pre))
            .with_child(Element::leaf(NS, "postData", post))
            .with_child(Element::leaf(NS, "delTime", format_timestamp(&self.deleted_at)))
            .with_child(Element::leaf(NS, "resTime", format_timestamp(&self.restored_at)))
            .with_child(Element::leaf(NS, "resReason", reason))
            .with_children(self.statements.iter().map(|s| Element::leaf(NS, "statement", s.as_str())))
            .with_opt_child(self.other.as_ref().map(|o| Element::leaf(NS, "other", o.as_str()))))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "report")?;
        self.pre_data = element.required_text("preData")?;
        self.post_data = element.required_text("postData")?;
        self.deleted_at = element.required_timestamp("delTime")?;
        self.restored_at = element.required_timestamp("resTime")?;
        self.reason = element.required_text("resReason")?;
        let statements = element.texts("statement");
        self.statements = match <[String; 2]>::try_from(statements) {
            Ok(pair) => pair,
            Err(found) => {
                return Err(EppError::decode(
                    "statement",
                    format!("expected 2 statements, found {}", found.len()),
                ))
            }
        };
        self.other = element.optional_text("other");
        Ok(())
    }
}

/// `<rgp:update><rgp:restore op="…">` command extension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgpUpdate {
    pub op: RestoreOp,
    pub report: Option<RestoreReport>,
}

impl RgpUpdate {
    pub fn request() -> Self {
        Self::default()
    }

    pub fn report(report: RestoreReport) -> Self {
        Self {
            op: RestoreOp::Report,
            report: Some(report),
        }
    }
}

impl Component for RgpUpdate {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let mut restore = Element::new(NS, "restore").with_attr("op", self.op.as_str());
        match self.op {
            RestoreOp::Request if self.report.is_some() => {
                return Err(EppError::state("report", "only a report restore carries a report"));
            }
            RestoreOp::Request => {}
            RestoreOp::Report => restore.push(require(&self.report, "report")?.encode(ctx)?),
        }
        Ok(Element::new(NS, "update").with_child(restore))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "update")?;
        let restore = element.required_child("restore")?;
        self.op = match restore.required_attr("op")? {
            "request" => RestoreOp::Request,
            "report" => RestoreOp::Report,
            other => return Err(EppError::decode("restore", format!("unknown op '{other}'"))),
        };
        self.report = match self.op {
            RestoreOp::Request => None,
            RestoreOp::Report => {
                let mut report = RestoreReport::default();
                report.decode(restore.required_child("report")?, ctx)?;
                Some(report)
            }
        };
        Ok(())
    }
}

impl RootElement for RgpUpdate {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "update";
}

/// `<rgp:infData>` response extension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgpInfoData {
    pub statuses: Vec<RgpStatus>,
}

impl RgpInfoData {
    pub fn new(statuses: impl IntoIterator<Item = RgpStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    pub fn allows_restore(&self) -> bool {
        self.statuses.iter().any(RgpStatus::allows_restore)
    }
}

impl Component for RgpInfoData {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        encode_statuses("infData", &self.statuses)
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "infData")?;
        self.statuses = decode_statuses(element)?;
        Ok(())
    }
}

impl RootElement for RgpInfoData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "infData";
}

/// `<rgp:upData>` response extension, answering a restore.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgpUpdateData {
    pub statuses: Vec<RgpStatus>,
}

impl Component for RgpUpdateData {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        encode_statuses("upData", &self.statuses)
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, NS, "upData")?;
        self.statuses = decode_statuses(element)?;
        Ok(())
    }
}

impl RootElement for RgpUpdateData {
    const NAMESPACE: &'static str = NS;
    const ELEMENT: &'static str = "upData";
}
