//! Sponsorship transfer: the state machine every object type shares.
//!
//! ```text
//!                      ┌── cancel (requester) ──────▶ serverCancelled
//!                      ├── reject (sponsor) ────────▶ clientRejected
//!  request ──▶ pending ├── approve (sponsor) ───────▶ clientApproved
//!                      └── deadline elapsed ────────▶ serverApproved | serverRejected
//! ```
//!
//! Every state other than `pending` is terminal. `query` is valid in any
//! state and never transitions.

mod machine;
mod wire;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use machine::{TransferBook, TransferRecord};
pub use wire::{TransferCommand, TransferData};

/// Operation named by the `op` attribute of `<transfer>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransferOp {
    #[default]
    Query,
    Request,
    Cancel,
    Reject,
    Approve,
}

impl TransferOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferOp::Query => "query",
            TransferOp::Request => "request",
            TransferOp::Cancel => "cancel",
            TransferOp::Reject => "reject",
            TransferOp::Approve => "approve",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "query" => Some(TransferOp::Query),
            "request" => Some(TransferOp::Request),
            "cancel" => Some(TransferOp::Cancel),
            "reject" => Some(TransferOp::Reject),
            "approve" => Some(TransferOp::Approve),
            _ => None,
        }
    }
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a transfer record (`trStatus`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    #[default]
    Pending,
    ClientApproved,
    ClientRejected,
    ServerApproved,
    ServerRejected,
    ServerCancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::ClientApproved => "clientApproved",
            TransferStatus::ClientRejected => "clientRejected",
            TransferStatus::ServerApproved => "serverApproved",
            TransferStatus::ServerRejected => "serverRejected",
            TransferStatus::ServerCancelled => "serverCancelled",
        }
    }

    /// Case-sensitive parse of the wire token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "pending" => Some(TransferStatus::Pending),
            "clientApproved" => Some(TransferStatus::ClientApproved),
            "clientRejected" => Some(TransferStatus::ClientRejected),
            "serverApproved" => Some(TransferStatus::ServerApproved),
            "serverRejected" => Some(TransferStatus::ServerRejected),
            "serverCancelled" => Some(TransferStatus::ServerCancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }

    /// Whether sponsorship moved to the requester.
    pub fn is_approved(&self) -> bool {
        matches!(
            self,
            TransferStatus::ClientApproved | TransferStatus::ServerApproved
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to a pending transfer whose deadline passes without a reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoResponsePolicy {
    #[default]
    Approve,
    Reject,
}

impl AutoResponsePolicy {
    pub fn outcome(&self) -> TransferStatus {
        match self {
            AutoResponsePolicy::Approve => TransferStatus::ServerApproved,
            AutoResponsePolicy::Reject => TransferStatus::ServerRejected,
        }
    }
}
