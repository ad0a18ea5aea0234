//! # EPP codec core
//!
//! Typed encoding and decoding of Extensible Provisioning Protocol
//! messages over an owned fragment tree, independent of any object
//! mapping.
//!
//! ## Building blocks
//!
//! - [`Component`]: the encode/decode contract every data element implements
//! - [`FactoryDirectory`]: namespace-keyed factories that turn an inbound
//!   fragment into the right typed component
//! - [`Command`] / [`Response`]: the message envelope with transaction-id
//!   correlation, results and extension slots
//! - [`TransferRecord`]: the sponsorship transfer state machine
//! - [`PendingActionNotification`]: outcomes of deferred operations, read
//!   through the poll queue
//! - [`Codec`]: the facade tying them together
//!
//! ## Example
//!
//! ```rust,ignore
//! let directory = FactoryDirectory::global();
//! epp_mappings::install(&directory)?;
//!
//! let codec = Codec::new(directory, CodecConfig::default());
//! let fragment = codec.encode_command(&command)?;
//! let response = codec.decode_response(&inbound)?;
//! if !response.is_success() { /* ... */ }
//! ```
//!
//! The core performs no I/O. Fragments are handed to and received from a
//! transport that owns XML text and framing.

#![deny(unsafe_code)]

pub mod codec;
pub mod component;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fragment;
pub mod object;
pub mod poll;
pub mod registry;
pub mod result;
pub mod status;
pub mod transfer;
pub mod trid;

pub use codec::Codec;
pub use component::{CodecContext, Component, Payload, RootElement};
pub use config::{CodecConfig, TransferConfig};
pub use envelope::{Command, CommandBody, Extension, Message, Response, EPP_NAMESPACE};
pub use error::{EppError, ErrorKind, Result};
pub use fragment::{Attribute, Element};
pub use object::{AuthInfo, ObjectMapping, Period, PeriodUnit};
pub use poll::{MessageQueue, PendingActionNotification, PollRequest};
pub use registry::{FactoryDirectory, MappingFactory, Role};
pub use result::{ExtValue, ResponseResult, ResultCode};
pub use status::{ObjectStatus, StatusPolicy};
pub use transfer::{
    AutoResponsePolicy, TransferBook, TransferCommand, TransferData, TransferOp, TransferRecord,
    TransferStatus,
};
pub use trid::TransactionId;
