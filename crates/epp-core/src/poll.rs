//! Asynchronous outcomes: pending-action notifications and the poll queue.
//!
//! A server that cannot complete an operation synchronously answers with
//! result code 1001 and later queues a notification. The client reads it
//! with a separate `<poll op="req"/>` command and acknowledges it with
//! `<poll op="ack" msgID="…"/>`. Delivery guarantees belong to the
//! transport; this module only models the records.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};

use crate::component::{CodecContext, Component, RootElement};
use crate::envelope::EPP_NAMESPACE;
use crate::error::{EppError, Result};
use crate::fragment::{
    expect_element, format_bool, format_timestamp, parse_bool, parse_timestamp, Element,
};
use crate::object::ObjectMapping;
use crate::trid::TransactionId;

/// The poll command body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollRequest {
    /// Read the oldest queued message.
    Request,
    /// Remove a message from the queue.
    Acknowledge { message_id: String },
}

impl PollRequest {
    pub fn acknowledge(message_id: impl Into<String>) -> Self {
        PollRequest::Acknowledge {
            message_id: message_id.into(),
        }
    }

    pub fn encode(&self) -> Result<Element> {
        let element = Element::new(EPP_NAMESPACE, "poll");
        match self {
            PollRequest::Request => Ok(element.with_attr("op", "req")),
            PollRequest::Acknowledge { message_id } => {
                if message_id.trim().is_empty() {
                    return Err(EppError::missing_field("message-id"));
                }
                Ok(element.with_attr("op", "ack").with_attr("msgID", message_id))
            }
        }
    }

    pub fn decode(element: &Element) -> Result<Self> {
        expect_element(element, EPP_NAMESPACE, "poll")?;
        match element.required_attr("op")? {
            "req" => Ok(PollRequest::Request),
            "ack" => Ok(PollRequest::acknowledge(element.required_attr("msgID")?)),
            other => Err(EppError::decode("poll", format!("unknown op '{other}'"))),
        }
    }
}

/// `<msgQ>`: the state of the client's message queue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageQueue {
    /// Messages remaining in the queue.
    pub count: u64,
    /// Id of the message in this response, to acknowledge.
    pub id: String,
    pub queued_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub language: Option<String>,
}

impl MessageQueue {
    pub fn new(count: u64, id: impl Into<String>) -> Self {
        Self {
            count,
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, queued_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        self.queued_at = Some(queued_at);
        self.message = Some(message.into());
        self
    }

    /// The acknowledgement that dequeues this message.
    pub fn acknowledgement(&self) -> PollRequest {
        PollRequest::acknowledge(self.id.clone())
    }
}

impl Component for MessageQueue {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        if self.id.trim().is_empty() {
            return Err(EppError::missing_field("message-id"));
        }
        let message = self.message.as_ref().map(|m| {
            Element::leaf(EPP_NAMESPACE, "msg", m.as_str())
                .with_opt_attr("lang", self.language.as_deref())
        });
        Ok(Element::new(EPP_NAMESPACE, "msgQ")
            .with_attr("count", self.count.to_string())
            .with_attr("id", &self.id)
            .with_opt_child(
                self.queued_at
                    .map(|at| Element::leaf(EPP_NAMESPACE, "qDate", format_timestamp(&at))),
            )
            .with_opt_child(message))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, EPP_NAMESPACE, "msgQ")?;
        let count = element.required_attr("count")?;
        self.count = count
            .parse()
            .map_err(|_| EppError::decode("msgQ", format!("invalid count '{count}'")))?;
        self.id = element.required_attr("id")?.to_string();
        self.queued_at = element.optional_timestamp("qDate")?;
        let msg = element.child("msg");
        self.message = msg.map(|m| m.text().to_string());
        self.language = msg.and_then(|m| m.attr("lang")).map(str::to_string);
        Ok(())
    }
}

/// `<panData>`: the outcome of an operation that could not complete synchronously.
///
/// All four fields are required. A notification with a missing field can
/// exist in memory (e.g. while being assembled) but fails to encode with a
/// state error naming the field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingActionNotification<M: ObjectMapping> {
    identifier: Option<String>,
    outcome: Option<bool>,
    transaction_id: Option<TransactionId>,
    completed_at: Option<DateTime<Utc>>,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> PendingActionNotification<M> {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            ..Default::default()
        }
    }

    /// A notification with every field set.
    pub fn complete(
        identifier: impl Into<String>,
        outcome: bool,
        transaction_id: TransactionId,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self::new(identifier)
            .with_outcome(outcome)
            .with_transaction_id(transaction_id)
            .with_completed_at(completed_at)
    }

    pub fn with_outcome(mut self, outcome: bool) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// `true` when the deferred operation succeeded.
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Checks that every required field is present.
    pub fn validate(&self) -> Result<()> {
        match &self.identifier {
            Some(id) if !id.trim().is_empty() => {}
            _ => return Err(EppError::missing_field("object-identifier")),
        }
        if self.outcome.is_none() {
            return Err(EppError::missing_field("outcome"));
        }
        match &self.transaction_id {
            Some(trid) if trid.server_id().is_some() => {}
            _ => return Err(EppError::missing_field("originating-transaction-id")),
        }
        if self.completed_at.is_none() {
            return Err(EppError::missing_field("completion-timestamp"));
        }
        Ok(())
    }
}

impl<M: ObjectMapping> Component for PendingActionNotification<M> {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        self.validate()?;
        let (Some(identifier), Some(outcome), Some(trid), Some(completed_at)) = (
            &self.identifier,
            self.outcome,
            &self.transaction_id,
            self.completed_at,
        ) else {
            return Err(EppError::missing_field("object-identifier"));
        };

        let pa_trid = trid.encode_into(Element::new(M::NAMESPACE, "paTRID"))?;
        Ok(Element::new(M::NAMESPACE, "panData")
            .with_child(
                Element::leaf(M::NAMESPACE, M::IDENTIFIER, identifier.as_str())
                    .with_attr("paResult", format_bool(outcome)),
            )
            .with_child(pa_trid)
            .with_child(Element::leaf(
                M::NAMESPACE,
                "paDate",
                format_timestamp(&completed_at),
            )))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "panData")?;
        let id = element.required_child(M::IDENTIFIER)?;
        if id.text().is_empty() {
            return Err(EppError::decode(M::IDENTIFIER, "must not be empty"));
        }
        self.identifier = Some(id.text().to_string());
        self.outcome = Some(parse_bool("paResult", id.required_attr("paResult")?)?);
        self.transaction_id = Some(TransactionId::decode_from(element.required_child("paTRID")?)?);
        self.completed_at = Some(parse_timestamp(
            "paDate",
            element.required_child("paDate")?.text(),
        )?);
        Ok(())
    }
}

impl<M: ObjectMapping> RootElement for PendingActionNotification<M> {
    const NAMESPACE: &'static str = M::NAMESPACE;
    const ELEMENT: &'static str = "panData";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::decode_new;
    use crate::object::tests::Widget;
    use chrono::TimeZone;

    fn completed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1999, 4, 4, 22, 0, 0).unwrap()
    }

    fn notification() -> PendingActionNotification<Widget> {
        PendingActionNotification::complete(
            "example.com",
            true,
            TransactionId::pair(Some("ABC-12345".into()), "54321-XYZ"),
            completed_at(),
        )
    }

    #[test]
    fn notification_roundtrip() {
        let ctx = CodecContext::default();
        let pan = notification();
        let el = pan.encode(&ctx).unwrap();
        assert_eq!(el.child("name").unwrap().attr("paResult"), Some("1"));
        assert_eq!(el.child("paDate").unwrap().text(), "1999-04-04T22:00:00Z");
        assert_eq!(decode_new::<PendingActionNotification<Widget>>(&el, &ctx).unwrap(), pan);
    }

    #[test]
    fn missing_fields_are_named_in_order() {
        let ctx = CodecContext::default();
        let trid = TransactionId::pair(None, "54321-XYZ");

        let err = PendingActionNotification::<Widget>::default().encode(&ctx).unwrap_err();
        assert_eq!(err.subject(), "object-identifier");

        let err = PendingActionNotification::<Widget>::new("example.com")
            .encode(&ctx)
            .unwrap_err();
        assert_eq!(err.subject(), "outcome");

        let err = PendingActionNotification::<Widget>::new("example.com")
            .with_outcome(false)
            .with_transaction_id(TransactionId::client("ABC-12345"))
            .encode(&ctx)
            .unwrap_err();
        assert_eq!(err.subject(), "originating-transaction-id");

        let err = PendingActionNotification::<Widget>::new("example.com")
            .with_outcome(false)
            .with_transaction_id(trid)
            .encode(&ctx)
            .unwrap_err();
        assert!(err.is_state());
        assert_eq!(err.subject(), "completion-timestamp");
    }

    #[test]
    fn decode_requires_pa_result() {
        let ctx = CodecContext::default();
        let mut el = notification().encode(&ctx).unwrap();
        el.children[0].attributes.clear();
        assert!(decode_new::<PendingActionNotification<Widget>>(&el, &ctx)
            .unwrap_err()
            .is_decode());
    }

    #[test]
    fn poll_requests() {
        let req = PollRequest::Request.encode().unwrap();
        assert_eq!(req.attr("op"), Some("req"));
        assert_eq!(PollRequest::decode(&req).unwrap(), PollRequest::Request);

        let ack = PollRequest::acknowledge("12345").encode().unwrap();
        assert_eq!(ack.attr("msgID"), Some("12345"));
        assert_eq!(PollRequest::decode(&ack).unwrap(), PollRequest::acknowledge("12345"));

        assert!(PollRequest::acknowledge(" ").encode().unwrap_err().is_state());
        let bogus = Element::new(EPP_NAMESPACE, "poll").with_attr("op", "peek");
        assert!(PollRequest::decode(&bogus).unwrap_err().is_decode());
    }

    #[test]
    fn message_queue_roundtrip() {
        let ctx = CodecContext::default();
        let queue = MessageQueue::new(5, "12345")
            .with_message(completed_at(), "Pending action completed successfully.");
        let el = queue.encode(&ctx).unwrap();
        assert_eq!(el.attr("count"), Some("5"));
        assert_eq!(decode_new::<MessageQueue>(&el, &ctx).unwrap(), queue);
        assert_eq!(queue.acknowledgement(), PollRequest::acknowledge("12345"));
    }

    #[test]
    fn bare_message_queue_omits_children() {
        let el = MessageQueue::new(0, "1").encode(&CodecContext::default()).unwrap();
        assert!(el.children.is_empty());
    }
}
