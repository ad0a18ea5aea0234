//! Command and response envelopes.
//!
//! A command owns a transaction id, one body (an object payload or a poll
//! request) and an ordered list of extensions. A response owns the echoed
//! transaction id, a non-empty ordered list of results, and optionally a
//! message-queue marker, a payload and extensions.

use crate::component::{Payload, RootElement};
use crate::fragment::Element;
use crate::object::ObjectMapping;
use crate::poll::{MessageQueue, PendingActionNotification, PollRequest};
use crate::result::ResponseResult;
use crate::trid::TransactionId;

/// Namespace of the protocol envelope.
pub const EPP_NAMESPACE: &str = "urn:ietf:params:xml:ns:epp-1.0";

/// One entry of an `<extension>` block.
#[derive(Clone, Debug, PartialEq)]
pub enum Extension {
    /// Claimed by a registered factory and decoded into a typed value.
    Mapped(Box<dyn Payload>),
    /// No factory claims the namespace; kept verbatim and re-emitted unchanged.
    Opaque(Element),
}

impl Extension {
    pub fn namespace(&self) -> &str {
        match self {
            Extension::Mapped(payload) => payload.namespace(),
            Extension::Opaque(element) => &element.namespace,
        }
    }

    pub fn element_name(&self) -> &str {
        match self {
            Extension::Mapped(payload) => payload.element_name(),
            Extension::Opaque(element) => &element.name,
        }
    }

    pub fn downcast_ref<T: RootElement>(&self) -> Option<&T> {
        match self {
            Extension::Mapped(payload) => payload.downcast_ref::<T>(),
            Extension::Opaque(_) => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Element> {
        match self {
            Extension::Opaque(element) => Some(element),
            Extension::Mapped(_) => None,
        }
    }
}

fn find_extension<'a, T: RootElement>(extensions: &'a [Extension]) -> Option<&'a T> {
    extensions.iter().find_map(Extension::downcast_ref::<T>)
}

/// What a command asks for.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandBody {
    /// An object command; the verb is the payload's root element name.
    Object(Box<dyn Payload>),
    Poll(PollRequest),
}

/// An outgoing (or decoded incoming) command.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    transaction_id: TransactionId,
    body: CommandBody,
    extensions: Vec<Extension>,
}

impl Command {
    pub fn new<P: RootElement>(payload: P, transaction_id: TransactionId) -> Self {
        Self::from_body(CommandBody::Object(Box::new(payload)), transaction_id)
    }

    pub fn poll(request: PollRequest, transaction_id: TransactionId) -> Self {
        Self::from_body(CommandBody::Poll(request), transaction_id)
    }

    pub fn from_body(body: CommandBody, transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            body,
            extensions: Vec::new(),
        }
    }

    pub fn with_extension<P: RootElement>(mut self, extension: P) -> Self {
        self.extensions.push(Extension::Mapped(Box::new(extension)));
        self
    }

    pub fn with_opaque_extension(mut self, element: Element) -> Self {
        self.extensions.push(Extension::Opaque(element));
        self
    }

    pub(crate) fn push_extension(&mut self, extension: Extension) {
        self.extensions.push(extension);
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn body(&self) -> &CommandBody {
        &self.body
    }

    /// The command verb: `poll` or the payload's root element name.
    pub fn verb(&self) -> &str {
        match &self.body {
            CommandBody::Object(payload) => payload.element_name(),
            CommandBody::Poll(_) => "poll",
        }
    }

    pub fn payload(&self) -> Option<&(dyn Payload + 'static)> {
        match &self.body {
            CommandBody::Object(payload) => Some(&**payload),
            CommandBody::Poll(_) => None,
        }
    }

    pub fn payload_as<T: RootElement>(&self) -> Option<&T> {
        self.payload().and_then(|p| p.downcast_ref::<T>())
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn extension<T: RootElement>(&self) -> Option<&T> {
        find_extension(&self.extensions)
    }
}

/// A server response.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    transaction_id: TransactionId,
    results: Vec<ResponseResult>,
    message_queue: Option<MessageQueue>,
    payload: Option<Box<dyn Payload>>,
    extensions: Vec<Extension>,
}

impl Response {
    pub fn new(transaction_id: TransactionId, result: ResponseResult) -> Self {
        Self {
            transaction_id,
            results: vec![result],
            message_queue: None,
            payload: None,
            extensions: Vec::new(),
        }
    }

    /// An empty shell filled by the codec while decoding.
    pub(crate) fn empty(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            results: Vec::new(),
            message_queue: None,
            payload: None,
            extensions: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: ResponseResult) -> Self {
        self.results.push(result);
        self
    }

    pub fn with_payload<P: RootElement>(self, payload: P) -> Self {
        self.with_boxed_payload(Box::new(payload))
    }

    pub fn with_boxed_payload(mut self, payload: Box<dyn Payload>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_message_queue(mut self, queue: MessageQueue) -> Self {
        self.message_queue = Some(queue);
        self
    }

    pub fn with_extension<P: RootElement>(mut self, extension: P) -> Self {
        self.extensions.push(Extension::Mapped(Box::new(extension)));
        self
    }

    pub fn with_opaque_extension(mut self, element: Element) -> Self {
        self.extensions.push(Extension::Opaque(element));
        self
    }

    pub(crate) fn push_extension(&mut self, extension: Extension) {
        self.extensions.push(extension);
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn results(&self) -> &[ResponseResult] {
        &self.results
    }

    /// Overall success is governed by the first result.
    pub fn is_success(&self) -> bool {
        self.results.first().map_or(false, ResponseResult::is_success)
    }

    pub fn message_queue(&self) -> Option<&MessageQueue> {
        self.message_queue.as_ref()
    }

    pub fn payload(&self) -> Option<&(dyn Payload + 'static)> {
        self.payload.as_deref()
    }

    pub fn payload_as<T: RootElement>(&self) -> Option<&T> {
        self.payload().and_then(|p| p.downcast_ref::<T>())
    }

    /// The pending-action notification delivered by a poll read, if any.
    pub fn pending_action<M: ObjectMapping>(&self) -> Option<&PendingActionNotification<M>> {
        self.payload_as::<PendingActionNotification<M>>()
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn extension<T: RootElement>(&self) -> Option<&T> {
        find_extension(&self.extensions)
    }

    /// Whether this response answers `command`.
    pub fn answers(&self, command: &Command) -> bool {
        self.transaction_id.correlates_with(command.transaction_id())
    }
}

/// Either side of the exchange.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Command(Command),
    Response(Response),
}

impl Message {
    pub fn transaction_id(&self) -> &TransactionId {
        match self {
            Message::Command(command) => command.transaction_id(),
            Message::Response(response) => response.transaction_id(),
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Message::Command(command) => Some(command),
            Message::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Response(response) => Some(response),
            Message::Command(_) => None,
        }
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}
