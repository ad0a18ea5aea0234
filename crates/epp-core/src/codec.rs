//! The codec facade: messages to `<epp>` fragments and back.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::component::{
    decode_children, decode_opt_child, require_non_empty, CodecContext, Component,
};
use crate::config::CodecConfig;
use crate::envelope::{Command, CommandBody, Extension, Message, Response, EPP_NAMESPACE};
use crate::error::{EppError, Result};
use crate::fragment::{expect_element, Element};
use crate::poll::{MessageQueue, PollRequest};
use crate::registry::{FactoryDirectory, Role};
use crate::result::ResponseResult;
use crate::trid::TransactionId;

/// Session-level elements the codec does not model.
const SESSION_ELEMENTS: &[&str] = &["greeting", "hello", "login", "logout"];

/// Encodes and decodes whole messages against a factory directory.
#[derive(Clone, Debug)]
pub struct Codec {
    directory: Arc<FactoryDirectory>,
    context: CodecContext,
}

impl Codec {
    pub fn new(directory: Arc<FactoryDirectory>, config: CodecConfig) -> Self {
        Self {
            directory,
            context: CodecContext::new(config),
        }
    }

    /// A codec over the process-wide directory.
    pub fn global(config: CodecConfig) -> Self {
        Self::new(FactoryDirectory::global(), config)
    }

    pub fn directory(&self) -> &FactoryDirectory {
        &self.directory
    }

    pub fn context(&self) -> &CodecContext {
        &self.context
    }

    // ── Encoding ────────────────────────────────────────────────────────

    pub fn encode(&self, message: &Message) -> Result<Element> {
        match message {
            Message::Command(command) => self.encode_command(command),
            Message::Response(response) => self.encode_response(response),
        }
    }

    pub fn encode_command(&self, command: &Command) -> Result<Element> {
        let ctx = &self.context;
        let client_id = command.transaction_id().outgoing_client_id()?;

        let verb = match command.body() {
            CommandBody::Object(payload) => {
                let mut verb = Element::new(EPP_NAMESPACE, payload.element_name());
                for attr in payload.payload_verb_attributes() {
                    verb.set_attr(attr.name, attr.value);
                }
                verb.with_child(payload.encode_payload(ctx)?)
            }
            CommandBody::Poll(request) => request.encode()?,
        };

        let element = Element::new(EPP_NAMESPACE, "command")
            .with_child(verb)
            .with_opt_child(self.encode_extensions(command.extensions())?)
            .with_child(Element::leaf(EPP_NAMESPACE, "clTRID", client_id));
        Ok(self.wrap(element))
    }

    pub fn encode_response(&self, response: &Response) -> Result<Element> {
        let ctx = &self.context;
        let results = require_non_empty(response.results(), "results")?;

        let mut element = Element::new(EPP_NAMESPACE, "response");
        for result in results {
            element.push(result.encode(ctx)?);
        }
        let res_data = response
            .payload()
            .map(|payload| payload.encode_payload(ctx))
            .transpose()?
            .map(|payload| Element::new(EPP_NAMESPACE, "resData").with_child(payload));
        let element = element
            .with_opt_child(response.message_queue().map(|q| q.encode(ctx)).transpose()?)
            .with_opt_child(res_data)
            .with_opt_child(self.encode_extensions(response.extensions())?)
            .with_child(response.transaction_id().encode(ctx)?);
        Ok(self.wrap(element))
    }

    fn encode_extensions(&self, extensions: &[Extension]) -> Result<Option<Element>> {
        if extensions.is_empty() {
            return Ok(None);
        }
        let mut block = Element::new(EPP_NAMESPACE, "extension");
        for extension in extensions {
            block.push(match extension {
                Extension::Mapped(payload) => payload.encode_payload(&self.context)?,
                Extension::Opaque(element) => element.clone(),
            });
        }
        Ok(Some(block))
    }

    fn wrap(&self, body: Element) -> Element {
        let mut root = Element::new(EPP_NAMESPACE, "epp").with_child(body);
        self.context.declare_schema(&mut root);
        root
    }

    // ── Decoding ────────────────────────────────────────────────────────

    /// Decodes an `<epp>` document into a command or a response.
    pub fn decode(&self, root: &Element) -> Result<Message> {
        self.decode_message(root).map_err(|err| {
            warn!(error = %err, kind = ?err.kind(), "Failed to decode message");
            err
        })
    }

    pub fn decode_command(&self, root: &Element) -> Result<Command> {
        match self.decode(root)? {
            Message::Command(command) => Ok(command),
            Message::Response(_) => Err(EppError::decode("response", "expected a command")),
        }
    }

    pub fn decode_response(&self, root: &Element) -> Result<Response> {
        match self.decode(root)? {
            Message::Response(response) => Ok(response),
            Message::Command(_) => Err(EppError::decode("command", "expected a response")),
        }
    }

    fn decode_message(&self, root: &Element) -> Result<Message> {
        expect_element(root, EPP_NAMESPACE, "epp")?;
        let body = root
            .children
            .iter()
            .find(|c| c.namespace == EPP_NAMESPACE)
            .ok_or_else(|| EppError::missing_child("command"))?;
        match body.name.as_str() {
            "command" => self.decode_command_body(body).map(Message::Command),
            "response" => self.decode_response_body(body).map(Message::Response),
            name if SESSION_ELEMENTS.contains(&name) => Err(session_element(name)),
            other => Err(EppError::decode(other, "not a command or response")),
        }
    }

    fn decode_command_body(&self, element: &Element) -> Result<Command> {
        let ctx = &self.context;
        let verb = element
            .children
            .iter()
            .find(|c| c.namespace == EPP_NAMESPACE && c.name != "extension" && c.name != "clTRID")
            .ok_or_else(|| EppError::missing_child("command verb"))?;

        let body = match verb.name.as_str() {
            "poll" => CommandBody::Poll(PollRequest::decode(verb)?),
            name if SESSION_ELEMENTS.contains(&name) => return Err(session_element(name)),
            name => {
                let root = verb
                    .first_child()
                    .ok_or_else(|| EppError::missing_child(format!("{name} payload")))?;
                let mut payload = self.directory.create_command(root, ctx)?;
                if payload.element_name() != name {
                    return Err(EppError::decode(
                        &root.name,
                        format!("payload does not match command verb '{name}'"),
                    ));
                }
                payload.absorb_payload_verb(verb)?;
                CommandBody::Object(payload)
            }
        };

        let transaction_id = element
            .optional_text("clTRID")
            .filter(|id| !id.is_empty())
            .map(TransactionId::client)
            .unwrap_or_default();

        let mut command = Command::from_body(body, transaction_id);
        for extension in self.decode_extensions(element, Role::Command)? {
            command.push_extension(extension);
        }
        debug!(verb = %command.verb(), trid = %command.transaction_id(), "Decoded command");
        Ok(command)
    }

    fn decode_response_body(&self, element: &Element) -> Result<Response> {
        let ctx = &self.context;
        let results: Vec<ResponseResult> = decode_children(element, "result", ctx)?;
        if results.is_empty() {
            return Err(EppError::missing_child("result"));
        }
        let transaction_id = TransactionId::decode_from(element.required_child("trID")?)?;

        let mut response = Response::empty(transaction_id);
        for result in results {
            response = response.with_result(result);
        }
        if let Some(queue) = decode_opt_child::<MessageQueue>(element, "msgQ", ctx)? {
            response = response.with_message_queue(queue);
        }
        if let Some(res_data) = element.child("resData") {
            let root = res_data
                .first_child()
                .ok_or_else(|| EppError::missing_child("resData payload"))?;
            response = response.with_boxed_payload(self.directory.create_response(root, ctx)?);
        }
        for extension in self.decode_extensions(element, Role::Response)? {
            response.push_extension(extension);
        }
        debug!(
            trid = %response.transaction_id(),
            code = %response.results()[0].code,
            "Decoded response"
        );
        Ok(response)
    }

    fn decode_extensions(&self, parent: &Element, role: Role) -> Result<Vec<Extension>> {
        let Some(block) = parent.child("extension") else {
            return Ok(Vec::new());
        };
        block
            .children
            .iter()
            .map(|fragment| -> Result<Extension> {
                match self.directory.claim_extension(fragment, role, &self.context)? {
                    Some(payload) => Ok(Extension::Mapped(payload)),
                    None => {
                        trace!(
                            namespace = %fragment.namespace,
                            element = %fragment.name,
                            "Keeping unclaimed extension verbatim"
                        );
                        Ok(Extension::Opaque(fragment.clone()))
                    }
                }
            })
            .collect()
    }
}

fn session_element(name: &str) -> EppError {
    EppError::decode(name, "session elements are handled by the session layer")
}
