//! Transaction identifiers: the (client id, server id) correlation pair.

use std::fmt;

use crate::component::{CodecContext, Component};
use crate::envelope::EPP_NAMESPACE;
use crate::error::{EppError, Result};
use crate::fragment::Element;

const MIN_CLIENT_ID_LEN: usize = 3;
const MAX_CLIENT_ID_LEN: usize = 64;
/// Room left for the prefix beside `-` and a 32-digit uuid.
const MAX_GENERATED_PREFIX_LEN: usize = MAX_CLIENT_ID_LEN - 33;

/// Correlates a response (or a pending-action notification) with the
/// command that caused it.
///
/// The client id is set by the caller when the command is built; the
/// server id is only ever filled by decoding. Fields are private so a
/// pair cannot be altered once attached to a message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TransactionId {
    client: Option<String>,
    server: Option<String>,
}

impl TransactionId {
    /// A client-side id for an outgoing command.
    pub fn client(id: impl Into<String>) -> Self {
        Self {
            client: Some(id.into()),
            server: None,
        }
    }

    /// A fresh client id stamped with the client identity: `<prefix>-<uuid>`.
    ///
    /// Whitespace is dropped from the prefix and it is cut to fit, so the
    /// result always passes outbound validation.
    pub fn generate(prefix: &str) -> Self {
        let prefix: String = prefix
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(MAX_GENERATED_PREFIX_LEN)
            .collect();
        Self::client(format!("{}-{}", prefix, uuid::Uuid::new_v4().simple()))
    }

    /// A complete pair as echoed by a server.
    pub fn pair(client: Option<String>, server: impl Into<String>) -> Self {
        Self {
            client,
            server: Some(server.into()),
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client.as_deref()
    }

    pub fn server_id(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Whether this pair answers a command carrying `command`'s client id.
    pub fn correlates_with(&self, command: &TransactionId) -> bool {
        self.client.is_some() && self.client == command.client
    }

    /// The client id of an outgoing command, validated.
    pub(crate) fn outgoing_client_id(&self) -> Result<&str> {
        let id = self
            .client
            .as_deref()
            .ok_or_else(|| EppError::missing_field("client-transaction-id"))?;
        validate_client_id(id)?;
        Ok(id)
    }

    /// Appends `<clTRID>`/`<svTRID>` children to `container`.
    pub fn encode_into(&self, mut container: Element) -> Result<Element> {
        if let Some(client) = &self.client {
            validate_client_id(client)?;
            container.push(Element::leaf(EPP_NAMESPACE, "clTRID", client.as_str()));
        }
        let server = self
            .server
            .as_deref()
            .ok_or_else(|| EppError::missing_field("server-transaction-id"))?;
        container.push(Element::leaf(EPP_NAMESPACE, "svTRID", server));
        Ok(container)
    }

    /// Reads `<clTRID>`/`<svTRID>` children of `container`; the server id is required.
    pub fn decode_from(container: &Element) -> Result<Self> {
        let client = container
            .child_in(EPP_NAMESPACE, "clTRID")
            .map(|c| c.text().to_string())
            .filter(|c| !c.is_empty());
        let server = container
            .required_child_in(EPP_NAMESPACE, "svTRID")?
            .text()
            .to_string();
        if server.is_empty() {
            return Err(EppError::decode("svTRID", "must not be empty"));
        }
        Ok(Self {
            client,
            server: Some(server),
        })
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.client.as_deref().unwrap_or("-"),
            self.server.as_deref().unwrap_or("-")
        )
    }
}

/// `<trID>` as carried by a response.
impl Component for TransactionId {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        self.encode_into(Element::new(EPP_NAMESPACE, "trID"))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        *self = Self::decode_from(element)?;
        Ok(())
    }
}

fn validate_client_id(id: &str) -> Result<()> {
    let len = id.chars().count();
    if !(MIN_CLIENT_ID_LEN..=MAX_CLIENT_ID_LEN).contains(&len) {
        return Err(EppError::state(
            "client-transaction-id",
            format!("length {len} is outside {MIN_CLIENT_ID_LEN}..={MAX_CLIENT_ID_LEN}"),
        ));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(EppError::state(
            "client-transaction-id",
            "must not contain whitespace",
        ));
    }
    Ok(())
}
