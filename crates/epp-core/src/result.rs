//! Response result codes and result entries.

use std::fmt;

use crate::component::{require_text, CodecContext, Component};
use crate::envelope::EPP_NAMESPACE;
use crate::error::{EppError, Result};
use crate::fragment::{expect_element, Element};

/// A four-digit result code. Codes below 2000 mean success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultCode(u16);

impl ResultCode {
    pub const COMMAND_COMPLETED: Self = Self(1000);
    pub const ACTION_PENDING: Self = Self(1001);
    pub const NO_MESSAGES: Self = Self(1300);
    pub const MESSAGES_QUEUED: Self = Self(1301);
    pub const ENDING_SESSION: Self = Self(1500);
    pub const UNKNOWN_COMMAND: Self = Self(2000);
    pub const SYNTAX_ERROR: Self = Self(2001);
    pub const USE_ERROR: Self = Self(2002);
    pub const MISSING_PARAMETER: Self = Self(2003);
    pub const VALUE_RANGE_ERROR: Self = Self(2004);
    pub const VALUE_SYNTAX_ERROR: Self = Self(2005);
    pub const UNIMPLEMENTED_VERSION: Self = Self(2100);
    pub const UNIMPLEMENTED_COMMAND: Self = Self(2101);
    pub const UNIMPLEMENTED_OPTION: Self = Self(2102);
    pub const UNIMPLEMENTED_EXTENSION: Self = Self(2103);
    pub const BILLING_FAILURE: Self = Self(2104);
    pub const NOT_ELIGIBLE_FOR_RENEWAL: Self = Self(2105);
    pub const NOT_ELIGIBLE_FOR_TRANSFER: Self = Self(2106);
    pub const AUTHENTICATION_ERROR: Self = Self(2200);
    pub const AUTHORIZATION_ERROR: Self = Self(2201);
    pub const INVALID_AUTHORIZATION: Self = Self(2202);
    pub const PENDING_TRANSFER: Self = Self(2300);
    pub const NOT_PENDING_TRANSFER: Self = Self(2301);
    pub const OBJECT_EXISTS: Self = Self(2302);
    pub const OBJECT_DOES_NOT_EXIST: Self = Self(2303);
    pub const STATUS_PROHIBITS_OPERATION: Self = Self(2304);
    pub const ASSOCIATION_PROHIBITS_OPERATION: Self = Self(2305);
    pub const PARAMETER_VALUE_POLICY_ERROR: Self = Self(2306);
    pub const UNIMPLEMENTED_OBJECT_SERVICE: Self = Self(2307);
    pub const DATA_MANAGEMENT_POLICY_VIOLATION: Self = Self(2308);
    pub const COMMAND_FAILED: Self = Self(2400);
    pub const COMMAND_FAILED_CLOSING: Self = Self(2500);
    pub const AUTHENTICATION_ERROR_CLOSING: Self = Self(2501);
    pub const SESSION_LIMIT_EXCEEDED: Self = Self(2502);

    /// Accepts any four-digit code starting with 1 or 2.
    pub fn new(code: u16) -> Option<Self> {
        (1000..3000).contains(&code).then_some(Self(code))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        self.0 < 2000
    }

    /// Codes after which the server closes the connection.
    pub fn closes_session(&self) -> bool {
        self.0 == 1500 || (2500..2600).contains(&self.0)
    }

    /// Standard text for published codes.
    pub fn default_message(&self) -> &'static str {
        match self.0 {
            1000 => "Command completed successfully",
            1001 => "Command completed successfully; action pending",
            1300 => "Command completed successfully; no messages",
            1301 => "Command completed successfully; ack to dequeue",
            1500 => "Command completed successfully; ending session",
            2000 => "Unknown command",
            2001 => "Command syntax error",
            2002 => "Command use error",
            2003 => "Required parameter missing",
            2004 => "Parameter value range error",
            2005 => "Parameter value syntax error",
            2100 => "Unimplemented protocol version",
            2101 => "Unimplemented command",
            2102 => "Unimplemented option",
            2103 => "Unimplemented extension",
            2104 => "Billing failure",
            2105 => "Object is not eligible for renewal",
            2106 => "Object is not eligible for transfer",
            2200 => "Authentication error",
            2201 => "Authorization error",
            2202 => "Invalid authorization information",
            2300 => "Object pending transfer",
            2301 => "Object not pending transfer",
            2302 => "Object exists",
            2303 => "Object does not exist",
            2304 => "Object status prohibits operation",
            2305 => "Object association prohibits operation",
            2306 => "Parameter value policy error",
            2307 => "Unimplemented object service",
            2308 => "Data management policy violation",
            2400 => "Command failed",
            2500 => "Command failed; server closing connection",
            2501 => "Authentication error; server closing connection",
            2502 => "Session limit exceeded; server closing connection",
            _ => "Unpublished result code",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        Self::COMMAND_COMPLETED
    }
}

/// An `<extValue>`: the offending element plus an explanation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtValue {
    pub value: Element,
    pub reason: String,
    pub language: Option<String>,
}

/// One `<result>` of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseResult {
    pub code: ResultCode,
    pub message: String,
    pub language: String,
    /// Diagnostic fragments from `<value>` children, in order.
    pub values: Vec<Element>,
    pub ext_values: Vec<ExtValue>,
}

/// `1000 Command completed successfully`, ready to encode.
impl Default for ResponseResult {
    fn default() -> Self {
        Self::new(ResultCode::default())
    }
}

impl ResponseResult {
    /// A result with the code's standard message.
    pub fn new(code: ResultCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            language: "en".into(),
            values: Vec::new(),
            ext_values: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>, language: impl Into<String>) -> Self {
        self.message = message.into();
        self.language = language.into();
        self
    }

    pub fn with_value(mut self, value: Element) -> Self {
        self.values.push(value);
        self
    }

    pub fn with_ext_value(mut self, value: Element, reason: impl Into<String>) -> Self {
        self.ext_values.push(ExtValue {
            value,
            reason: reason.into(),
            language: None,
        });
        self
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

impl Component for ResponseResult {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let message = require_text(&self.message, "message")?;
        let mut msg = Element::leaf(EPP_NAMESPACE, "msg", message);
        if self.language != "en" && !self.language.is_empty() {
            msg = msg.with_attr("lang", &self.language);
        }
        let mut element = Element::new(EPP_NAMESPACE, "result")
            .with_attr("code", self.code.to_string())
            .with_child(msg);
        for value in &self.values {
            element.push(Element::new(EPP_NAMESPACE, "value").with_child(value.clone()));
        }
        for ext in &self.ext_values {
            let reason = Element::leaf(EPP_NAMESPACE, "reason", ext.reason.as_str())
                .with_opt_attr("lang", ext.language.as_deref());
            element.push(
                Element::new(EPP_NAMESPACE, "extValue")
                    .with_child(Element::new(EPP_NAMESPACE, "value").with_child(ext.value.clone()))
                    .with_child(reason),
            );
        }
        Ok(element)
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, EPP_NAMESPACE, "result")?;
        let raw = element.required_attr("code")?;
        self.code = raw
            .parse::<u16>()
            .ok()
            .and_then(ResultCode::new)
            .ok_or_else(|| EppError::decode("result", format!("invalid result code '{raw}'")))?;

        let msg = element.required_child("msg")?;
        self.message = msg.text().to_string();
        self.language = msg.attr("lang").unwrap_or("en").to_string();

        self.values = element
            .children_named("value")
            .filter_map(|v| v.first_child().cloned())
            .collect();

        self.ext_values = element
            .children_named("extValue")
            .map(|ext| -> Result<ExtValue> {
                let value = ext
                    .required_child("value")?
                    .first_child()
                    .cloned()
                    .ok_or_else(|| EppError::missing_child("value"))?;
                let reason = ext.required_child("reason")?;
                Ok(ExtValue {
                    value,
                    reason: reason.text().to_string(),
                    language: reason.attr("lang").map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }
}
