//! RPC envelopes.
//!
//! Incoming frames are parsed structurally with `quick-xml` into a small
//! element tree and then interpreted as either a `<hello>` or an `<rpc>`.
//! Requests are decoded into [`Operation`] values; anything that is not
//! recognized becomes a structured [`RpcError`] instead of being ignored.
//! Replies are rendered back to XML with every text value escaped.

use std::fmt;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::utils::validation::validate_identifier;

/// XML namespace of protocol envelopes
pub const BASE_NAMESPACE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Capability both peers must advertise
pub const BASE_CAPABILITY: &str = "urn:ietf:params:netconf:base:1.0";

/// Edits apply directly to the running datastore
pub const WRITABLE_RUNNING_CAPABILITY: &str = "urn:ietf:params:netconf:capability:writable-running:1.0";

/// Configuration datastores a request can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datastore {
    Running,
    Candidate,
    Startup,
}

impl Datastore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datastore::Running => "running",
            Datastore::Candidate => "candidate",
            Datastore::Startup => "startup",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "running" => Some(Datastore::Running),
            "candidate" => Some(Datastore::Candidate),
            "startup" => Some(Datastore::Startup),
            _ => None,
        }
    }
}

impl fmt::Display for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized protocol operations
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Operational state of one element
    Get { element_id: String },
    /// Configuration of one element from a datastore
    GetConfig { element_id: String, source: Datastore },
    /// Replace configuration leaves of one element
    EditConfig {
        element_id: String,
        target: Datastore,
        changes: Vec<(String, String)>,
    },
    CloseSession,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get { .. } => "get",
            Operation::GetConfig { .. } => "get-config",
            Operation::EditConfig { .. } => "edit-config",
            Operation::CloseSession => "close-session",
        }
    }

    fn render(&self) -> String {
        match self {
            Operation::Get { element_id } => {
                format!("<get><element-id>{}</element-id></get>", escape(element_id))
            }
            Operation::GetConfig { element_id, source } => format!(
                "<get-config><source><{}/></source><element-id>{}</element-id></get-config>",
                source,
                escape(element_id)
            ),
            Operation::EditConfig {
                element_id,
                target,
                changes,
            } => {
                let mut leaves = String::new();
                for (key, value) in changes {
                    leaves.push_str(&format!("<{}>{}</{}>", key, escape(value), key));
                }
                format!(
                    "<edit-config><target><{}/></target><element-id>{}</element-id><config><system>{}</system></config></edit-config>",
                    target,
                    escape(element_id),
                    leaves
                )
            }
            Operation::CloseSession => "<close-session/>".to_string(),
        }
    }
}

/// A decoded `<rpc>` request
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub message_id: String,
    pub operation: Operation,
}

impl RpcRequest {
    pub fn new(message_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            message_id: message_id.into(),
            operation,
        }
    }

    /// Render as an `<rpc>` document
    pub fn render(&self) -> String {
        format!(
            "<rpc message-id=\"{}\" xmlns=\"{}\">{}</rpc>\n",
            escape(&self.message_id),
            BASE_NAMESPACE,
            self.operation.render()
        )
    }
}

/// A decoded `<hello>`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hello {
    pub capabilities: Vec<String>,
    pub session_id: Option<u32>,
}

impl Hello {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Any message a peer may send
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(Hello),
    Rpc(RpcRequest),
}

/// `error-type` of an rpc-error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `error-tag` of an rpc-error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    MalformedMessage,
    OperationNotSupported,
    MissingAttribute,
    MissingElement,
    BadElement,
    UnknownElement,
    InvalidValue,
}

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::MalformedMessage => "malformed-message",
            ErrorTag::OperationNotSupported => "operation-not-supported",
            ErrorTag::MissingAttribute => "missing-attribute",
            ErrorTag::MissingElement => "missing-element",
            ErrorTag::BadElement => "bad-element",
            ErrorTag::UnknownElement => "unknown-element",
            ErrorTag::InvalidValue => "invalid-value",
        }
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured error carried in an `<rpc-reply>`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error_type}/{tag}: {message}")]
pub struct RpcError {
    pub error_type: ErrorType,
    pub tag: ErrorTag,
    pub message: String,
}

impl RpcError {
    pub fn new(error_type: ErrorType, tag: ErrorTag, message: impl Into<String>) -> Self {
        Self {
            error_type,
            tag,
            message: message.into(),
        }
    }

    pub fn operation_not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Protocol, ErrorTag::OperationNotSupported, message)
    }

    fn render(&self) -> String {
        format!(
            "  <rpc-error>\n    <error-type>{}</error-type>\n    <error-tag>{}</error-tag>\n    <error-severity>error</error-severity>\n    <error-message>{}</error-message>\n  </rpc-error>",
            self.error_type,
            self.tag,
            escape(&self.message)
        )
    }
}

/// A frame that could not be decoded into a [`Message`]
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedFrame {
    /// Present when the envelope was readable far enough to carry one
    pub message_id: Option<String>,
    pub error: RpcError,
}

impl RejectedFrame {
    fn new(message_id: Option<&str>, error: RpcError) -> Self {
        Self {
            message_id: message_id.map(str::to_string),
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// Pre-rendered `<data>` element
    Data(String),
    Ok,
    Error(RpcError),
}

/// An `<rpc-reply>`
#[derive(Debug, Clone, PartialEq)]
pub struct RpcReply {
    pub message_id: Option<String>,
    pub body: ReplyBody,
}

impl RpcReply {
    pub fn ok(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            body: ReplyBody::Ok,
        }
    }

    pub fn error(message_id: Option<String>, error: RpcError) -> Self {
        Self {
            message_id,
            body: ReplyBody::Error(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, ReplyBody::Error(_))
    }

    pub fn render(&self) -> String {
        let mut xml = String::from("<rpc-reply");
        if let Some(id) = &self.message_id {
            xml.push_str(&format!(" message-id=\"{}\"", escape(id)));
        }
        xml.push_str(&format!(" xmlns=\"{}\">\n", BASE_NAMESPACE));

        match &self.body {
            ReplyBody::Data(data) => xml.push_str(data),
            ReplyBody::Ok => xml.push_str("  <ok/>"),
            ReplyBody::Error(error) => xml.push_str(&error.render()),
        }

        xml.push_str("\n</rpc-reply>\n");
        xml
    }
}

/// Server `<hello>` advertising the supported capabilities and the session id
pub fn server_hello(session_id: u32) -> String {
    format!(
        "<hello xmlns=\"{}\">\n  <capabilities>\n    <capability>{}</capability>\n    <capability>{}</capability>\n  </capabilities>\n  <session-id>{}</session-id>\n</hello>\n",
        BASE_NAMESPACE, BASE_CAPABILITY, WRITABLE_RUNNING_CAPABILITY, session_id
    )
}

/// Client `<hello>` advertising the base capability
pub fn client_hello() -> String {
    format!(
        "<hello xmlns=\"{}\">\n  <capabilities>\n    <capability>{}</capability>\n  </capabilities>\n</hello>\n",
        BASE_NAMESPACE, BASE_CAPABILITY
    )
}

/// Decode one frame
pub fn parse_message(frame: &str) -> Result<Message, RejectedFrame> {
    let root = parse_document(frame).map_err(|detail| {
        RejectedFrame::new(
            None,
            RpcError::new(
                ErrorType::Rpc,
                ErrorTag::MalformedMessage,
                format!("malformed message: {}", detail),
            ),
        )
    })?;

    match root.name.as_str() {
        "hello" => parse_hello(&root).map(Message::Hello),
        "rpc" => parse_rpc(&root).map(Message::Rpc),
        other => Err(RejectedFrame::new(
            None,
            RpcError::new(
                ErrorType::Rpc,
                ErrorTag::MalformedMessage,
                format!("unexpected root element <{}>", other),
            ),
        )),
    }
}

fn parse_hello(hello: &XmlElement) -> Result<Hello, RejectedFrame> {
    let capabilities = hello
        .child("capabilities")
        .map(|caps| {
            caps.children
                .iter()
                .filter(|c| c.name == "capability")
                .map(|c| c.text().to_string())
                .collect()
        })
        .unwrap_or_default();

    let session_id = match hello.child("session-id") {
        Some(element) => Some(element.text().parse::<u32>().map_err(|_| {
            RejectedFrame::new(
                None,
                RpcError::new(
                    ErrorType::Protocol,
                    ErrorTag::InvalidValue,
                    format!("invalid session-id '{}'", element.text()),
                ),
            )
        })?),
        None => None,
    };

    Ok(Hello {
        capabilities,
        session_id,
    })
}

fn parse_rpc(rpc: &XmlElement) -> Result<RpcRequest, RejectedFrame> {
    let message_id = rpc.attribute("message-id").ok_or_else(|| {
        RejectedFrame::new(
            None,
            RpcError::new(
                ErrorType::Rpc,
                ErrorTag::MissingAttribute,
                "rpc is missing the message-id attribute",
            ),
        )
    })?;
    let reject = |error: RpcError| RejectedFrame::new(Some(message_id), error);

    let op = match rpc.children.as_slice() {
        [op] => op,
        [] => {
            return Err(reject(RpcError::new(
                ErrorType::Protocol,
                ErrorTag::MissingElement,
                "rpc carries no operation",
            )))
        }
        _ => {
            return Err(reject(RpcError::new(
                ErrorType::Protocol,
                ErrorTag::BadElement,
                "rpc carries more than one operation",
            )))
        }
    };

    let operation = match op.name.as_str() {
        "get" => Operation::Get {
            element_id: element_id(op).map_err(reject)?,
        },
        "get-config" => Operation::GetConfig {
            source: datastore(op, "source").map_err(reject)?,
            element_id: element_id(op).map_err(reject)?,
        },
        "edit-config" => Operation::EditConfig {
            target: datastore(op, "target").map_err(reject)?,
            element_id: element_id(op).map_err(reject)?,
            changes: config_leaves(op).map_err(reject)?,
        },
        "close-session" => Operation::CloseSession,
        other => {
            return Err(reject(RpcError::operation_not_supported(format!(
                "operation '{}' is not supported",
                other
            ))))
        }
    };

    Ok(RpcRequest {
        message_id: message_id.to_string(),
        operation,
    })
}

fn element_id(op: &XmlElement) -> Result<String, RpcError> {
    let element = op.child("element-id").ok_or_else(|| {
        RpcError::new(
            ErrorType::Protocol,
            ErrorTag::MissingElement,
            format!("{} requires <element-id>", op.name),
        )
    })?;

    let id = element.text();
    validate_identifier("element", id)
        .map_err(|message| RpcError::new(ErrorType::Protocol, ErrorTag::BadElement, message))?;
    Ok(id.to_string())
}

fn datastore(op: &XmlElement, wrapper: &str) -> Result<Datastore, RpcError> {
    let missing = || {
        RpcError::new(
            ErrorType::Protocol,
            ErrorTag::MissingElement,
            format!("{} requires a <{}> datastore", op.name, wrapper),
        )
    };

    let store = op.child(wrapper).and_then(|w| w.children.first()).ok_or_else(missing)?;
    Datastore::from_name(&store.name).ok_or_else(|| {
        RpcError::new(
            ErrorType::Protocol,
            ErrorTag::BadElement,
            format!("unknown datastore <{}>", store.name),
        )
    })
}

/// Leaf elements under `<config>`, in document order
fn config_leaves(op: &XmlElement) -> Result<Vec<(String, String)>, RpcError> {
    let config = op.child("config").ok_or_else(|| {
        RpcError::new(
            ErrorType::Protocol,
            ErrorTag::MissingElement,
            "edit-config requires <config>",
        )
    })?;

    let mut leaves = Vec::new();
    for container in &config.children {
        // Direct children of <config> are containers, even when empty
        if container.children.is_empty() && container.text().is_empty() {
            continue;
        }
        collect_leaves(container, &mut leaves);
    }
    Ok(leaves)
}

fn collect_leaves(element: &XmlElement, leaves: &mut Vec<(String, String)>) {
    if element.children.is_empty() {
        leaves.push((element.name.clone(), element.text().to_string()));
        return;
    }
    for child in &element.children {
        collect_leaves(child, leaves);
    }
}

/// Minimal element tree; namespaces are dropped, local names kept
#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn text(&self) -> &str {
        self.text.trim()
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = utf8(start.local_name().as_ref())?;

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = utf8(attr.key.local_name().as_ref())?;
            let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }
}

fn utf8(bytes: &[u8]) -> Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

fn parse_document(xml: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => attach(&mut stack, &mut root, XmlElement::from_start(&start)?)?,
            Event::End(end) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| format!("unexpected closing tag </{}>", String::from_utf8_lossy(end.name().as_ref())))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| e.to_string())?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None => return Err("text outside the root element".to_string()),
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("document ends inside <{}>", open.name));
    }
    root.ok_or_else(|| "empty document".to_string())
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err("more than one root element".to_string()),
    }
    Ok(())
}
