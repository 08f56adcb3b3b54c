//! Request dispatch.
//!
//! [`Dispatcher`] maps decoded requests onto the shared topology and the
//! per-element configuration store. It never fails: every outcome, including
//! refusals, is an [`RpcReply`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;
use quick_xml::escape::escape;

use super::rpc::{Datastore, ErrorTag, ErrorType, Operation, ReplyBody, RpcError, RpcReply, RpcRequest};
use crate::topology::{ElementNode, Topology};
use crate::utils::validation::validate_identifier;

/// Configuration leaves an element accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKey {
    Hostname,
    NtpEnabled,
    LoggingLevel,
}

const LOGGING_LEVELS: [&str; 5] = ["debug", "info", "notice", "warning", "error"];

impl ConfigKey {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "hostname" => Some(ConfigKey::Hostname),
            "ntp-enabled" => Some(ConfigKey::NtpEnabled),
            "logging-level" => Some(ConfigKey::LoggingLevel),
            _ => None,
        }
    }

    fn check(&self, value: &str) -> Result<(), String> {
        match self {
            ConfigKey::Hostname => validate_identifier("hostname", value),
            ConfigKey::NtpEnabled => match value {
                "true" | "false" => Ok(()),
                _ => Err(format!("ntp-enabled must be true or false, got '{}'", value)),
            },
            ConfigKey::LoggingLevel => {
                if LOGGING_LEVELS.contains(&value) {
                    Ok(())
                } else {
                    Err(format!(
                        "logging-level must be one of {}, got '{}'",
                        LOGGING_LEVELS.join(", "),
                        value
                    ))
                }
            }
        }
    }
}

/// Configuration an element starts with
fn default_configuration(element_id: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("hostname".to_string(), element_id.to_string()),
        ("ntp-enabled".to_string(), "true".to_string()),
        ("logging-level".to_string(), "info".to_string()),
    ])
}

/// Executes requests against a topology
#[derive(Debug)]
pub struct Dispatcher {
    topology: Arc<Topology>,
    /// Running configuration of elements that have been edited
    configs: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl Dispatcher {
    pub fn new(topology: Arc<Topology>) -> Self {
        Self {
            topology,
            configs: RwLock::new(HashMap::new()),
        }
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// Running configuration of an element, or `None` for unknown elements
    pub fn configuration(&self, element_id: &str) -> Option<BTreeMap<String, String>> {
        self.topology.get_element(element_id)?;
        Some(self.running_configuration(element_id))
    }

    pub fn dispatch(&self, request: &RpcRequest) -> RpcReply {
        debug!("Dispatching {} (message-id {})", request.operation.name(), request.message_id);

        let result = match &request.operation {
            Operation::Get { element_id } => self.retrieve_state(element_id).map(ReplyBody::Data),
            Operation::GetConfig { element_id, source } => {
                self.retrieve_configuration(element_id, *source).map(ReplyBody::Data)
            }
            Operation::EditConfig {
                element_id,
                target,
                changes,
            } => self
                .modify_configuration(element_id, *target, changes)
                .map(|()| ReplyBody::Ok),
            Operation::CloseSession => Ok(ReplyBody::Ok),
        };

        RpcReply {
            message_id: Some(request.message_id.clone()),
            body: result.unwrap_or_else(ReplyBody::Error),
        }
    }

    fn element(&self, element_id: &str) -> Result<ElementNode, RpcError> {
        self.topology.get_element(element_id).ok_or_else(|| {
            RpcError::new(
                ErrorType::Application,
                ErrorTag::InvalidValue,
                format!("unknown network element '{}'", element_id),
            )
        })
    }

    fn running_configuration(&self, element_id: &str) -> BTreeMap<String, String> {
        self.configs
            .read()
            .get(element_id)
            .cloned()
            .unwrap_or_else(|| default_configuration(element_id))
    }

    fn require_running(datastore: Datastore) -> Result<(), RpcError> {
        match datastore {
            Datastore::Running => Ok(()),
            other => Err(RpcError::operation_not_supported(format!(
                "datastore '{}' is not supported",
                other
            ))),
        }
    }

    fn retrieve_state(&self, element_id: &str) -> Result<String, RpcError> {
        let node = self.element(element_id)?;
        let config = self.running_configuration(element_id);
        let hostname = config.get("hostname").map(String::as_str).unwrap_or(element_id);

        let mut xml = String::from("  <data>\n    <system>\n");
        xml.push_str(&format!("      <element-id>{}</element-id>\n", escape(node.id())));
        xml.push_str(&format!("      <hostname>{}</hostname>\n", escape(hostname)));
        xml.push_str(&format!("      <ne-type>{}</ne-type>\n", escape(node.device_type().label())));
        xml.push_str(&format!("      <location>{}</location>\n", escape(node.location())));
        xml.push_str("      <status>operational</status>\n");
        xml.push_str(&format!(
            "      <last-activity>{}</last-activity>\n",
            node.last_activity().to_rfc3339()
        ));
        xml.push_str("    </system>\n    <interfaces>\n");

        for index in 1..=node.device_type().interface_count() {
            xml.push_str(&format!(
                "      <interface>\n        <name>eth{}</name>\n        <admin-status>up</admin-status>\n        <oper-status>up</oper-status>\n        <mtu>1500</mtu>\n      </interface>\n",
                index
            ));
        }

        xml.push_str("    </interfaces>\n  </data>");
        Ok(xml)
    }

    fn retrieve_configuration(&self, element_id: &str, source: Datastore) -> Result<String, RpcError> {
        Self::require_running(source)?;
        self.element(element_id)?;

        let mut xml = String::from("  <data>\n    <configuration>\n      <system>\n");
        for (key, value) in self.running_configuration(element_id) {
            xml.push_str(&format!("        <{}>{}</{}>\n", key, escape(&value), key));
        }
        xml.push_str("      </system>\n    </configuration>\n  </data>");
        Ok(xml)
    }

    /// All changes are validated before any is applied
    fn modify_configuration(
        &self,
        element_id: &str,
        target: Datastore,
        changes: &[(String, String)],
    ) -> Result<(), RpcError> {
        Self::require_running(target)?;
        self.element(element_id)?;

        for (name, value) in changes {
            let key = ConfigKey::from_name(name).ok_or_else(|| {
                RpcError::new(
                    ErrorType::Application,
                    ErrorTag::UnknownElement,
                    format!("unknown configuration leaf '{}'", name),
                )
            })?;
            key.check(value)
                .map_err(|message| RpcError::new(ErrorType::Application, ErrorTag::InvalidValue, message))?;
        }

        {
            let mut configs = self.configs.write();
            let config = configs
                .entry(element_id.to_string())
                .or_insert_with(|| default_configuration(element_id));
            for (name, value) in changes {
                config.insert(name.clone(), value.clone());
            }
        }

        self.topology.touch(element_id).map_err(|e| {
            RpcError::new(ErrorType::Application, ErrorTag::InvalidValue, e.to_string())
        })?;

        info!("Applied {} configuration change(s) to {}", changes.len(), element_id);
        Ok(())
    }
}
