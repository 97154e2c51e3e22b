// src/model/mod.rs

pub mod profile;

pub use profile::AcceptanceProfile;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of target a validation run can be aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Vm,
    Oracle,
    Mongo,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Vm => "vm",
            ResourceType::Oracle => "oracle",
            ResourceType::Mongo => "mongo",
        }
    }

    /// Port probed first when the request carries no override.
    pub fn default_port(&self) -> u16 {
        match self {
            ResourceType::Vm => 22,
            ResourceType::Oracle => 1521,
            ResourceType::Mongo => 27017,
        }
    }

    /// Name of the built-in acceptance profile for this resource type.
    pub fn default_profile(&self) -> &'static str {
        match self {
            ResourceType::Vm => "vm-core",
            ResourceType::Oracle => "db-oracle",
            ResourceType::Mongo => "db-mongo",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vm" => Ok(ResourceType::Vm),
            "oracle" => Ok(ResourceType::Oracle),
            "mongo" => Ok(ResourceType::Mongo),
            "" => Err("resourceType is required".into()),
            other => Err(format!(
                "unrecognized resourceType '{other}' (expected vm|oracle|mongo)"
            )),
        }
    }
}

/// A request to validate one recovered resource.
///
/// `resource_type` is kept as the raw string so that an unknown value
/// surfaces as a planning error rather than a parse failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probe_ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Key into the secrets store. Never a secret value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_profile: Option<String>,
    #[serde(default)]
    pub force_rs_status: bool,
}

impl ValidationRequest {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_credentials(mut self, reference: &str) -> Self {
        self.credentials = Some(reference.into());
        self
    }

    pub fn parsed_resource_type(&self) -> Result<ResourceType, String> {
        self.resource_type.parse()
    }
}
