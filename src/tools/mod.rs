// src/tools/mod.rs

pub mod llm;
pub mod mongo;
pub mod net;
pub mod oracle;
pub mod shell;
pub mod ssh;
pub mod vm;

pub use crate::protocol::{ToolId, ToolOutput};
pub use llm::LlmClient;
pub use mongo::{MongoConnectTool, MongoRsStatusTool};
pub use net::TcpPortCheckTool;
pub use oracle::{OracleConnectTool, OracleTablespacesTool};
pub use shell::{CommandOutput, CommandSpec, Shell, SystemShell};
pub use vm::{VmFsUsageTool, VmServicesTool, VmUptimeLoadMemTool};

use crate::config::Credential;
use crate::protocol::PlanStep;

/// Everything a tool gets for one step: its arguments and, when the step
/// names a credentials reference, the resolved login.
#[derive(Clone, Copy, Debug)]
pub struct ToolCall<'a> {
    pub step: &'a PlanStep,
    pub credential: Option<&'a Credential>,
}

impl<'a> ToolCall<'a> {
    pub fn new(step: &'a PlanStep) -> Self {
        Self {
            step,
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Option<&'a Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn host(&self) -> Option<&'a str> {
        self.step.str_arg("host")
    }

    pub fn port(&self) -> Option<u16> {
        self.step.port_arg()
    }

    /// The step's `username` argument, else the credential's.
    pub fn username(&self) -> Option<&'a str> {
        self.step
            .str_arg("username")
            .or_else(|| self.credential.and_then(|c| c.username.as_deref()))
    }

    pub fn password(&self) -> Option<&'a str> {
        self.credential.and_then(|c| c.password.as_deref())
    }
}

/// Static description of a tool, for listings.
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_hint: String,
    pub tags: Vec<String>,
}

/// Trait that defines an executor for one diagnostic tool.
///
/// Executors never return errors: anything that stops the tool from
/// producing its payload becomes an `ok = false` output.
pub trait Tool: Send + Sync {
    fn id(&self) -> ToolId;
    fn description(&self) -> &str;
    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.id().as_str().into(),
            description: self.description().into(),
            input_hint: String::new(),
            tags: Vec::new(),
        }
    }
}
