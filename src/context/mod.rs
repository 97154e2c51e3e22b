// src/context/mod.rs

use crate::config::{Credential, Secrets, Settings};
use crate::memory::{InMemoryLog, Memory};
use crate::protocol::{Plan, PlanStep, ToolId, ToolOutput};
use crate::redact::{scrub, scrub_value};
use crate::tools::mongo::Mongosh;
use crate::tools::oracle::SqlPlus;
use crate::tools::ssh::RemoteShell;
use crate::tools::{
    MongoConnectTool, MongoRsStatusTool, OracleConnectTool, OracleTablespacesTool, Shell,
    SystemShell, TcpPortCheckTool, Tool, ToolCall, VmFsUsageTool, VmServicesTool,
    VmUptimeLoadMemTool,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Runtime context for a validation run: registered tool executors, the
/// credentials store and the run log.
pub struct Context {
    pub dry_run: bool,
    pub tools: HashMap<ToolId, Box<dyn Tool>>,
    pub secrets: Secrets,
    pub memory: InMemoryLog,
}

impl Context {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            dry_run: false,
            secrets: Secrets::default(),
            memory: InMemoryLog::new(),
        }
    }

    /// A context with every executor registered, running real processes.
    pub fn with_default_tools(settings: &Settings) -> Self {
        Self::with_tools_on(Arc::new(SystemShell), settings)
    }

    /// A context with every executor registered on top of `shell`.
    pub fn with_tools_on(shell: Arc<dyn Shell>, settings: &Settings) -> Self {
        let remote = RemoteShell::new(shell.clone())
            .with_binaries(&settings.ssh_bin, &settings.sshpass_bin)
            .with_connect_timeout(settings.connect_timeout_secs)
            .with_command_timeout(settings.command_timeout);
        let sqlplus = SqlPlus::new(shell.clone(), &settings.sqlplus_bin)
            .with_command_timeout(settings.command_timeout);
        let mongosh = Mongosh::new(shell, &settings.mongosh_bin)
            .with_server_selection_timeout(settings.connect_timeout_secs * 1000)
            .with_command_timeout(settings.command_timeout);

        Self::new()
            .register_tool(TcpPortCheckTool::new(settings.probe_timeout))
            .register_tool(VmUptimeLoadMemTool::new(remote.clone()))
            .register_tool(VmFsUsageTool::new(remote.clone()))
            .register_tool(VmServicesTool::new(remote))
            .register_tool(OracleConnectTool::new(sqlplus.clone()))
            .register_tool(OracleTablespacesTool::new(sqlplus))
            .register_tool(MongoConnectTool::new(mongosh.clone()))
            .register_tool(MongoRsStatusTool::new(mongosh))
    }

    pub fn register_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.insert(tool.id(), Box::new(tool));
        self
    }

    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn enable_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn get_tool(&self, tool: ToolId) -> Option<&dyn Tool> {
        self.tools.get(&tool).map(|boxed| boxed.as_ref())
    }

    pub fn memory(&self) -> &InMemoryLog {
        &self.memory
    }

    pub fn log(&mut self, label: &str, content: &str) {
        self.memory.log(label, content);
    }

    /// Runs every step in plan order, one attempt each. A dry run only
    /// records what would have been executed and returns no outputs.
    pub fn execute(&mut self, plan: &Plan) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(plan.steps.len());

        for (i, step) in plan.steps.iter().enumerate() {
            let args = scrub_value(&json!(step.args));
            tracing::info!(
                step = i + 1,
                tool = %step.tool,
                %args,
                dry_run = self.dry_run,
                "Executing step"
            );
            self.log("step", &format!("{} {} {}", i + 1, step.tool, args));

            if self.dry_run {
                continue;
            }

            let output = self.run_step(step);
            match &output.error {
                None => {
                    let payload = scrub_value(&output.payload);
                    self.log(step.tool.as_str(), &format!("ok {payload}"));
                }
                Some(error) => {
                    let error = scrub(error);
                    tracing::warn!(tool = %step.tool, %error, "Tool failed");
                    self.log(step.tool.as_str(), &format!("failed: {error}"));
                }
            }
            outputs.push(output);
        }

        outputs
    }

    fn run_step(&self, step: &PlanStep) -> ToolOutput {
        let credential = match self.credential_for(step) {
            Ok(credential) => credential,
            Err(e) => return ToolOutput::failure(step.tool, &e),
        };
        match self.get_tool(step.tool) {
            Some(tool) => tool.execute(&ToolCall::new(step).with_credential(credential)),
            None => ToolOutput::failure(
                step.tool,
                &format!("no executor registered for {}", step.tool),
            ),
        }
    }

    fn credential_for(&self, step: &PlanStep) -> Result<Option<&Credential>, String> {
        match step.str_arg("credentials") {
            None => Ok(None),
            Some(reference) => self
                .secrets
                .get(reference)
                .map(Some)
                .ok_or_else(|| format!("unknown credentials reference '{reference}'")),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
