// src/tools/mongo.rs

use crate::parse::json_from_stdout;
use crate::tools::shell::{CommandSpec, Shell};
use crate::tools::{Tool, ToolCall, ToolId, ToolOutput, ToolSpec};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const PING_JS: &str =
    "JSON.stringify({ping: db.adminCommand({ping: 1}), version: db.version()})";
const RS_STATUS_JS: &str = "JSON.stringify(rs.status())";

/// Evaluates one JavaScript expression through `mongosh --quiet` and reads
/// the JSON it prints. The script, including any `auth()` call, goes in on
/// stdin so credentials never show up in argv.
#[derive(Clone)]
pub struct Mongosh {
    shell: Arc<dyn Shell>,
    bin: String,
    server_selection_timeout_ms: Option<u64>,
    command_timeout: Option<Duration>,
}

impl Mongosh {
    pub fn new(shell: Arc<dyn Shell>, bin: &str) -> Self {
        Self {
            shell,
            bin: bin.to_string(),
            server_selection_timeout_ms: None,
            command_timeout: None,
        }
    }

    pub fn with_server_selection_timeout(mut self, ms: u64) -> Self {
        self.server_selection_timeout_ms = Some(ms);
        self
    }

    pub fn with_command_timeout(mut self, limit: Duration) -> Self {
        self.command_timeout = Some(limit);
        self
    }

    /// The step's `uri`, else one built from host, port and database.
    fn connection_uri(call: &ToolCall<'_>) -> Result<String, String> {
        if let Some(uri) = call.step.str_arg("uri") {
            return Ok(uri.to_string());
        }
        let host = call
            .host()
            .ok_or("either 'uri' or 'host' is required for mongosh")?;
        let port = call.port().unwrap_or(27017);
        let database = call.step.str_arg("database").unwrap_or("admin");
        Ok(format!("mongodb://{host}:{port}/{database}"))
    }

    pub fn command_spec(&self, call: &ToolCall<'_>, js: &str) -> Result<CommandSpec, String> {
        let mut uri = Self::connection_uri(call)?;
        if let Some(ms) = self.server_selection_timeout_ms {
            if !uri.contains("serverSelectionTimeoutMS") {
                let sep = if uri.contains('?') { '&' } else { '?' };
                uri = format!("{uri}{sep}serverSelectionTimeoutMS={ms}");
            }
        }
        Ok(CommandSpec::new(&self.bin)
            .args(["--quiet", "--nodb"])
            .stdin(Self::script(call, &uri, js))
            .timeout(self.command_timeout))
    }

    /// The stdin script: connect, authenticate against `admin` unless the
    /// URI already carries credentials, then print `js`. Any error exits 1
    /// so a rejected login cannot pass as a healthy ping.
    fn script(call: &ToolCall<'_>, uri: &str, js: &str) -> String {
        let mut body = format!("  db = connect({});\n", js_string(uri));
        if !uri.contains('@') {
            if let (Some(user), Some(password)) = (call.username(), call.password()) {
                body.push_str(&format!(
                    "  db.getSiblingDB(\"admin\").auth({}, {});\n",
                    js_string(user),
                    js_string(password)
                ));
            }
        }
        format!(
            "try {{\n{body}  print({js});\n}} catch (e) {{\n  \
             print(\"error: \" + e.message);\n  quit(1);\n}}\n"
        )
    }

    pub fn eval(&self, call: &ToolCall<'_>, js: &str) -> Result<Value, String> {
        let spec = self.command_spec(call, js)?;
        let out = self
            .shell
            .run(&spec)
            .map_err(|e| format!("failed to run {}: {e}", spec.program))?;
        if !out.success() {
            return Err(format!("mongosh failed, {}", out.failure_reason()));
        }
        json_from_stdout(&out.stdout).ok_or_else(|| "mongosh printed no JSON result".to_string())
    }
}

fn js_string(value: &str) -> String {
    Value::from(value).to_string()
}

fn mongo_spec(tool: &dyn Tool, input_hint: &str) -> ToolSpec {
    ToolSpec {
        name: tool.id().as_str().into(),
        description: tool.description().into(),
        input_hint: input_hint.into(),
        tags: vec!["db".into(), "mongo".into()],
    }
}

pub struct MongoConnectTool {
    mongosh: Mongosh,
}

impl MongoConnectTool {
    pub fn new(mongosh: Mongosh) -> Self {
        Self { mongosh }
    }
}

impl Tool for MongoConnectTool {
    fn id(&self) -> ToolId {
        ToolId::DbMongoConnect
    }

    fn description(&self) -> &str {
        "Pings a MongoDB deployment and reads its server version."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        let result = match self.mongosh.eval(call, PING_JS) {
            Ok(result) => result,
            Err(e) => return ToolOutput::failure(self.id(), &e),
        };
        let ping_ok = result
            .pointer("/ping/ok")
            .and_then(Value::as_f64)
            .is_some_and(|ok| ok == 1.0);
        if !ping_ok {
            return ToolOutput::failure(self.id(), &format!("ping not acknowledged: {result}"))
                .with_payload(result);
        }
        ToolOutput::success(
            self.id(),
            json!({
                "ping": result["ping"],
                "version": result.get("version").cloned().unwrap_or(Value::Null),
            }),
        )
    }

    fn spec(&self) -> ToolSpec {
        mongo_spec(self, "uri, or host + port + database; credentials reference")
    }
}

pub struct MongoRsStatusTool {
    mongosh: Mongosh,
}

impl MongoRsStatusTool {
    pub fn new(mongosh: Mongosh) -> Self {
        Self { mongosh }
    }
}

impl Tool for MongoRsStatusTool {
    fn id(&self) -> ToolId {
        ToolId::DbMongoRsStatus
    }

    fn description(&self) -> &str {
        "Reads replica set status and this member's state."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        let status = match self.mongosh.eval(call, RS_STATUS_JS) {
            Ok(status) => status,
            Err(e) => return ToolOutput::failure(self.id(), &e),
        };
        let members: Vec<Value> = status
            .get("members")
            .and_then(Value::as_array)
            .map(|members| {
                members
                    .iter()
                    .map(|m| {
                        json!({
                            "name": m.get("name").cloned().unwrap_or(Value::Null),
                            "stateStr": m.get("stateStr").cloned().unwrap_or(Value::Null),
                            "health": m.get("health").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        ToolOutput::success(
            self.id(),
            json!({
                "set": status.get("set").cloned().unwrap_or(Value::Null),
                "myState": status.get("myState").cloned().unwrap_or(Value::Null),
                "members": members,
            }),
        )
    }

    fn spec(&self) -> ToolSpec {
        mongo_spec(self, "uri (required); credentials reference")
    }
}
