// src/protocol/mod.rs

pub mod evaluator;
pub mod planner;
mod rules;

pub use evaluator::{Evaluator, evaluate, evaluate_plan};
pub use planner::{Planner, RulePlanner, plan};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of diagnostic tools. Declaration order is the canonical
/// evaluation order and matches the order the planner emits them in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    TcpPortcheck,
    VmLinuxUptimeLoadMem,
    VmLinuxFsUsage,
    VmLinuxServices,
    DbOracleConnect,
    DbOracleTablespaces,
    DbMongoConnect,
    DbMongoRsStatus,
}

impl ToolId {
    pub const ALL: [ToolId; 8] = [
        ToolId::TcpPortcheck,
        ToolId::VmLinuxUptimeLoadMem,
        ToolId::VmLinuxFsUsage,
        ToolId::VmLinuxServices,
        ToolId::DbOracleConnect,
        ToolId::DbOracleTablespaces,
        ToolId::DbMongoConnect,
        ToolId::DbMongoRsStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::TcpPortcheck => "tcp_portcheck",
            ToolId::VmLinuxUptimeLoadMem => "vm_linux_uptime_load_mem",
            ToolId::VmLinuxFsUsage => "vm_linux_fs_usage",
            ToolId::VmLinuxServices => "vm_linux_services",
            ToolId::DbOracleConnect => "db_oracle_connect",
            ToolId::DbOracleTablespaces => "db_oracle_tablespaces",
            ToolId::DbMongoConnect => "db_mongo_connect",
            ToolId::DbMongoRsStatus => "db_mongo_rs_status",
        }
    }

    /// Name of the single check recorded when the tool itself failed.
    pub fn failure_check_name(&self) -> &'static str {
        match self {
            ToolId::DbOracleConnect => "oracle:connect",
            ToolId::DbMongoConnect => "mongo:connect",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step arguments: string keys to JSON scalars, kept sorted so identical
/// requests serialize identically.
pub type StepArgs = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool: ToolId,
    #[serde(default)]
    pub args: StepArgs,
}

impl PlanStep {
    pub fn new(tool: ToolId) -> Self {
        Self {
            tool,
            args: StepArgs::new(),
        }
    }

    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    pub fn arg_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.arg(key, v),
            None => self,
        }
    }

    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    pub fn port_arg(&self) -> Option<u16> {
        self.args
            .get("port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn tools(&self) -> impl Iterator<Item = ToolId> + '_ {
        self.steps.iter().map(|s| s.tool)
    }

    pub fn contains(&self, tool: ToolId) -> bool {
        self.tools().any(|t| t == tool)
    }
}

/// Output of one executed step, as produced by the execution layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool: ToolId,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl ToolOutput {
    pub fn success(tool: ToolId, payload: Value) -> Self {
        Self {
            tool,
            ok: true,
            error: None,
            payload,
        }
    }

    pub fn failure(tool: ToolId, error: &str) -> Self {
        Self {
            tool,
            ok: false,
            error: Some(error.to_string()),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pass,
            message: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            message: Some(message.into()),
        }
    }

    /// PASS when `failed` is `None`, FAIL carrying the message otherwise.
    pub fn from_outcome(name: impl Into<String>, failed: Option<String>) -> Self {
        match failed {
            None => Self::pass(name),
            Some(message) => Self::fail(name, message),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub overall_pass: bool,
    pub score: u8,
    pub checks: Vec<CheckResult>,
}

impl Verdict {
    /// Scores over checks: round(100 * passed / total). No checks is a
    /// vacuous pass with score 100.
    pub fn from_checks(checks: Vec<CheckResult>) -> Self {
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed()).count();
        let score = if total == 0 {
            100
        } else {
            (passed as f64 * 100.0 / total as f64).round() as u8
        };
        Self {
            overall_pass: passed == total,
            score,
            checks,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed())
    }
}
