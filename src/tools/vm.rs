// src/tools/vm.rs

use crate::parse::{parse_df_posix, parse_load_average, parse_meminfo, parse_unit_list};
use crate::tools::ssh::RemoteShell;
use crate::tools::{Tool, ToolCall, ToolId, ToolOutput, ToolSpec};
use serde_json::{Map, Value, json};

const UPTIME_MEM_CMD: &str =
    "uptime && grep -E 'MemTotal|MemFree|MemAvailable|SwapTotal|SwapFree' /proc/meminfo";
const FS_USAGE_CMD: &str = "df -P -k";
const RUNNING_SERVICES_CMD: &str =
    "systemctl list-units --type=service --state=running --no-legend --no-pager";

const MEM_COUNTERS: [&str; 5] = ["MemTotal", "MemFree", "MemAvailable", "SwapTotal", "SwapFree"];

fn vm_spec(tool: &dyn Tool, input_hint: &str) -> ToolSpec {
    ToolSpec {
        name: tool.id().as_str().into(),
        description: tool.description().into(),
        input_hint: input_hint.into(),
        tags: vec!["vm".into(), "linux".into(), "ssh".into()],
    }
}

const SSH_HINT: &str = "host, port (ssh), username or credentials reference";

pub struct VmUptimeLoadMemTool {
    remote: RemoteShell,
}

impl VmUptimeLoadMemTool {
    pub fn new(remote: RemoteShell) -> Self {
        Self { remote }
    }
}

impl Tool for VmUptimeLoadMemTool {
    fn id(&self) -> ToolId {
        ToolId::VmLinuxUptimeLoadMem
    }

    fn description(&self) -> &str {
        "Reads uptime, load averages and memory counters from a Linux host."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        let out = match self.remote.exec(call, UPTIME_MEM_CMD) {
            Ok(out) => out,
            Err(e) => return ToolOutput::failure(self.id(), &e),
        };

        let mut payload = Map::new();
        let uptime = out.stdout.lines().next().unwrap_or_default().trim();
        payload.insert("uptime".into(), json!(uptime));
        payload.insert("load_avg".into(), json!(parse_load_average(uptime)));

        let counters = parse_meminfo(&out.stdout);
        for key in MEM_COUNTERS {
            if let Some(kb) = counters.get(key) {
                payload.insert(key.into(), json!(kb));
            }
        }
        ToolOutput::success(self.id(), Value::Object(payload))
    }

    fn spec(&self) -> ToolSpec {
        vm_spec(self, SSH_HINT)
    }
}

pub struct VmFsUsageTool {
    remote: RemoteShell,
}

impl VmFsUsageTool {
    pub fn new(remote: RemoteShell) -> Self {
        Self { remote }
    }
}

impl Tool for VmFsUsageTool {
    fn id(&self) -> ToolId {
        ToolId::VmLinuxFsUsage
    }

    fn description(&self) -> &str {
        "Reports POSIX filesystem usage (df -P -k) for every mount."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        match self.remote.exec(call, FS_USAGE_CMD) {
            Ok(out) => ToolOutput::success(
                self.id(),
                json!({ "filesystems": parse_df_posix(&out.stdout) }),
            ),
            Err(e) => ToolOutput::failure(self.id(), &e),
        }
    }

    fn spec(&self) -> ToolSpec {
        vm_spec(self, SSH_HINT)
    }
}

pub struct VmServicesTool {
    remote: RemoteShell,
}

impl VmServicesTool {
    pub fn new(remote: RemoteShell) -> Self {
        Self { remote }
    }
}

impl Tool for VmServicesTool {
    fn id(&self) -> ToolId {
        ToolId::VmLinuxServices
    }

    fn description(&self) -> &str {
        "Lists running systemd services."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        match self.remote.exec(call, RUNNING_SERVICES_CMD) {
            Ok(out) => ToolOutput::success(
                self.id(),
                json!({ "running": parse_unit_list(&out.stdout) }),
            ),
            Err(e) => ToolOutput::failure(self.id(), &e),
        }
    }

    fn spec(&self) -> ToolSpec {
        vm_spec(self, SSH_HINT)
    }
}
