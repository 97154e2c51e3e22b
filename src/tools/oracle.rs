// src/tools/oracle.rs

use crate::parse::{parse_csv_rows, sqlplus_error};
use crate::tools::shell::{CommandSpec, Shell};
use crate::tools::{Tool, ToolCall, ToolId, ToolOutput, ToolSpec};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const CONNECT_QUERY: &str = "SELECT i.instance_name, i.version, d.open_mode, d.database_role \
                             FROM v$instance i, v$database d;";

const TABLESPACE_QUERY: &str = "\
SELECT df.tablespace_name,
       ROUND(df.total_mb, 2),
       ROUND(NVL(fs.free_mb, 0), 2),
       ROUND(100 * (1 - NVL(fs.free_mb, 0) / df.total_mb), 2)
FROM (SELECT tablespace_name, SUM(bytes) / 1048576 total_mb
        FROM dba_data_files GROUP BY tablespace_name) df
LEFT JOIN (SELECT tablespace_name, SUM(bytes) / 1048576 free_mb
        FROM dba_free_space GROUP BY tablespace_name) fs
  ON df.tablespace_name = fs.tablespace_name
ORDER BY df.tablespace_name;";

/// Runs SQL scripts through `sqlplus -S -L /nolog`, with the CONNECT line
/// fed on stdin so the password never shows up in argv.
#[derive(Clone)]
pub struct SqlPlus {
    shell: Arc<dyn Shell>,
    bin: String,
    command_timeout: Option<Duration>,
}

impl SqlPlus {
    pub fn new(shell: Arc<dyn Shell>, bin: &str) -> Self {
        Self {
            shell,
            bin: bin.to_string(),
            command_timeout: None,
        }
    }

    pub fn with_command_timeout(mut self, limit: Duration) -> Self {
        self.command_timeout = Some(limit);
        self
    }

    /// Connect string for the step: the `dsn` argument, else an EZConnect
    /// `//host:port/service`.
    fn connect_target(call: &ToolCall<'_>) -> Result<String, String> {
        if let Some(dsn) = call.step.str_arg("dsn") {
            return Ok(dsn.to_string());
        }
        let host = call.host().ok_or("either 'dsn' or 'host' and 'service' are required")?;
        let service = call
            .step
            .str_arg("service")
            .ok_or("either 'dsn' or 'host' and 'service' are required")?;
        Ok(format!("//{host}:{}/{service}", call.port().unwrap_or(1521)))
    }

    pub fn script(call: &ToolCall<'_>, query: &str) -> Result<String, String> {
        let target = Self::connect_target(call)?;
        let user = call.username().ok_or("no oracle username in step arguments or credentials")?;
        let password = call.password().ok_or("no oracle password for the credentials reference")?;
        if password.contains('"') {
            return Err("oracle password must not contain '\"'".into());
        }

        Ok(format!(
            "WHENEVER SQLERROR EXIT SQL.SQLCODE\n\
             SET HEADING OFF FEEDBACK OFF PAGESIZE 0 LINESIZE 32767 TRIMSPOOL ON\n\
             SET MARKUP CSV ON QUOTE OFF\n\
             CONNECT {user}/\"{password}\"@{target}\n\
             {query}\n\
             EXIT\n"
        ))
    }

    /// Runs `query` and returns the rows that have exactly `fields` columns.
    pub fn query(
        &self,
        call: &ToolCall<'_>,
        query: &str,
        fields: usize,
    ) -> Result<Vec<Vec<String>>, String> {
        let script = Self::script(call, query)?;
        let spec = CommandSpec::new(&self.bin)
            .args(["-S", "-L", "/nolog"])
            .stdin(script)
            .timeout(self.command_timeout);
        let out = self
            .shell
            .run(&spec)
            .map_err(|e| format!("failed to run {}: {e}", spec.program))?;

        if let Some(error) = sqlplus_error(&out.stdout).or_else(|| sqlplus_error(&out.stderr)) {
            return Err(error);
        }
        if !out.success() {
            return Err(format!("sqlplus failed, {}", out.failure_reason()));
        }
        Ok(parse_csv_rows(&out.stdout)
            .into_iter()
            .filter(|row| row.len() == fields)
            .collect())
    }
}

fn oracle_spec(tool: &dyn Tool) -> ToolSpec {
    ToolSpec {
        name: tool.id().as_str().into(),
        description: tool.description().into(),
        input_hint: "dsn, or host + port + service; credentials reference".into(),
        tags: vec!["db".into(), "oracle".into()],
    }
}

pub struct OracleConnectTool {
    sqlplus: SqlPlus,
}

impl OracleConnectTool {
    pub fn new(sqlplus: SqlPlus) -> Self {
        Self { sqlplus }
    }
}

impl Tool for OracleConnectTool {
    fn id(&self) -> ToolId {
        ToolId::DbOracleConnect
    }

    fn description(&self) -> &str {
        "Logs in to an Oracle database and reads its version, open mode and role."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        match self.sqlplus.query(call, CONNECT_QUERY, 4) {
            Ok(rows) => match rows.first() {
                Some(row) => ToolOutput::success(
                    self.id(),
                    json!({
                        "instance": row[0],
                        "version": row[1],
                        "open_mode": row[2],
                        "database_role": row[3],
                    }),
                ),
                None => ToolOutput::failure(self.id(), "connected but v$database returned no row"),
            },
            Err(e) => ToolOutput::failure(self.id(), &e),
        }
    }

    fn spec(&self) -> ToolSpec {
        oracle_spec(self)
    }
}

pub struct OracleTablespacesTool {
    sqlplus: SqlPlus,
}

impl OracleTablespacesTool {
    pub fn new(sqlplus: SqlPlus) -> Self {
        Self { sqlplus }
    }
}

fn number_field(raw: &str) -> Value {
    raw.parse::<f64>().map(Value::from).unwrap_or(Value::Null)
}

impl Tool for OracleTablespacesTool {
    fn id(&self) -> ToolId {
        ToolId::DbOracleTablespaces
    }

    fn description(&self) -> &str {
        "Reports total and free megabytes for every tablespace."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        match self.sqlplus.query(call, TABLESPACE_QUERY, 4) {
            Ok(rows) => {
                let tablespaces: Vec<Value> = rows
                    .iter()
                    .map(|row| {
                        json!({
                            "name": row[0],
                            "total_mb": number_field(&row[1]),
                            "free_mb": number_field(&row[2]),
                            "used_pct": number_field(&row[3]),
                        })
                    })
                    .collect();
                ToolOutput::success(self.id(), json!({ "tablespaces": tablespaces }))
            }
            Err(e) => ToolOutput::failure(self.id(), &e),
        }
    }

    fn spec(&self) -> ToolSpec {
        oracle_spec(self)
    }
}
