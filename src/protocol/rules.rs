// src/protocol/rules.rs

use crate::model::AcceptanceProfile;
use crate::parse::{parse_meminfo, unit_name};
use crate::protocol::{CheckResult, PlanStep, ToolId, ToolOutput};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Everything a rule may look at for one executed step.
pub(crate) struct RuleInput<'a> {
    pub output: &'a ToolOutput,
    pub step: Option<&'a PlanStep>,
    pub profile: &'a AcceptanceProfile,
}

pub(crate) type Rule = fn(&RuleInput<'_>) -> Vec<CheckResult>;

/// The closed rule table: one pure function per tool.
pub(crate) fn rule_for(tool: ToolId) -> Rule {
    match tool {
        ToolId::TcpPortcheck => port_reachable,
        ToolId::VmLinuxUptimeLoadMem => memory_free,
        ToolId::VmLinuxFsUsage => filesystem_usage,
        ToolId::VmLinuxServices => required_services,
        ToolId::DbOracleConnect => oracle_connect,
        ToolId::DbOracleTablespaces => tablespace_free,
        ToolId::DbMongoConnect => mongo_connect,
        ToolId::DbMongoRsStatus => replica_state,
    }
}

/// A payload field a rule needed but could not use.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldError {
    Missing(&'static str),
    Invalid { field: &'static str, value: String },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Missing(field) => {
                write!(f, "required field `{field}` missing from payload")
            }
            FieldError::Invalid { field, value } => {
                write!(f, "field `{field}` has unusable value {value}")
            }
        }
    }
}

fn lookup<'a>(value: &'a Value, keys: &[&'static str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find(|v| !v.is_null())
}

fn as_number(value: &Value) -> Option<f64> {
    let n: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn number(value: &Value, keys: &[&'static str]) -> Result<f64, FieldError> {
    let raw = lookup(value, keys).ok_or(FieldError::Missing(keys[0]))?;
    as_number(raw).ok_or_else(|| FieldError::Invalid {
        field: keys[0],
        value: raw.to_string(),
    })
}

fn text<'a>(value: &'a Value, keys: &[&'static str]) -> Result<&'a str, FieldError> {
    lookup(value, keys)
        .and_then(Value::as_str)
        .ok_or(FieldError::Missing(keys[0]))
}

/// A payload that is either the list itself or an object holding it.
fn entries<'a>(payload: &'a Value, key: &'static str) -> Result<&'a Vec<Value>, FieldError> {
    match payload {
        Value::Array(items) => Ok(items),
        other => other
            .get(key)
            .and_then(Value::as_array)
            .ok_or(FieldError::Missing(key)),
    }
}

fn port_reachable(input: &RuleInput<'_>) -> Vec<CheckResult> {
    let payload = &input.output.payload;
    let step_port = input.step.and_then(PlanStep::port_arg).map(u64::from);

    // Multi-port payloads report one result per probed port.
    if let Some(results) = payload.get("results").and_then(Value::as_array) {
        return results
            .iter()
            .map(|r| {
                let port = r.get("port").and_then(Value::as_u64).or(step_port);
                probe_check(r, port, &["ok", "reachable"])
            })
            .collect();
    }

    let port = payload.get("port").and_then(Value::as_u64).or(step_port);
    vec![probe_check(payload, port, &["reachable", "ok"])]
}

fn probe_check(result: &Value, port: Option<u64>, keys: &[&'static str]) -> CheckResult {
    let name = match port {
        Some(p) => format!("port:{p}"),
        None => return CheckResult::fail("port:unknown", FieldError::Missing("port").to_string()),
    };
    match lookup(result, keys).and_then(Value::as_bool) {
        Some(true) => CheckResult::pass(name),
        Some(false) => {
            let reason = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("connection failed");
            let host = result.get("host").and_then(Value::as_str).unwrap_or("target");
            let message = format!("port {} unreachable on {host}: {reason}", &name[5..]);
            CheckResult::fail(name, message)
        }
        None => CheckResult::fail(name, FieldError::Missing(keys[0]).to_string()),
    }
}

fn memory_free(input: &RuleInput<'_>) -> Vec<CheckResult> {
    const NAME: &str = "mem:free_pct";
    let min = input.profile.mem_min_free_pct;

    let outcome = memory_counters(&input.output.payload).and_then(|(total, free)| {
        if total <= 0.0 {
            return Err(FieldError::Invalid {
                field: "MemTotal",
                value: total.to_string(),
            });
        }
        Ok(free / total * 100.0)
    });

    let failed = match outcome {
        Ok(free_pct) if free_pct < min => Some(format!(
            "free memory {free_pct:.1}% below minimum {min}%"
        )),
        Ok(_) => None,
        Err(e) => Some(e.to_string()),
    };
    vec![CheckResult::from_outcome(NAME, failed)]
}

/// `(MemTotal, MemFree)` from structured counters, else from raw
/// `/proc/meminfo` text in `stdout`.
fn memory_counters(payload: &Value) -> Result<(f64, f64), FieldError> {
    const TOTAL: &[&str] = &["MemTotal", "mem_total_kb"];
    const FREE: &[&str] = &["MemFree", "mem_free_kb"];

    if lookup(payload, TOTAL).is_some() || lookup(payload, FREE).is_some() {
        return Ok((number(payload, TOTAL)?, number(payload, FREE)?));
    }

    let stdout = text(payload, &["stdout"]).map_err(|_| FieldError::Missing("MemTotal"))?;
    let info = parse_meminfo(stdout);
    let total = info.get("MemTotal").ok_or(FieldError::Missing("MemTotal"))?;
    let free = info.get("MemFree").ok_or(FieldError::Missing("MemFree"))?;
    Ok((*total as f64, *free as f64))
}

fn filesystem_usage(input: &RuleInput<'_>) -> Vec<CheckResult> {
    let max = input.profile.fs_max_pct;
    let list = match entries(&input.output.payload, "filesystems") {
        Ok(list) => list,
        Err(e) => return vec![CheckResult::fail(ToolId::VmLinuxFsUsage.as_str(), e.to_string())],
    };

    list.iter()
        .map(|entry| {
            let mount = match text(entry, &["mountpoint", "mount"]) {
                Ok(m) => m,
                Err(e) => return CheckResult::fail("fs:unknown", e.to_string()),
            };
            let failed = match number(entry, &["use_pct"]) {
                Ok(pct) if pct > max => Some(format!("{mount} usage {pct}% exceeds limit {max}%")),
                Ok(_) => None,
                Err(e) => Some(e.to_string()),
            };
            CheckResult::from_outcome(format!("fs:{mount}"), failed)
        })
        .collect()
}

fn required_services(input: &RuleInput<'_>) -> Vec<CheckResult> {
    let required = &input.profile.required_services;
    if required.is_empty() {
        return Vec::new();
    }
    let missing = missing_services(&input.output.payload, required);

    required
        .iter()
        .map(|service| {
            let name = format!("service:{service}");
            match &missing {
                Ok(missing) if missing.contains(unit_name(service)) => {
                    CheckResult::fail(name, format!("required service {service} is not running"))
                }
                Ok(_) => CheckResult::pass(name),
                Err(e) => CheckResult::fail(name, e.to_string()),
            }
        })
        .collect()
}

fn missing_services<'a>(
    payload: &'a Value,
    required: &'a BTreeSet<String>,
) -> Result<BTreeSet<&'a str>, FieldError> {
    let names = |list: &'a Vec<Value>| -> BTreeSet<&'a str> {
        list.iter().filter_map(Value::as_str).map(unit_name).collect()
    };

    if let Some(missing) = payload.get("missing").and_then(Value::as_array) {
        return Ok(names(missing));
    }
    if let Some(running) = payload.get("running").and_then(Value::as_array) {
        let running = names(running);
        return Ok(required
            .iter()
            .map(|s| unit_name(s))
            .filter(|s| !running.contains(s))
            .collect());
    }
    Err(FieldError::Missing("missing"))
}

fn oracle_connect(_input: &RuleInput<'_>) -> Vec<CheckResult> {
    vec![CheckResult::pass("oracle:connect")]
}

fn mongo_connect(_input: &RuleInput<'_>) -> Vec<CheckResult> {
    vec![CheckResult::pass("mongo:connect")]
}

fn tablespace_free(input: &RuleInput<'_>) -> Vec<CheckResult> {
    let min = input.profile.tablespace_min_free_pct;
    let list = match entries(&input.output.payload, "tablespaces") {
        Ok(list) => list,
        Err(e) => {
            return vec![CheckResult::fail(
                ToolId::DbOracleTablespaces.as_str(),
                e.to_string(),
            )];
        }
    };

    list.iter()
        .map(|entry| {
            let name = match text(entry, &["name", "tablespace_name"]) {
                Ok(n) => n,
                Err(e) => return CheckResult::fail("tablespace:unknown", e.to_string()),
            };
            let failed = match free_ratio(entry) {
                Ok(ratio) if ratio < min => Some(format!(
                    "{name} free ratio {ratio:.3} below minimum {min:.3}"
                )),
                Ok(_) => None,
                Err(e) => Some(e.to_string()),
            };
            CheckResult::from_outcome(format!("tablespace:{name}"), failed)
        })
        .collect()
}

fn free_ratio(entry: &Value) -> Result<f64, FieldError> {
    if lookup(entry, &["total_mb"]).is_none() {
        if let Ok(used_pct) = number(entry, &["used_pct"]) {
            return Ok(1.0 - used_pct / 100.0);
        }
    }
    let total = number(entry, &["total_mb"])?;
    let free = number(entry, &["free_mb"])?;
    if total <= 0.0 {
        return Err(FieldError::Invalid {
            field: "total_mb",
            value: total.to_string(),
        });
    }
    Ok(free / total)
}

fn replica_state(input: &RuleInput<'_>) -> Vec<CheckResult> {
    const NAME: &str = "mongo:rs_status";
    let allowed = &input.profile.allowed_states;

    let state = lookup(&input.output.payload, &["myState"]).map(|v| {
        integer(v).ok_or_else(|| FieldError::Invalid {
                field: "myState",
                value: v.to_string(),
            })
    });

    let failed = match state {
        None => Some(FieldError::Missing("myState").to_string()),
        Some(Err(e)) => Some(e.to_string()),
        Some(Ok(state)) if !allowed.contains(&state) => Some(format!(
            "replica set state {state} ({}) not in allowed states {:?}",
            member_state_label(state),
            allowed.iter().collect::<Vec<_>>()
        )),
        Some(Ok(_)) => None,
    };
    vec![CheckResult::from_outcome(NAME, failed)]
}

/// Integral values only; `2.9` or `"1.5"` are not member states.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn member_state_label(state: i64) -> &'static str {
    match state {
        0 => "STARTUP",
        1 => "PRIMARY",
        2 => "SECONDARY",
        3 => "RECOVERING",
        5 => "STARTUP2",
        7 => "ARBITER",
        8 => "DOWN",
        9 => "ROLLBACK",
        10 => "REMOVED",
        _ => "UNKNOWN",
    }
}
