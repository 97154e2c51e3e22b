// src/parse.rs

// Parsers for the raw text that Linux and database tooling prints.
//
// Shared by the tool executors, which turn command output into payloads,
// and by the evaluator, which accepts a raw `/proc/meminfo` dump in place
// of parsed counters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static LOAD_AVERAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"load averages?:\s*([0-9.]+),?\s+([0-9.]+),?\s+([0-9.]+)").unwrap()
});

/// One row of `df -P -k`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FsEntry {
    pub filesystem: String,
    pub blocks_k: Option<u64>,
    pub used_k: Option<u64>,
    pub avail_k: Option<u64>,
    /// `None` when the capacity column did not parse; the evaluator fails
    /// such entries closed.
    pub use_pct: Option<u64>,
    pub mountpoint: String,
}

/// Parses POSIX `df -P -k` output, skipping the header and short lines.
pub fn parse_df_posix(output: &str) -> Vec<FsEntry> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return None;
            }
            // Mount points may contain spaces; everything after the
            // capacity column belongs to it.
            Some(FsEntry {
                filesystem: parts[0].to_string(),
                blocks_k: parts[1].parse().ok(),
                used_k: parts[2].parse().ok(),
                avail_k: parts[3].parse().ok(),
                use_pct: parts[4].trim_end_matches('%').parse().ok(),
                mountpoint: parts[5..].join(" "),
            })
        })
        .collect()
}

/// Parses `/proc/meminfo` style lines into counters (kB), keyed by name
/// without the trailing colon.
pub fn parse_meminfo(output: &str) -> BTreeMap<String, u64> {
    output
        .lines()
        .filter_map(|line| {
            let (key, rest) = line.split_once(':')?;
            let value = rest.split_whitespace().next()?.parse().ok()?;
            Some((key.trim().to_string(), value))
        })
        .collect()
}

/// Extracts the 1, 5 and 15 minute load averages from `uptime` output.
pub fn parse_load_average(output: &str) -> Option<[f64; 3]> {
    let caps = LOAD_AVERAGE.captures(output)?;
    let mut load = [0.0; 3];
    for (i, slot) in load.iter_mut().enumerate() {
        *slot = caps.get(i + 1)?.as_str().parse().ok()?;
    }
    Some(load)
}

/// First column of `systemctl list-units --no-legend` output.
pub fn parse_unit_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            line.trim_start()
                .trim_start_matches('●')
                .split_whitespace()
                .next()
        })
        .map(str::to_string)
        .collect()
}

/// Unit name without the `.service` suffix, so `sshd` and `sshd.service`
/// compare equal.
pub fn unit_name(unit: &str) -> &str {
    unit.strip_suffix(".service").unwrap_or(unit)
}

/// The last line of `stdout` that parses as a JSON object or array.
/// Shell banners and warnings printed before the result are skipped.
pub fn json_from_stdout(stdout: &str) -> Option<Value> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|l| l.starts_with('{') || l.starts_with('['))
        .find_map(|l| serde_json::from_str(l).ok())
}

/// Splits `SET MARKUP CSV ON QUOTE OFF` rows from sqlplus into fields.
pub fn parse_csv_rows(output: &str) -> Vec<Vec<String>> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.split(',').map(|f| f.trim().to_string()).collect())
        .collect()
}

/// First `ORA-` or `SP2-` error line in sqlplus output.
pub fn sqlplus_error(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ORA-") || l.starts_with("SP2-") || l.contains("ERROR at line"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DF: &str = "\
Filesystem     1024-blocks     Used Available Capacity Mounted on
/dev/sda1         41152736 37037462   4115274      91% /
tmpfs              8166432        0   8166432       0% /dev/shm
/dev/sdb1        103081248 20616249  82465000      20% /var/lib/my data
weird              -         -        -         -  /mnt/x
";

    #[test]
    fn df_rows_keep_order_and_spaces_in_mounts() {
        let rows = parse_df_posix(DF);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].mountpoint, "/");
        assert_eq!(rows[0].use_pct, Some(91));
        assert_eq!(rows[2].mountpoint, "/var/lib/my data");
        assert_eq!(rows[3].use_pct, None);
        assert_eq!(rows[3].blocks_k, None);
    }

    #[test]
    fn meminfo_counters() {
        let info = parse_meminfo(
            "MemTotal:       16332864 kB\nMemFree:         1633286 kB\nMemAvailable:    8000000 kB\n",
        );
        assert_eq!(info.get("MemTotal"), Some(&16332864));
        assert_eq!(info.get("MemFree"), Some(&1633286));
        assert_eq!(info.get("SwapTotal"), None);
    }

    #[test]
    fn load_average_from_linux_and_bsd_uptime() {
        assert_eq!(
            parse_load_average(" 10:01:02 up 3 days,  2 users,  load average: 0.15, 0.10, 0.05"),
            Some([0.15, 0.10, 0.05])
        );
        assert_eq!(
            parse_load_average("10:01  up 3 days, 2 users, load averages: 1.50 1.20 1.00"),
            Some([1.5, 1.2, 1.0])
        );
        assert_eq!(parse_load_average("no load here"), None);
    }

    #[test]
    fn unit_list_and_names() {
        let units = parse_unit_list("sshd.service loaded active running OpenSSH\n● crond.service loaded\n\n");
        assert_eq!(units, vec!["sshd.service", "crond.service"]);
        assert_eq!(unit_name("sshd.service"), "sshd");
        assert_eq!(unit_name("sshd"), "sshd");
    }

    #[test]
    fn json_from_stdout_takes_last_valid_line() {
        let out = "Current Mongosh Log ID: 1234\n{\"ok\":1}\n{broken\n";
        assert_eq!(json_from_stdout(out), Some(serde_json::json!({"ok": 1})));
        assert_eq!(json_from_stdout("nothing"), None);
    }

    #[test]
    fn sqlplus_rows_and_errors() {
        assert_eq!(
            parse_csv_rows("ORCLCDB,19.0.0.0.0\n\nREAD WRITE,PRIMARY\n"),
            vec![
                vec!["ORCLCDB".to_string(), "19.0.0.0.0".to_string()],
                vec!["READ WRITE".to_string(), "PRIMARY".to_string()],
            ]
        );
        assert_eq!(
            sqlplus_error("\nERROR:\nORA-01017: invalid username/password; logon denied\n"),
            Some("ORA-01017: invalid username/password; logon denied".to_string())
        );
    }
}
