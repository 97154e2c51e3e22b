// src/report.rs

// Human-readable rendering of plans and verdicts for the terminal.

use crate::agent::RunReport;
use crate::protocol::{Plan, Verdict};
use colored::Colorize;
use std::fmt::Write;

pub fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Plan".cyan().bold());
    let total = plan.steps.len();
    for (i, step) in plan.steps.iter().enumerate() {
        let target = match (step.str_arg("host"), step.port_arg()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, Some(port)) => format!(":{port}"),
            (None, None) => String::new(),
        };
        let _ = writeln!(
            out,
            "  {} {} {}",
            format!("[{}/{}]", i + 1, total).bright_black(),
            step.tool.as_str().bold(),
            target.bright_black()
        );
    }
    out
}

pub fn render_verdict(verdict: &Verdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Checks".cyan().bold());
    for check in &verdict.checks {
        if check.passed() {
            let _ = writeln!(out, "  {} {}", "✓".green().bold(), check.name);
        } else {
            let _ = writeln!(
                out,
                "  {} {} {}",
                "✗".red().bold(),
                check.name.red(),
                check.message.as_deref().unwrap_or_default().bright_black()
            );
        }
    }

    let headline = format!(
        "{} (score {}/100, {} of {} checks failed)",
        if verdict.overall_pass { "PASS" } else { "FAIL" },
        verdict.score,
        verdict.failures().count(),
        verdict.checks.len()
    );
    let headline = if verdict.overall_pass {
        headline.green().bold()
    } else {
        headline.red().bold()
    };
    let _ = writeln!(out, "\n{headline}");
    out
}

/// Plan, checks and the optional summary, one section after another.
pub fn render_report(report: &RunReport) -> String {
    let mut out = render_plan(&report.plan);
    out.push('\n');
    if report.dry_run {
        let _ = writeln!(out, "{}", "Dry run: no tools were executed.".yellow());
        return out;
    }
    out.push_str(&render_verdict(&report.verdict));
    if let Some(summary) = &report.summary {
        let _ = writeln!(out, "\n{}\n{summary}", "Summary".cyan().bold());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CheckResult, PlanStep, ToolId};

    #[test]
    fn plan_lists_steps_with_targets() {
        colored::control::set_override(false);
        let plan = Plan {
            steps: vec![
                PlanStep::new(ToolId::TcpPortcheck)
                    .arg("host", "vm1")
                    .arg("port", 22),
                PlanStep::new(ToolId::VmLinuxFsUsage).arg("host", "vm1"),
            ],
        };
        assert_eq!(
            render_plan(&plan),
            "Plan\n  [1/2] tcp_portcheck vm1:22\n  [2/2] vm_linux_fs_usage vm1\n"
        );
    }

    #[test]
    fn verdict_shows_failures_and_headline() {
        colored::control::set_override(false);
        let verdict = Verdict::from_checks(vec![
            CheckResult::pass("port:22"),
            CheckResult::fail("fs:/", "/ usage 95% exceeds limit 85%"),
        ]);
        let text = render_verdict(&verdict);
        assert!(text.contains("✓ port:22"));
        assert!(text.contains("✗ fs:/ / usage 95% exceeds limit 85%"));
        assert!(text.ends_with("FAIL (score 50/100, 1 of 2 checks failed)\n"));
    }
}
