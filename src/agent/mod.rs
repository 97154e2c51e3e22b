// src/agent/mod.rs

use crate::context::Context;
use crate::error::PlanError;
use crate::model::{AcceptanceProfile, ValidationRequest};
use crate::protocol::{Evaluator, Plan, Planner, RulePlanner, ToolOutput, Verdict};
use crate::tools::LlmClient;
use serde::Serialize;

pub trait Agent {
    fn plan(&mut self) -> Result<Plan, PlanError>;
    fn execute(&mut self, plan: &Plan) -> Vec<ToolOutput>;
    fn evaluate(&self, plan: &Plan, outputs: &[ToolOutput]) -> Verdict;
}

/// Everything one run produced, in the shape the CLI prints with `--json`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub plan: Plan,
    pub outputs: Vec<ToolOutput>,
    pub verdict: Verdict,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Drives one validation run: plan, execute, evaluate, then optionally ask
/// an LLM for a short summary.
pub struct ValidationAgent {
    pub request: ValidationRequest,
    pub profile: AcceptanceProfile,
    pub context: Context,
    pub planner: Box<dyn Planner>,
    pub summarizer: Option<LlmClient>,
}

impl ValidationAgent {
    pub fn new(request: ValidationRequest, profile: AcceptanceProfile, context: Context) -> Self {
        Self {
            request,
            profile,
            context,
            planner: Box::new(RulePlanner),
            summarizer: None,
        }
    }

    pub fn with_planner(mut self, planner: Box<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_summarizer(mut self, client: LlmClient) -> Self {
        self.summarizer = Some(client);
        self
    }

    pub fn run(&mut self) -> Result<RunReport, PlanError> {
        let plan = self.plan()?;
        Ok(self.run_plan(plan))
    }

    /// Runs an already built plan, e.g. one loaded from a file.
    pub fn run_plan(&mut self, plan: Plan) -> RunReport {
        let outputs = self.execute(&plan);
        let verdict = self.evaluate(&plan, &outputs);
        self.context.log(
            "verdict",
            &format!(
                "pass={} score={} failures={}",
                verdict.overall_pass,
                verdict.score,
                verdict.failures().count()
            ),
        );
        let summary = self.summarize(&verdict);

        RunReport {
            plan,
            outputs,
            verdict,
            dry_run: self.context.dry_run,
            summary,
        }
    }

    /// Asks the configured LLM to summarize the run. Failures are logged
    /// and leave the verdict untouched.
    pub fn summarize(&self, verdict: &Verdict) -> Option<String> {
        let client = self.summarizer.as_ref()?;
        let prompt = summary_prompt(&self.context.memory().dump(), verdict);
        match client.generate(&prompt) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(error = %e, "LLM summary unavailable");
                None
            }
        }
    }
}

impl Agent for ValidationAgent {
    fn plan(&mut self) -> Result<Plan, PlanError> {
        let plan = self.planner.generate_plan(&self.request)?;
        tracing::info!(
            resource_type = %self.request.resource_type,
            steps = plan.steps.len(),
            "Generated plan"
        );
        self.context.log(
            "plan",
            &plan.tools().map(|t| t.as_str()).collect::<Vec<_>>().join(", "),
        );
        Ok(plan)
    }

    fn execute(&mut self, plan: &Plan) -> Vec<ToolOutput> {
        self.context.execute(plan)
    }

    fn evaluate(&self, plan: &Plan, outputs: &[ToolOutput]) -> Verdict {
        Evaluator::new(&self.profile).evaluate_plan(plan, outputs)
    }
}

fn summary_prompt(run_log: &str, verdict: &Verdict) -> String {
    let verdict_json = serde_json::to_string_pretty(verdict).unwrap_or_default();
    format!(
        "You are reviewing an infrastructure health check after a recovery.\n\
         Summarize the result for an operator in at most five sentences. \
         Name every failed check and the likely cause. Do not invent checks.\n\n\
         Run log:\n{run_log}\n\nVerdict:\n{verdict_json}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use crate::protocol::{CheckResult, PlanStep, ToolId};
    use crate::tools::{Tool, ToolCall};
    use serde_json::json;

    struct CannedTool(ToolOutput);

    impl Tool for CannedTool {
        fn id(&self) -> ToolId {
            self.0.tool
        }

        fn description(&self) -> &str {
            "canned"
        }

        fn execute(&self, _call: &ToolCall<'_>) -> ToolOutput {
            self.0.clone()
        }
    }

    fn healthy_vm_context() -> Context {
        Context::new()
            .register_tool(CannedTool(ToolOutput::success(
                ToolId::TcpPortcheck,
                json!({"host": "vm1", "port": 22, "reachable": true}),
            )))
            .register_tool(CannedTool(ToolOutput::success(
                ToolId::VmLinuxUptimeLoadMem,
                json!({"MemTotal": 1000, "MemFree": 500}),
            )))
            .register_tool(CannedTool(ToolOutput::success(
                ToolId::VmLinuxFsUsage,
                json!({"filesystems": [{"mountpoint": "/", "use_pct": 40}]}),
            )))
            .register_tool(CannedTool(ToolOutput::success(
                ToolId::VmLinuxServices,
                json!({"running": ["sshd.service"]}),
            )))
    }

    #[test]
    fn full_run_on_healthy_vm_passes() {
        let request = ValidationRequest::new("vm").with_host("vm1");
        let profile = AcceptanceProfile::default().with_required_services(["sshd"]);
        let mut agent = ValidationAgent::new(request, profile, healthy_vm_context());

        let report = agent.run().unwrap();
        assert_eq!(report.plan.steps.len(), 4);
        assert_eq!(report.outputs.len(), 4);
        assert!(report.verdict.overall_pass);
        assert_eq!(report.verdict.score, 100);
        assert!(report.summary.is_none());

        let log = agent.context.memory().dump();
        assert!(log.starts_with("[plan] tcp_portcheck, vm_linux_uptime_load_mem"));
        assert!(log.ends_with("[verdict] pass=true score=100 failures=0"));
    }

    #[test]
    fn invalid_request_stops_before_execution() {
        let mut agent = ValidationAgent::new(
            ValidationRequest::new("postgres"),
            AcceptanceProfile::default(),
            healthy_vm_context(),
        );
        assert!(matches!(agent.run(), Err(PlanError::InvalidRequest(_))));
        assert!(agent.context.memory().read_all().is_empty());
    }

    #[test]
    fn dry_run_report_has_no_outputs() {
        let request = ValidationRequest::new("vm").with_host("vm1");
        let context = healthy_vm_context().enable_dry_run();
        let mut agent = ValidationAgent::new(request, AcceptanceProfile::default(), context);
        let report = agent.run().unwrap();
        assert!(report.dry_run);
        assert!(report.outputs.is_empty());
        assert!(report.verdict.checks.is_empty());
    }

    #[test]
    fn custom_planner_is_used() {
        struct ProbeOnly;
        impl Planner for ProbeOnly {
            fn generate_plan(&self, _request: &ValidationRequest) -> Result<Plan, PlanError> {
                Ok(Plan {
                    steps: vec![PlanStep::new(ToolId::TcpPortcheck).arg("port", 22)],
                })
            }
        }

        let mut agent = ValidationAgent::new(
            ValidationRequest::new("vm"),
            AcceptanceProfile::default(),
            healthy_vm_context(),
        )
        .with_planner(Box::new(ProbeOnly));
        let report = agent.run().unwrap();
        assert_eq!(report.verdict.checks, vec![CheckResult::pass("port:22")]);
    }

    #[test]
    fn prompt_carries_log_and_verdict() {
        let verdict = Verdict::from_checks(vec![CheckResult::fail("fs:/", "/ usage 95% exceeds limit 85%")]);
        let prompt = summary_prompt("[plan] tcp_portcheck", &verdict);
        assert!(prompt.contains("[plan] tcp_portcheck"));
        assert!(prompt.contains("\"overallPass\": false"));
        assert!(prompt.contains("/ usage 95% exceeds limit 85%"));
    }
}
