// src/protocol/evaluator.rs

use crate::model::AcceptanceProfile;
use crate::protocol::rules::{RuleInput, rule_for};
use crate::protocol::{CheckResult, Plan, PlanStep, ToolOutput, Verdict};

/// Reduces tool outputs to a verdict against one acceptance profile.
#[derive(Clone, Debug)]
pub struct Evaluator<'a> {
    profile: &'a AcceptanceProfile,
}

impl<'a> Evaluator<'a> {
    pub fn new(profile: &'a AcceptanceProfile) -> Self {
        Self { profile }
    }

    /// Evaluates outputs in plan order. The n-th step of a tool is paired
    /// with the n-th output of that tool; steps without an output produce
    /// no checks and outputs without a step are ignored.
    pub fn evaluate_plan(&self, plan: &Plan, outputs: &[ToolOutput]) -> Verdict {
        let mut consumed = vec![false; outputs.len()];
        let mut checks = Vec::new();

        for step in &plan.steps {
            let next = (0..outputs.len()).find(|&i| !consumed[i] && outputs[i].tool == step.tool);
            let Some(idx) = next else {
                continue;
            };
            consumed[idx] = true;
            checks.extend(self.checks_for(&outputs[idx], Some(step)));
        }

        Verdict::from_checks(checks)
    }

    /// Evaluates outputs without a plan, in canonical tool order. Outputs
    /// of the same tool keep their relative order.
    pub fn evaluate_outputs(&self, outputs: &[ToolOutput]) -> Verdict {
        let mut ordered: Vec<&ToolOutput> = outputs.iter().collect();
        ordered.sort_by_key(|o| o.tool);

        let checks = ordered
            .into_iter()
            .flat_map(|output| self.checks_for(output, None))
            .collect();
        Verdict::from_checks(checks)
    }

    fn checks_for(&self, output: &ToolOutput, step: Option<&PlanStep>) -> Vec<CheckResult> {
        if !output.ok {
            let reason = output.error.as_deref().unwrap_or("tool reported failure");
            return vec![CheckResult::fail(
                output.tool.failure_check_name(),
                format!("{} failed: {reason}", output.tool),
            )];
        }
        rule_for(output.tool)(&RuleInput {
            output,
            step,
            profile: self.profile,
        })
    }
}

/// Evaluates outputs against a profile in canonical tool order.
pub fn evaluate(outputs: &[ToolOutput], profile: &AcceptanceProfile) -> Verdict {
    Evaluator::new(profile).evaluate_outputs(outputs)
}

/// Evaluates outputs against a profile in the order of `plan`.
pub fn evaluate_plan(plan: &Plan, outputs: &[ToolOutput], profile: &AcceptanceProfile) -> Verdict {
    Evaluator::new(profile).evaluate_plan(plan, outputs)
}
