// src/validation/plan.rs

use crate::protocol::{Plan, ToolId};
use serde_json::{Value, json};

/// Problems found in a plan that did not come from `RulePlanner`
/// (an LLM planner, a hand-edited file).
#[derive(Debug, Clone, PartialEq)]
pub enum PlanValidationError {
    Empty,
    MissingReachabilityProbe(ToolId),
    MissingArg { step: usize, tool: ToolId, arg: &'static str },
    InvalidArg { step: usize, tool: ToolId, arg: &'static str, reason: String },
    OutOfOrder { step: usize, tool: ToolId, requires: ToolId },
}

impl PlanValidationError {
    pub fn hint(&self) -> (String, Option<Value>) {
        match self {
            PlanValidationError::Empty => (
                "Plan has no steps.".to_string(),
                Some(json!({ "steps": [{ "tool": "tcp_portcheck", "args": { "port": 22 } }] })),
            ),
            PlanValidationError::MissingReachabilityProbe(first) => (
                format!("Plan must start with tcp_portcheck, found {first}."),
                Some(json!({ "tool": "tcp_portcheck", "args": { "host": "...", "port": 22 } })),
            ),
            PlanValidationError::MissingArg { step, tool, arg } => (
                format!("Step {step} ({tool}) is missing required argument '{arg}'."),
                Some(json!({ "tool": tool, "args": { arg.to_string(): "<required>" } })),
            ),
            PlanValidationError::InvalidArg {
                step,
                tool,
                arg,
                reason,
            } => (
                format!("Step {step} ({tool}) has an invalid '{arg}': {reason}."),
                None,
            ),
            PlanValidationError::OutOfOrder {
                step,
                tool,
                requires,
            } => (
                format!("Step {step} ({tool}) must come after {requires}."),
                Some(json!({ "order": [requires, tool] })),
            ),
        }
    }
}

fn predecessor(tool: ToolId) -> Option<ToolId> {
    match tool {
        ToolId::DbOracleTablespaces => Some(ToolId::DbOracleConnect),
        ToolId::DbMongoRsStatus => Some(ToolId::DbMongoConnect),
        _ => None,
    }
}

pub fn validate_plan(plan: &Plan) -> Vec<PlanValidationError> {
    let mut errors = Vec::new();

    let Some(first) = plan.steps.first() else {
        errors.push(PlanValidationError::Empty);
        return errors;
    };
    if first.tool != ToolId::TcpPortcheck {
        errors.push(PlanValidationError::MissingReachabilityProbe(first.tool));
    }

    for (idx, step) in plan.steps.iter().enumerate() {
        let tool = step.tool;

        match tool {
            ToolId::TcpPortcheck => match step.args.get("port") {
                None => errors.push(PlanValidationError::MissingArg {
                    step: idx,
                    tool,
                    arg: "port",
                }),
                Some(_) if step.port_arg().is_none() => {
                    errors.push(PlanValidationError::InvalidArg {
                        step: idx,
                        tool,
                        arg: "port",
                        reason: "must be an integer in 0..=65535".to_string(),
                    })
                }
                Some(_) => {}
            },
            ToolId::DbMongoRsStatus => {
                if step.str_arg("uri").is_none() {
                    errors.push(PlanValidationError::MissingArg {
                        step: idx,
                        tool,
                        arg: "uri",
                    });
                }
            }
            _ => {}
        }

        if let Some(requires) = predecessor(tool) {
            let seen_before = plan.steps[..idx].iter().any(|s| s.tool == requires);
            if !seen_before {
                errors.push(PlanValidationError::OutOfOrder {
                    step: idx,
                    tool,
                    requires,
                });
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValidationRequest;
    use crate::protocol::{PlanStep, plan};

    #[test]
    fn planner_output_is_valid() {
        for request in [
            ValidationRequest::new("vm"),
            ValidationRequest::new("oracle").with_host("db"),
            ValidationRequest::new("mongo").with_uri("mongodb://m:27017"),
        ] {
            let plan = plan(&request).unwrap();
            assert!(validate_plan(&plan).is_empty(), "{request:?}");
        }
    }

    #[test]
    fn empty_plan() {
        assert_eq!(
            validate_plan(&Plan { steps: vec![] }),
            vec![PlanValidationError::Empty]
        );
    }

    #[test]
    fn reports_probe_order_and_argument_problems() {
        let plan = Plan {
            steps: vec![
                PlanStep::new(ToolId::DbMongoRsStatus),
                PlanStep::new(ToolId::TcpPortcheck).arg("port", 70000),
                PlanStep::new(ToolId::TcpPortcheck),
            ],
        };
        let errors = validate_plan(&plan);
        assert_eq!(
            errors,
            vec![
                PlanValidationError::MissingReachabilityProbe(ToolId::DbMongoRsStatus),
                PlanValidationError::MissingArg {
                    step: 0,
                    tool: ToolId::DbMongoRsStatus,
                    arg: "uri"
                },
                PlanValidationError::OutOfOrder {
                    step: 0,
                    tool: ToolId::DbMongoRsStatus,
                    requires: ToolId::DbMongoConnect
                },
                PlanValidationError::InvalidArg {
                    step: 1,
                    tool: ToolId::TcpPortcheck,
                    arg: "port",
                    reason: "must be an integer in 0..=65535".to_string()
                },
                PlanValidationError::MissingArg {
                    step: 2,
                    tool: ToolId::TcpPortcheck,
                    arg: "port"
                },
            ]
        );
        let (msg, hint) = errors[1].hint();
        assert_eq!(msg, "Step 0 (db_mongo_rs_status) is missing required argument 'uri'.");
        assert!(hint.is_some());
    }
}
