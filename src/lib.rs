// src/lib.rs

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod model;
pub mod parse;
pub mod protocol;
pub mod redact;
pub mod report;
pub mod tools;
pub mod validation;

pub use agent::{Agent, RunReport, ValidationAgent};
pub use error::{ConfigError, LlmError, PlanError, ProfileError};
pub use model::{AcceptanceProfile, ResourceType, ValidationRequest};
pub use protocol::{
    CheckResult, CheckStatus, Plan, PlanStep, ToolId, ToolOutput, Verdict, evaluate,
    evaluate_plan, plan,
};
