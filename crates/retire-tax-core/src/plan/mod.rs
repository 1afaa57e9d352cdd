pub mod breakdown;
pub mod guardrails;
pub mod projection;
pub mod strategy;
