//! Pattern statistics precomputed once per locator call.

mod plan;

pub use plan::TemplatePlan;
