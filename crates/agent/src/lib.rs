//! Assistant-facing layer around the briefing engine
//!
//! The core crate only describes what should happen next. This crate does it:
//! - Reads customer, promotion and order tables (`sources`)
//! - Checks every follow-up action against an `ActionPolicy` (`guardrails`)
//! - Performs email and promotion side effects (`actions`)
//! - Exposes analytics and actions as named JSON tools (`tools`)
//!
//! `AgentRuntime` wires injected collaborators together and tags each request
//! with a correlation id.

pub mod actions;
pub mod guardrails;
pub mod runtime;
pub mod sources;
pub mod tools;
