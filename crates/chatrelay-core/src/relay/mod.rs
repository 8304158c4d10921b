//! Per-turn relay orchestration.

mod gate;
mod orchestrator;

pub use gate::TurnGate;
pub use orchestrator::RelayService;
