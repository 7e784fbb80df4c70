// crates/summit-engine/src/lib.rs
//
// summit-engine: the Cartographer, emission math, treasury, event log, and
// passthrough adapter seam for the Summit Protocol. This is the top crate
// of the workspace; a host embeds `Cartographer` with an injected clock and
// drives every user, round, and governance operation through it.

pub mod adapters;
pub mod cartographer;
pub mod emission;
pub mod events;
pub mod treasury;

// Re-export the embedding surface.
pub use adapters::{AdapterKind, PassthroughAdapter};
pub use cartographer::{Cartographer, EngineConfig, RolloverSummary, WithdrawReceipt};
pub use events::LedgerEvent;
pub use treasury::Treasury;
