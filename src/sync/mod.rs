//! Song download pipeline
//!
//! A run fetches a song's metadata, downloads each resource kind into a temp
//! dir, then commits everything into the song folder and records what was
//! written so the next run can skip unchanged resources.

mod candidates;
mod commit;
mod context;
mod download;
pub mod engine;
pub mod loader;
mod locations;
mod staged;
mod tags;

#[cfg(test)]
mod fakes;

pub use engine::{SyncEngine, SyncResult};
pub use loader::{RunOutcome, SongLoader};
