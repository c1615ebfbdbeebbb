//! Local song library: songs, their sync records and the persistent store

pub mod scan;
pub mod song;
pub mod store;
pub mod sync_record;

pub use scan::rescan_library;
pub use song::{DownloadStatus, Song, SongId};
pub use store::{JsonLibraryStore, LibraryOp, LibraryStore};
pub use sync_record::{ResourceFile, ResourceKind, SyncMetaId, SyncRecord};
