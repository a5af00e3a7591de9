#![allow(clippy::let_and_return)]
#![allow(clippy::len_without_is_empty)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]

//! A persistent store of video fingerprints.
//!
//! Each fingerprint is stored at most once. Putting a fingerprint that is already present
//! merges the new optional fields into the existing record. Stores answer near-duplicate
//! queries by Hamming distance, and report aggregate statistics.
//!
//! ```rust,no_run
//! use fingerprint_store::{FingerprintStore, NewRecord};
//! use vid_fingerprint_lib::{fingerprint, DEFAULT_MATCH_THRESHOLD};
//!
//! let store = FingerprintStore::open("fingerprints.bin").unwrap();
//!
//! let fp = fingerprint("cat.mp4", 60).unwrap();
//! store.put(NewRecord::new(fp).with_platform("youtube")).unwrap();
//!
//! let query = fingerprint("cat_reupload.mp4", 60).unwrap();
//! for m in store.query_similar(&query, DEFAULT_MATCH_THRESHOLD, None, 10) {
//!     println!("{} at distance {}", m.record.id, m.distance);
//! }
//!
//! store.close().unwrap();
//! ```

mod errors;
mod fingerprint_store;
mod query;
mod record;
mod store_file;

pub use errors::{StoreError, StoreResult};
pub use fingerprint_store::{FingerprintStore, StoreOptions};
pub use query::{SimilarMatch, StoreStats, UNKNOWN_PLATFORM};
pub use record::{FingerprintRecord, Metadata, NewRecord, RecordFields};
