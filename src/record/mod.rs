//! Record file - the heap of `(key, value)` tuples the index points into.

mod record_file;

pub use record_file::{RecordFile, RecordScan};
