//! Query front end over a record file and its optional index.
//!
//! Tables live in one directory: table `T` is the record file `T.tbl` and,
//! if it was loaded with an index, the B+tree `T.idx`.

mod condition;
mod engine;

pub use condition::{Attr, CompOp, Condition, Projection};
pub use engine::{parse_load_line, LoadSummary, QueryEngine, SelectResult};
