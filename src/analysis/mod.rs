pub mod cfg;
pub mod dataflow;
pub mod range;

pub use cfg::{build_cfg, cleanup_cfg, Cfg};
pub use dataflow::{analyze_integer_ranges, join_states, RangeMap};
pub use range::{Bound, Interval};
