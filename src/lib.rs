//! mu - summarize page cache usage of files and directories

pub mod filter;
pub mod levels;
pub mod output;
pub mod probe;
pub mod stats;
pub mod walk;

pub use filter::ExclusionFilter;
pub use levels::LevelAccumulator;
pub use output::{JsonReport, ReportConfig, ReportSink, SizeScale, TextReport, format_size};
pub use probe::{CachestatProbe, Probe, Unavailable};
pub use stats::{CacheStats, TimeKind};
pub use walk::{DevIno, DevInoSet, FollowLinks, Traversal, Visit, VisitKind, Walker, WalkerConfig};
