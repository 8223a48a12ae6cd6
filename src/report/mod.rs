//! Report rendering and result sinks.

pub mod generator;
pub mod sink;

pub use generator::{build_report, RenderOptions};
pub use sink::{read_history, FileSink, HistorySink, OutputFormat, ResultSink};
