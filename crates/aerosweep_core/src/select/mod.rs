//! Channel selection across loaded tables and hand-off to render sinks

mod selector;
mod sink;

pub use selector::{PlotData, PlotEntry, PlotRequest, Series, select};
pub use sink::{CsvSink, JsonSink, RenderSink};
