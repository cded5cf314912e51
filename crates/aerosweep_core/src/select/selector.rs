use serde::Serialize;
use tracing::debug;

use super::RenderSink;
use crate::error::{ChannelNotFoundError, SelectError, SinkError};
use crate::output::ChannelTable;

/// One label bound to a loaded table and the channels wanted from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotEntry {
    pub label: String,
    /// Position of the table in the slice handed to [`select`]
    pub table: usize,
    pub channels: Vec<String>,
}

/// Ordered mapping from label to requested channels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotRequest {
    entries: Vec<PlotEntry>,
}

impl PlotRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind labels to tables by position: the first label reads the first table
    pub fn positional<L, C, S>(labels: impl IntoIterator<Item = (L, C)>) -> Self
    where
        L: Into<String>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = Self::new();
        for (table, (label, channels)) in labels.into_iter().enumerate() {
            request = request.bind(label, table, channels);
        }
        request
    }

    /// Bind `label` to the table at `table`. Rebinding a label replaces it.
    #[must_use]
    pub fn bind<S: Into<String>>(
        mut self,
        label: impl Into<String>,
        table: usize,
        channels: impl IntoIterator<Item = S>,
    ) -> Self {
        let entry = PlotEntry {
            label: label.into(),
            table,
            channels: channels.into_iter().map(Into::into).collect(),
        };
        match self.entries.iter_mut().find(|e| e.label == entry.label) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn entries(&self) -> &[PlotEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A channel's samples paired with the time axis of its table.
///
/// Both vectors are owned copies, so series never alias the table or
/// one another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub unit: String,
    pub time: Vec<f64>,
    pub samples: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Minimum and maximum sample, ignoring NaN
    pub fn bounds(&self) -> Option<(f64, f64)> {
        finite_bounds(&self.samples)
    }

    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        finite_bounds(&self.time)
    }
}

fn finite_bounds(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[derive(Debug, Clone, PartialEq)]
struct LabelSeries {
    label: String,
    channels: Vec<(String, Series)>,
}

/// Selected label → channel → series data, in request order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotData {
    labels: Vec<LabelSeries>,
}

impl PlotData {
    pub fn get(&self, label: &str, channel: &str) -> Option<&Series> {
        self.labels
            .iter()
            .find(|l| l.label == label)?
            .channels
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, series)| series)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.label.as_str())
    }

    /// Channel names requested for `label`, in request order
    pub fn channels(&self, label: &str) -> Vec<&str> {
        self.labels
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.channels.iter().map(|(c, _)| c.as_str()).collect())
            .unwrap_or_default()
    }

    /// Every channel name across labels, in first-requested order
    pub fn channel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in self.labels.iter().flat_map(|l| &l.channels) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// `(label, series)` pairs holding `channel`, in label order
    pub fn by_channel<'a>(&'a self, channel: &'a str) -> impl Iterator<Item = (&'a str, &'a Series)> {
        self.labels.iter().filter_map(move |l| {
            l.channels
                .iter()
                .find(|(name, _)| name == channel)
                .map(|(_, series)| (l.label.as_str(), series))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.labels.iter().all(|l| l.channels.is_empty())
    }

    /// Hand every series to `sink`, channel-major, then finish it
    pub fn emit(&self, sink: &mut dyn RenderSink) -> Result<(), SinkError> {
        for channel in self.channel_names() {
            for (label, series) in self.by_channel(channel) {
                sink.series(label, channel, &series.unit, &series.time, &series.samples)?;
            }
        }
        sink.finish()
    }
}

/// Copy the requested channels out of `tables`.
///
/// Fails on the first label whose table is missing or lacks a requested
/// channel; channels are never silently skipped.
pub fn select(tables: &[ChannelTable], request: &PlotRequest) -> Result<PlotData, SelectError> {
    let mut labels = Vec::with_capacity(request.entries.len());

    for entry in &request.entries {
        let table = tables.get(entry.table).ok_or_else(|| SelectError::UnknownTable {
            label: entry.label.clone(),
            index: entry.table,
            loaded: tables.len(),
        })?;

        let mut channels = Vec::with_capacity(entry.channels.len());
        for channel in &entry.channels {
            let samples = table.get(channel).ok_or_else(|| ChannelNotFoundError {
                label: entry.label.clone(),
                channel: channel.clone(),
                available: table.channel_names().into_iter().map(String::from).collect(),
            })?;
            let series = Series {
                unit: table.unit(channel).unwrap_or_default().to_string(),
                time: table.time().to_vec(),
                samples: samples.to_vec(),
            };
            channels.push((channel.clone(), series));
        }

        debug!(label = %entry.label, channels = channels.len(), "selected channels");
        labels.push(LabelSeries {
            label: entry.label.clone(),
            channels,
        });
    }

    Ok(PlotData { labels })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(power: f64) -> ChannelTable {
        ChannelTable::new("Time", "s", vec![0.0, 1.0, 2.0])
            .with_channel("GenPwr", "kW", vec![power, power + 1.0, power + 2.0])
            .unwrap()
            .with_channel("RotSpeed", "rpm", vec![7.0, 7.1, 7.2])
            .unwrap()
    }

    #[test]
    fn test_select_copies_requested_channels() {
        let tables = vec![table(100.0), table(200.0)];
        let request = PlotRequest::positional([
            ("Baseline", vec!["GenPwr"]),
            ("Enabled", vec!["GenPwr", "RotSpeed"]),
        ]);
        let data = select(&tables, &request).unwrap();

        assert_eq!(data.get("Baseline", "GenPwr").unwrap().samples, vec![100.0, 101.0, 102.0]);
        assert_eq!(data.get("Enabled", "GenPwr").unwrap().samples, vec![200.0, 201.0, 202.0]);
        assert_eq!(data.get("Enabled", "RotSpeed").unwrap().unit, "rpm");
        assert!(data.get("Baseline", "RotSpeed").is_none());
        assert_eq!(data.channel_names(), vec!["GenPwr", "RotSpeed"]);
        assert_eq!(data.labels().collect::<Vec<_>>(), vec!["Baseline", "Enabled"]);
    }

    #[test]
    fn test_missing_channel_names_alternatives() {
        let tables = vec![table(0.0)];
        let request = PlotRequest::new().bind("Baseline", 0, ["GenPwr", "TipDxc1"]);
        match select(&tables, &request).unwrap_err() {
            SelectError::ChannelNotFound(err) => {
                assert_eq!(err.label, "Baseline");
                assert_eq!(err.channel, "TipDxc1");
                assert_eq!(err.available, vec!["Time", "GenPwr", "RotSpeed"]);
                assert!(err.to_string().contains("RotSpeed"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_unknown_table_index() {
        let request = PlotRequest::new().bind("Enabled", 3, ["GenPwr"]);
        assert_eq!(
            select(&[table(0.0)], &request).unwrap_err(),
            SelectError::UnknownTable {
                label: "Enabled".to_string(),
                index: 3,
                loaded: 1
            }
        );
    }

    #[test]
    fn test_rebinding_replaces_label() {
        let request = PlotRequest::new()
            .bind("Baseline", 0, ["GenPwr"])
            .bind("Baseline", 1, ["RotSpeed"]);
        assert_eq!(request.entries().len(), 1);
        assert_eq!(request.entries()[0].table, 1);
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, String)>,
        finished: bool,
    }

    impl RenderSink for Recorder {
        fn series(
            &mut self,
            label: &str,
            channel: &str,
            _unit: &str,
            time: &[f64],
            samples: &[f64],
        ) -> Result<(), SinkError> {
            assert_eq!(time.len(), samples.len());
            self.calls.push((channel.to_string(), label.to_string()));
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_emit_is_channel_major() {
        let tables = vec![table(1.0), table(2.0)];
        let request = PlotRequest::positional([
            ("A", vec!["GenPwr", "RotSpeed"]),
            ("B", vec!["GenPwr", "RotSpeed"]),
        ]);
        let mut sink = Recorder::default();
        select(&tables, &request).unwrap().emit(&mut sink).unwrap();

        let pair = |c: &str, l: &str| (c.to_string(), l.to_string());
        assert_eq!(
            sink.calls,
            vec![
                pair("GenPwr", "A"),
                pair("GenPwr", "B"),
                pair("RotSpeed", "A"),
                pair("RotSpeed", "B"),
            ]
        );
        assert!(sink.finished);
    }

    #[test]
    fn test_series_bounds_skip_nan() {
        let series = Series {
            unit: String::new(),
            time: vec![0.0, 1.0, 2.0],
            samples: vec![3.0, f64::NAN, -1.0],
        };
        assert_eq!(series.bounds(), Some((-1.0, 3.0)));
        assert_eq!(series.time_bounds(), Some((0.0, 2.0)));
    }
}
