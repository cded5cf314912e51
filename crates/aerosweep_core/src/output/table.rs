use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::TableError;

/// One named signal
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub unit: String,
    pub samples: Vec<f64>,
}

/// Time axis plus named signal columns loaded from one output artifact.
///
/// Every channel has exactly as many samples as the time axis, and names are
/// unique (the time channel included). Tables are read-only once loaded and
/// never share storage with one another.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable {
    source: PathBuf,
    description: String,
    time_name: String,
    time_unit: String,
    time: Vec<f64>,
    channels: Vec<Channel>,
    index: FxHashMap<String, usize>,
}

impl ChannelTable {
    /// Start a table from its time axis
    pub fn new(time_name: impl Into<String>, time_unit: impl Into<String>, time: Vec<f64>) -> Self {
        Self {
            source: PathBuf::new(),
            description: String::new(),
            time_name: time_name.into(),
            time_unit: time_unit.into(),
            time,
            channels: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a channel, enforcing length and uniqueness
    pub fn push_channel(
        &mut self,
        name: impl Into<String>,
        unit: impl Into<String>,
        samples: Vec<f64>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if samples.len() != self.time.len() {
            return Err(TableError::LengthMismatch {
                channel: name,
                expected: self.time.len(),
                found: samples.len(),
            });
        }
        if name == self.time_name || self.index.contains_key(&name) {
            return Err(TableError::DuplicateChannel(name));
        }
        self.index.insert(name.clone(), self.channels.len());
        self.channels.push(Channel {
            name,
            unit: unit.into(),
            samples,
        });
        Ok(())
    }

    /// Builder-style [`ChannelTable::push_channel`]
    pub fn with_channel(
        mut self,
        name: impl Into<String>,
        unit: impl Into<String>,
        samples: Vec<f64>,
    ) -> Result<Self, TableError> {
        self.push_channel(name, unit, samples)?;
        Ok(self)
    }

    /// Artifact this table was loaded from (empty for in-memory tables)
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn time_name(&self) -> &str {
        &self.time_name
    }

    pub fn time_unit(&self) -> &str {
        &self.time_unit
    }

    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    /// Number of signal channels, excluding time
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// All names in file order, time first
    pub fn channel_names(&self) -> Vec<&str> {
        std::iter::once(self.time_name.as_str())
            .chain(self.channels.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        name == self.time_name || self.index.contains_key(name)
    }

    /// Samples of a channel; the time channel is addressable by its name
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        if name == self.time_name {
            return Some(&self.time);
        }
        self.index
            .get(name)
            .map(|&i| self.channels[i].samples.as_slice())
    }

    pub fn unit(&self, name: &str) -> Option<&str> {
        if name == self.time_name {
            return Some(&self.time_unit);
        }
        self.index
            .get(name)
            .map(|&i| self.channels[i].unit.as_str())
    }

    /// Span of the time axis
    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Constant time step, if the axis is uniform within a relative tolerance
    pub fn uniform_step(&self) -> Option<f64> {
        if self.time.len() < 2 {
            return None;
        }
        let step = self.time[1] - self.time[0];
        let tolerance = step.abs() * 1e-6 + f64::EPSILON;
        self.time
            .windows(2)
            .all(|w| ((w[1] - w[0]) - step).abs() <= tolerance)
            .then_some(step)
    }
}
