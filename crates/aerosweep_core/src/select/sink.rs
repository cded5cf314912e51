use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SinkError;

/// Receiver of selected series. Rendering happens entirely on this side.
pub trait RenderSink {
    /// Accept one `(label, channel)` series
    fn series(
        &mut self,
        label: &str,
        channel: &str,
        unit: &str,
        time: &[f64],
        samples: &[f64],
    ) -> Result<(), SinkError>;

    /// Called once after the last series
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one `<channel>.csv` per channel into a directory.
///
/// Rows are `label,time,value`, so labels with different time axes can
/// share a file.
pub struct CsvSink {
    dir: PathBuf,
    writers: Vec<(String, csv::Writer<File>)>,
    written: Vec<PathBuf>,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            writers: Vec::new(),
            written: Vec::new(),
        })
    }

    /// Files created so far
    pub fn files(&self) -> &[PathBuf] {
        &self.written
    }

    /// `<stem>.csv`, suffixed when another channel already sanitized to the same stem
    fn free_path(&self, stem: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{stem}.csv"));
        let mut n = 2;
        while self.written.contains(&path) {
            path = self.dir.join(format!("{stem}_{n}.csv"));
            n += 1;
        }
        path
    }

    fn writer(&mut self, channel: &str, unit: &str) -> Result<&mut csv::Writer<File>, SinkError> {
        let pos = match self.writers.iter().position(|(c, _)| c == channel) {
            Some(pos) => pos,
            None => {
                let path = self.free_path(&file_stem(channel));
                let mut writer = csv::WriterBuilder::new().from_path(&path)?;
                let value_header = if unit.is_empty() {
                    channel.to_string()
                } else {
                    format!("{channel} ({unit})")
                };
                writer.write_record(["label", "time", value_header.as_str()])?;
                self.written.push(path);
                self.writers.push((channel.to_string(), writer));
                self.writers.len() - 1
            }
        };
        Ok(&mut self.writers[pos].1)
    }
}

impl RenderSink for CsvSink {
    fn series(
        &mut self,
        label: &str,
        channel: &str,
        unit: &str,
        time: &[f64],
        samples: &[f64],
    ) -> Result<(), SinkError> {
        let writer = self.writer(channel, unit)?;
        for (t, v) in time.iter().zip(samples) {
            let (t, v) = (t.to_string(), v.to_string());
            writer.write_record([label, t.as_str(), v.as_str()])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        for (_, writer) in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Channel names may hold characters that are awkward in file names
fn file_stem(channel: &str) -> String {
    channel
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[derive(Debug, Serialize)]
struct JsonSeries {
    label: String,
    time: Vec<f64>,
    samples: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct JsonChannel {
    name: String,
    unit: String,
    series: Vec<JsonSeries>,
}

#[derive(Debug, Default, Serialize)]
struct JsonDocument {
    channels: Vec<JsonChannel>,
}

/// Collects every series and writes one JSON document on finish
pub struct JsonSink<W: Write> {
    out: W,
    doc: JsonDocument,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            doc: JsonDocument::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonSink<File> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> RenderSink for JsonSink<W> {
    fn series(
        &mut self,
        label: &str,
        channel: &str,
        unit: &str,
        time: &[f64],
        samples: &[f64],
    ) -> Result<(), SinkError> {
        let series = JsonSeries {
            label: label.to_string(),
            time: time.to_vec(),
            samples: samples.to_vec(),
        };
        match self.doc.channels.iter_mut().find(|c| c.name == channel) {
            Some(existing) => existing.series.push(series),
            None => self.doc.channels.push(JsonChannel {
                name: channel.to_string(),
                unit: unit.to_string(),
                series: vec![series],
            }),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        serde_json::to_writer_pretty(&mut self.out, &self.doc)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::{PlotRequest, select};
    use crate::ChannelTable;

    fn data() -> crate::select::PlotData {
        let tables: Vec<ChannelTable> = [1.0, 2.0]
            .iter()
            .map(|&k| {
                ChannelTable::new("Time", "s", vec![0.0, 0.5])
                    .with_channel("GenPwr", "kW", vec![k, k * 10.0])
                    .unwrap()
                    .with_channel("B1 Pitch", "deg", vec![0.0, k])
                    .unwrap()
            })
            .collect();
        let request = PlotRequest::positional([
            ("Baseline", vec!["GenPwr", "B1 Pitch"]),
            ("Enabled", vec!["GenPwr"]),
        ]);
        select(&tables, &request).unwrap()
    }

    #[test]
    fn test_csv_sink_writes_file_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("plots")).unwrap();
        data().emit(&mut sink).unwrap();

        assert_eq!(sink.files().len(), 2);
        let power = std::fs::read_to_string(dir.path().join("plots/GenPwr.csv")).unwrap();
        let lines: Vec<&str> = power.lines().collect();
        assert_eq!(lines[0], "label,time,GenPwr (kW)");
        assert_eq!(lines[1], "Baseline,0,1");
        assert_eq!(lines[4], "Enabled,0.5,20");
        assert_eq!(lines.len(), 5);
        assert!(dir.path().join("plots/B1_Pitch.csv").is_file());
    }

    #[test]
    fn test_csv_sink_keeps_colliding_channels_apart() {
        let table = ChannelTable::new("Time", "s", vec![0.0, 1.0])
            .with_channel("B1 Pitch", "deg", vec![1.0, 2.0])
            .unwrap()
            .with_channel("B1_Pitch", "deg", vec![3.0, 4.0])
            .unwrap();
        let request = PlotRequest::positional([("Baseline", vec!["B1 Pitch", "B1_Pitch"])]);
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        select(&[table], &request).unwrap().emit(&mut sink).unwrap();

        assert_eq!(
            sink.files(),
            &[dir.path().join("B1_Pitch.csv"), dir.path().join("B1_Pitch_2.csv")]
        );
        let first = std::fs::read_to_string(dir.path().join("B1_Pitch.csv")).unwrap();
        let second = std::fs::read_to_string(dir.path().join("B1_Pitch_2.csv")).unwrap();
        assert!(first.starts_with("label,time,B1 Pitch (deg)"));
        assert!(first.contains("Baseline,1,2"));
        assert!(second.starts_with("label,time,B1_Pitch (deg)"));
        assert!(second.contains("Baseline,1,4"));
    }

    #[test]
    fn test_json_sink_groups_by_channel() {
        let mut sink = JsonSink::new(Vec::new());
        data().emit(&mut sink).unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        let channels = doc["channels"].as_array().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0]["name"], "GenPwr");
        assert_eq!(channels[0]["unit"], "kW");
        assert_eq!(channels[0]["series"].as_array().unwrap().len(), 2);
        assert_eq!(channels[0]["series"][1]["label"], "Enabled");
        assert_eq!(channels[1]["series"][0]["samples"][1], 1.0);
    }
}
