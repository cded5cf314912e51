//! Packed-binary time-series artifacts (`.outb`).
//!
//! Layout, all little-endian:
//!
//! | field            | type                 | present when                 |
//! |------------------|----------------------|------------------------------|
//! | file id          | i16                  | always                       |
//! | name length      | i16                  | id 4 (otherwise 10)          |
//! | channel count N  | i32                  | always (time excluded)       |
//! | sample count T   | i32                  | always                       |
//! | time scale, off  | f64, f64             | id 1                         |
//! | time start, step | f64, f64             | ids 2, 3, 4                  |
//! | column scales    | f32 x N              | ids 1, 2, 4                  |
//! | column offsets   | f32 x N              | ids 1, 2, 4                  |
//! | description      | i32 length + bytes   | always                       |
//! | names, units     | (N+1) x name length  | always, time first           |
//! | packed time      | i32 x T              | id 1                         |
//! | samples          | i16 x T*N row-major  | ids 1, 2, 4                  |
//! | samples          | f64 x T*N row-major  | id 3                         |
//!
//! Packed values decode as `(raw - offset) / scale`.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::ChannelTable;
use crate::error::IngestError;

const DEFAULT_NAME_LEN: usize = 10;

const INT16_MIN: f64 = -32768.0;
const INT16_MAX: f64 = 32767.0;
const INT32_MIN: f64 = -2_147_483_648.0;
const INT32_MAX: f64 = 2_147_483_647.0;

/// Sample encoding selected by the file id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryEncoding {
    /// Id 1: packed i32 time column, i16 samples
    WithTime,
    /// Id 2: uniform time from start and step, i16 samples
    WithoutTime,
    /// Id 3: uniform time, raw f64 samples
    Uncompressed,
    /// Id 4: as `WithoutTime`, with an explicit name length
    LongNames,
}

impl BinaryEncoding {
    pub fn file_id(self) -> i16 {
        match self {
            BinaryEncoding::WithTime => 1,
            BinaryEncoding::WithoutTime => 2,
            BinaryEncoding::Uncompressed => 3,
            BinaryEncoding::LongNames => 4,
        }
    }

    pub fn from_file_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(BinaryEncoding::WithTime),
            2 => Some(BinaryEncoding::WithoutTime),
            3 => Some(BinaryEncoding::Uncompressed),
            4 => Some(BinaryEncoding::LongNames),
            _ => None,
        }
    }

    /// Compact encoding that can represent `table`'s time axis
    pub fn for_table(table: &ChannelTable) -> Self {
        if table.sample_count() < 2 || table.uniform_step().is_some() {
            BinaryEncoding::WithoutTime
        } else {
            BinaryEncoding::WithTime
        }
    }

    fn has_packed_time(self) -> bool {
        self == BinaryEncoding::WithTime
    }

    fn is_compressed(self) -> bool {
        self != BinaryEncoding::Uncompressed
    }
}

/// Whether `bytes` start with a recognized file id
pub fn has_marker(bytes: &[u8]) -> bool {
    bytes.len() >= 2
        && BinaryEncoding::from_file_id(i16::from_le_bytes([bytes[0], bytes[1]])).is_some()
}

/// Bounds-checked little-endian reads that report short input as truncation
struct PackedReader<'a> {
    cursor: Cursor<&'a [u8]>,
    path: &'a Path,
}

impl<'a> PackedReader<'a> {
    fn new(bytes: &'a [u8], path: &'a Path) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            path,
        }
    }

    fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.cursor.position())
    }

    fn ensure(&self, needed: u64) -> Result<(), IngestError> {
        if self.remaining() < needed {
            return Err(IngestError::Truncated {
                path: self.path.to_path_buf(),
                expected: self.cursor.position().saturating_add(needed),
                available: self.len(),
                unit: "bytes",
            });
        }
        Ok(())
    }

    fn i16(&mut self) -> Result<i16, IngestError> {
        self.ensure(2)?;
        Ok(self.cursor.read_i16::<LittleEndian>().map_err(|e| self.io(e))?)
    }

    fn i32(&mut self) -> Result<i32, IngestError> {
        self.ensure(4)?;
        Ok(self.cursor.read_i32::<LittleEndian>().map_err(|e| self.io(e))?)
    }

    fn f32(&mut self) -> Result<f32, IngestError> {
        self.ensure(4)?;
        Ok(self.cursor.read_f32::<LittleEndian>().map_err(|e| self.io(e))?)
    }

    fn f64(&mut self) -> Result<f64, IngestError> {
        self.ensure(8)?;
        Ok(self.cursor.read_f64::<LittleEndian>().map_err(|e| self.io(e))?)
    }

    fn string(&mut self, len: usize) -> Result<String, IngestError> {
        self.ensure(len as u64)?;
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf).map_err(|e| self.io(e))?;
        Ok(String::from_utf8_lossy(&buf).trim().to_string())
    }

    fn count(&mut self, what: &str) -> Result<usize, IngestError> {
        let value = self.i32()?;
        usize::try_from(value).map_err(|_| IngestError::Format {
            path: self.path.to_path_buf(),
            reason: format!("negative {what} {value}"),
        })
    }

    fn io(&self, source: io::Error) -> IngestError {
        IngestError::Io {
            path: self.path.to_path_buf(),
            source,
        }
    }
}

/// Parse a packed-binary artifact already read into memory
pub fn parse_binary(bytes: &[u8], path: &Path) -> Result<ChannelTable, IngestError> {
    let mut r = PackedReader::new(bytes, path);
    let format_err = |reason: String| IngestError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let file_id = r.i16()?;
    let encoding = BinaryEncoding::from_file_id(file_id)
        .ok_or_else(|| format_err(format!("unknown file id {file_id}")))?;

    let name_len = if encoding == BinaryEncoding::LongNames {
        let len = r.i16()?;
        usize::try_from(len)
            .ok()
            .filter(|&l| l > 0)
            .ok_or_else(|| format_err(format!("invalid name length {len}")))?
    } else {
        DEFAULT_NAME_LEN
    };

    let num_channels = r.count("channel count")?;
    let num_samples = r.count("sample count")?;

    // Header size implied by the counts, checked before anything is sized from them
    let columns = num_channels as u64;
    let factor_bytes = if encoding.is_compressed() { 8 * columns } else { 0 };
    let label_bytes = 2 * (columns + 1) * name_len as u64;
    r.ensure(16 + factor_bytes + 4 + label_bytes)?;
    if num_channels == 0 && num_samples > 0 && !encoding.has_packed_time() {
        return Err(format_err(format!(
            "{num_samples} samples declared without data channels"
        )));
    }

    let (time_a, time_b) = (r.f64()?, r.f64()?);

    let (scales, offsets) = if encoding.is_compressed() {
        let scales = (0..num_channels)
            .map(|_| r.f32())
            .collect::<Result<Vec<_>, _>>()?;
        let offsets = (0..num_channels)
            .map(|_| r.f32())
            .collect::<Result<Vec<_>, _>>()?;
        (scales, offsets)
    } else {
        (vec![1.0; num_channels], vec![0.0; num_channels])
    };

    let desc_len = r.count("description length")?;
    let description = r.string(desc_len)?;

    let names = (0..=num_channels)
        .map(|_| r.string(name_len))
        .collect::<Result<Vec<_>, _>>()?;
    let units = (0..=num_channels)
        .map(|_| r.string(name_len).map(|u| strip_unit(&u)))
        .collect::<Result<Vec<_>, _>>()?;

    // Check the declared payload against what is present before decoding
    let value_count = (num_samples as u64).saturating_mul(columns);
    let sample_width = if encoding.is_compressed() { 2 } else { 8 };
    let time_bytes = if encoding.has_packed_time() {
        num_samples as u64 * 4
    } else {
        0
    };
    r.ensure(time_bytes.saturating_add(value_count.saturating_mul(sample_width)))?;

    let time: Vec<f64> = if encoding.has_packed_time() {
        let (scale, offset) = (time_a, time_b);
        (0..num_samples)
            .map(|_| r.i32().map(|raw| (f64::from(raw) - offset) / scale))
            .collect::<Result<_, _>>()?
    } else {
        let (start, step) = (time_a, time_b);
        (0..num_samples).map(|i| start + step * i as f64).collect()
    };

    let mut columns: Vec<Vec<f64>> = (0..num_channels)
        .map(|_| Vec::with_capacity(num_samples))
        .collect();
    for _ in 0..num_samples {
        for (c, column) in columns.iter_mut().enumerate() {
            let value = if encoding.is_compressed() {
                (f64::from(r.i16()?) - f64::from(offsets[c])) / f64::from(scales[c])
            } else {
                r.f64()?
            };
            column.push(value);
        }
    }

    let mut table = ChannelTable::new(&names[0], &units[0], time)
        .with_source(path)
        .with_description(description);
    for ((name, unit), samples) in names[1..].iter().zip(&units[1..]).zip(columns) {
        table
            .push_channel(name, unit, samples)
            .map_err(|e| format_err(e.to_string()))?;
    }
    Ok(table)
}

/// Units are stored in parentheses, e.g. `(kW)`
fn strip_unit(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string()
}

/// Write `table` as a packed-binary artifact
pub fn write_binary(table: &ChannelTable, path: &Path, encoding: BinaryEncoding) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    encode_binary(table, &mut w, encoding)?;
    w.flush()
}

/// Encode `table` into any writer
pub fn encode_binary<W: Write>(
    table: &ChannelTable,
    w: &mut W,
    encoding: BinaryEncoding,
) -> io::Result<()> {
    let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidInput, msg);

    let time = table.time();
    let num_samples = i32::try_from(time.len()).map_err(|_| invalid("too many samples".into()))?;
    let num_channels =
        i32::try_from(table.channel_count()).map_err(|_| invalid("too many channels".into()))?;

    let name_len = if encoding == BinaryEncoding::LongNames {
        table
            .channel_names()
            .iter()
            .map(|n| n.len())
            .chain(table.channels().iter().map(|c| c.unit.len() + 2))
            .chain(std::iter::once(table.time_unit().len() + 2))
            .max()
            .unwrap_or(0)
            .max(DEFAULT_NAME_LEN)
    } else {
        DEFAULT_NAME_LEN
    };

    w.write_i16::<LittleEndian>(encoding.file_id())?;
    if encoding == BinaryEncoding::LongNames {
        let len = i16::try_from(name_len).map_err(|_| invalid("channel name too long".into()))?;
        w.write_i16::<LittleEndian>(len)?;
    }
    w.write_i32::<LittleEndian>(num_channels)?;
    w.write_i32::<LittleEndian>(num_samples)?;

    let mut packed_time = Vec::new();
    if encoding.has_packed_time() {
        let (scale, offset) = pack_factors(time, INT32_MIN, INT32_MAX);
        w.write_f64::<LittleEndian>(scale)?;
        w.write_f64::<LittleEndian>(offset)?;
        packed_time = time
            .iter()
            .map(|t| (t * scale + offset).round().clamp(INT32_MIN, INT32_MAX) as i32)
            .collect();
    } else {
        if time.len() >= 2 && table.uniform_step().is_none() {
            return Err(invalid(format!(
                "{:?} requires a uniform time axis",
                encoding
            )));
        }
        if table.channel_count() == 0 && !time.is_empty() {
            return Err(invalid(format!("{encoding:?} requires at least one data channel")));
        }
        let start = time.first().copied().unwrap_or(0.0);
        let step = table.uniform_step().unwrap_or(0.0);
        w.write_f64::<LittleEndian>(start)?;
        w.write_f64::<LittleEndian>(step)?;
    }

    let factors: Vec<(f32, f32)> = table
        .channels()
        .iter()
        .map(|c| {
            let (scale, offset) = pack_factors(&c.samples, INT16_MIN, INT16_MAX);
            (scale as f32, offset as f32)
        })
        .collect();
    if encoding.is_compressed() {
        for (scale, _) in &factors {
            w.write_f32::<LittleEndian>(*scale)?;
        }
        for (_, offset) in &factors {
            w.write_f32::<LittleEndian>(*offset)?;
        }
    }

    let description = table.description().as_bytes();
    w.write_i32::<LittleEndian>(description.len() as i32)?;
    w.write_all(description)?;

    for name in table.channel_names() {
        write_padded(w, name, name_len)?;
    }
    write_padded(w, &format!("({})", table.time_unit()), name_len)?;
    for channel in table.channels() {
        write_padded(w, &format!("({})", channel.unit), name_len)?;
    }

    for raw in packed_time {
        w.write_i32::<LittleEndian>(raw)?;
    }

    for i in 0..time.len() {
        for (channel, (scale, offset)) in table.channels().iter().zip(&factors) {
            let value = channel.samples[i];
            if encoding.is_compressed() {
                // Pack with the f32-rounded factors so decoding inverts exactly
                let raw = (value * f64::from(*scale) + f64::from(*offset))
                    .round()
                    .clamp(INT16_MIN, INT16_MAX);
                w.write_i16::<LittleEndian>(raw as i16)?;
            } else {
                w.write_f64::<LittleEndian>(value)?;
            }
        }
    }
    Ok(())
}

/// Scale and offset mapping `values` onto the integer range `[lo, hi]`
fn pack_factors(values: &[f64], lo: f64, hi: f64) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), &v| {
            (mn.min(v), mx.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return (1.0, 0.0);
    }
    let scale = if max > min { (hi - lo) / (max - min) } else { 1.0 };
    (scale, lo - scale * min)
}

fn write_padded<W: Write>(w: &mut W, text: &str, width: usize) -> io::Result<()> {
    let mut field = vec![b' '; width];
    let bytes = text.as_bytes();
    let n = bytes.len().min(width);
    field[..n].copy_from_slice(&bytes[..n]);
    w.write_all(&field)
}
