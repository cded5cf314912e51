//! Whitespace-delimited tabular artifacts (`.out`, `.txt`, `.dat`).
//!
//! A free-text preamble may precede the header. The header is the row of
//! channel names directly above the first numeric row, optionally followed
//! by a row of parenthesized units. The first column is the time channel.

use std::fmt::Write as _;
use std::path::Path;

use super::ChannelTable;
use crate::error::IngestError;

/// Header and data layout located within the file
struct Layout<'a> {
    description: String,
    names: Vec<&'a str>,
    units: Vec<String>,
    data_start: usize,
}

/// Parse a tabular artifact already read into memory
pub fn parse_ascii(text: &str, path: &Path) -> Result<ChannelTable, IngestError> {
    let format_err = |reason: String| IngestError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let lines: Vec<&str> = text.lines().collect();
    let layout = locate_header(&lines).ok_or_else(|| format_err("no numeric data rows".into()))?;
    let width = layout.names.len();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); width];
    let last_row = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .unwrap_or(layout.data_start);

    for (i, line) in lines.iter().enumerate().skip(layout.data_start) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let line_no = i + 1;
        if tokens.len() < width && i == last_row {
            let rows = columns[0].len() as u64;
            return Err(IngestError::Truncated {
                path: path.to_path_buf(),
                expected: (rows + 1) * width as u64,
                available: rows * width as u64 + tokens.len() as u64,
                unit: "values",
            });
        }
        if tokens.len() != width {
            return Err(format_err(format!(
                "line {line_no}: expected {width} columns, found {}",
                tokens.len()
            )));
        }
        for (column, token) in columns.iter_mut().zip(&tokens) {
            let value = token.parse::<f64>().map_err(|_| {
                format_err(format!("line {line_no}: {token:?} is not a number"))
            })?;
            column.push(value);
        }
    }

    let mut columns = columns.into_iter();
    let time = columns.next().unwrap_or_default();
    let mut table = ChannelTable::new(layout.names[0], &layout.units[0], time)
        .with_source(path)
        .with_description(layout.description);
    for ((name, unit), samples) in layout.names[1..]
        .iter()
        .zip(&layout.units[1..])
        .zip(columns)
    {
        table
            .push_channel(*name, unit, samples)
            .map_err(|e| format_err(e.to_string()))?;
    }
    Ok(table)
}

fn locate_header<'a>(lines: &[&'a str]) -> Option<Layout<'a>> {
    let data_start = lines.iter().position(|line| is_numeric_row(line))?;

    let mut above = lines[..data_start]
        .iter()
        .enumerate()
        .rev()
        .map(|(i, line)| (i, *line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (mut names_at, mut names_line) = above.next()?;
    let mut units: Option<Vec<String>> = None;
    if is_units_row(names_line) {
        units = Some(
            names_line
                .split_whitespace()
                .map(|u| u.trim_start_matches('(').trim_end_matches(')').to_string())
                .collect(),
        );
        (names_at, names_line) = above.next()?;
    }

    let names: Vec<&str> = names_line.split_whitespace().collect();
    let units = match units {
        Some(units) if units.len() == names.len() => units,
        Some(_) => return None,
        None => vec![String::new(); names.len()],
    };

    let description = lines[..names_at]
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Some(Layout {
        description,
        names,
        units,
        data_start,
    })
}

fn is_numeric_row(line: &str) -> bool {
    let mut tokens = line.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| t.parse::<f64>().is_ok())
}

fn is_units_row(line: &str) -> bool {
    line.split_whitespace()
        .all(|t| t.starts_with('(') && t.ends_with(')'))
}

/// Render `table` in the tabular encoding: description, names, units, rows
pub fn encode_ascii(table: &ChannelTable) -> String {
    let mut out = String::new();
    for line in table.description().lines() {
        let _ = writeln!(out, "{line}");
    }
    out.push('\n');

    out.push_str(&table.channel_names().join("\t"));
    out.push('\n');

    let units: Vec<String> = std::iter::once(table.time_unit())
        .chain(table.channels().iter().map(|c| c.unit.as_str()))
        .map(|u| format!("({u})"))
        .collect();
    out.push_str(&units.join("\t"));
    out.push('\n');

    for (i, t) in table.time().iter().enumerate() {
        let _ = write!(out, "{t}");
        for channel in table.channels() {
            let _ = write!(out, "\t{}", channel.samples[i]);
        }
        out.push('\n');
    }
    out
}

pub fn write_ascii(table: &ChannelTable, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, encode_ascii(table))
}
