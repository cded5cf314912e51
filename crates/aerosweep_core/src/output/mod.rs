//! Output artifact ingestion
//!
//! Each artifact is read into its own [`ChannelTable`]. The encoding is
//! decided once per file from its extension, and for binary artifacts
//! confirmed by the leading file id.

mod ascii;
mod binary;
mod table;

use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

pub use ascii::{encode_ascii, parse_ascii, write_ascii};
pub use binary::{BinaryEncoding, encode_binary, parse_binary, write_binary};
pub use table::{Channel, ChannelTable};

use crate::error::IngestError;

/// On-disk encoding of an output artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Binary,
    Ascii,
}

impl Encoding {
    /// Encoding implied by a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "outb" => Some(Encoding::Binary),
            "out" | "txt" | "dat" => Some(Encoding::Ascii),
            _ => None,
        }
    }
}

/// Load one artifact
pub fn load_one(path: impl AsRef<Path>) -> Result<ChannelTable, IngestError> {
    let path = path.as_ref();
    let format_err = |reason: String| IngestError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let encoding = Encoding::from_path(path).ok_or_else(|| {
        format_err(format!(
            "unsupported extension {:?}",
            path.extension().unwrap_or_default()
        ))
    })?;

    let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let table = match encoding {
        Encoding::Binary => {
            if bytes.len() >= 2 && !binary::has_marker(&bytes) {
                return Err(format_err("missing binary file id".into()));
            }
            parse_binary(&bytes, path)?
        }
        Encoding::Ascii => {
            let text = std::str::from_utf8(&bytes)
                .map_err(|e| format_err(format!("not valid text: {e}")))?;
            parse_ascii(text, path)?
        }
    };

    debug!(
        path = %path.display(),
        channels = table.channel_count(),
        samples = table.sample_count(),
        "loaded output artifact"
    );
    Ok(table)
}

/// Load every path, one result per path in input order.
///
/// A file that fails to load does not prevent the others from loading.
pub fn load<P>(paths: &[P]) -> Vec<Result<ChannelTable, IngestError>>
where
    P: AsRef<Path> + Sync,
{
    #[cfg(feature = "parallel")]
    let results: Vec<_> = paths.par_iter().map(load_one).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = paths.iter().map(load_one).collect();

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        warn!(path = %err.path().display(), "failed to load output artifact: {err}");
    }
    results
}

/// Load every path, failing on the first unreadable file
pub fn load_all<P>(paths: &[P]) -> Result<Vec<ChannelTable>, IngestError>
where
    P: AsRef<Path> + Sync,
{
    load(paths).into_iter().collect()
}

/// Output artifacts of the successful cases in a run batch
pub fn successful_outputs(results: &[crate::runner::RunResult]) -> Vec<PathBuf> {
    results
        .iter()
        .filter_map(|r| r.output_path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ChannelTable {
        ChannelTable::new("Time", "s", vec![0.0, 0.1, 0.2, 0.3])
            .with_channel("GenPwr", "kW", vec![0.0, 10.0, 20.0, 30.0])
            .unwrap()
    }

    #[test]
    fn test_encoding_from_extension() {
        assert_eq!(Encoding::from_path(Path::new("a_0.outb")), Some(Encoding::Binary));
        assert_eq!(Encoding::from_path(Path::new("a_0.OUT")), Some(Encoding::Ascii));
        assert_eq!(Encoding::from_path(Path::new("a_0.dat")), Some(Encoding::Ascii));
        assert_eq!(Encoding::from_path(Path::new("a_0.csv")), None);
        assert_eq!(Encoding::from_path(Path::new("a_0")), None);
    }

    #[test]
    fn test_load_keeps_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good_bin = dir.path().join("m_0.outb");
        let good_txt = dir.path().join("m_1.out");
        let missing = dir.path().join("m_2.outb");
        let unknown = dir.path().join("m_3.csv");
        write_binary(&table(), &good_bin, BinaryEncoding::WithoutTime).unwrap();
        write_ascii(&table(), &good_txt).unwrap();
        std::fs::write(&unknown, "Time,GenPwr\n").unwrap();

        let results = load(&[&good_bin, &good_txt, &missing, &unknown]);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().source(), good_bin.as_path());
        assert_eq!(results[1].as_ref().unwrap().get("GenPwr").unwrap().len(), 4);
        assert!(matches!(results[2], Err(IngestError::Io { .. })));
        assert!(matches!(results[3], Err(IngestError::Format { .. })));
    }

    #[test]
    fn test_text_in_binary_extension_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m_0.outb");
        std::fs::write(&path, "Time GenPwr\n0 1\n").unwrap();
        assert!(matches!(load_one(&path), Err(IngestError::Format { .. })));
    }

    #[test]
    fn test_loading_twice_gives_independent_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m_0.outb");
        write_binary(&table(), &path, BinaryEncoding::Uncompressed).unwrap();

        let tables = load_all(&[&path, &path]).unwrap();
        assert_eq!(tables[0], tables[1]);
        assert_ne!(
            tables[0].get("GenPwr").unwrap().as_ptr(),
            tables[1].get("GenPwr").unwrap().as_ptr()
        );
    }
}
