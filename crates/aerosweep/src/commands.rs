//! Subcommand implementations

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aerosweep_core::select::{CsvSink, JsonSink};
use aerosweep_core::{
    CaseMatrix, CaseRunner, ChannelTable, ParamKey, PlotRequest, RunProgress, RunResult, SweepFile,
    load, select,
};
use color_eyre::eyre::{WrapErr, bail, eyre};
use tracing::{info, warn};

use crate::chart::ChartSink;

/// One `LABEL=PATH` argument of the `plot` subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledFile {
    pub label: String,
    pub path: PathBuf,
}

impl std::str::FromStr for LabeledFile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((label, path)) if !label.is_empty() && !path.is_empty() => Ok(Self {
                label: label.to_string(),
                path: PathBuf::from(path),
            }),
            _ => Err(format!("expected LABEL=PATH, got {s:?}")),
        }
    }
}

/// Where selected series go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotTarget {
    Terminal,
    Csv(PathBuf),
    Json(PathBuf),
}

/// Overrides applied to a sweep file by the `run` subcommand
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub jobs: Option<usize>,
    pub full: bool,
    pub dry_run: bool,
    pub output_dir: Option<PathBuf>,
}

/// One row per case, one column per swept parameter
pub fn format_matrix(matrix: &CaseMatrix) -> String {
    let keys: BTreeSet<&ParamKey> = matrix
        .iter()
        .flat_map(|case| case.assignments.keys())
        .collect();

    let mut rows: Vec<Vec<String>> = vec![
        std::iter::once("case".to_string())
            .chain(keys.iter().map(ToString::to_string))
            .collect(),
    ];
    for case in matrix {
        let mut row = vec![case.index.to_string()];
        row.extend(keys.iter().map(|key| {
            case.assignments
                .get(*key)
                .map_or_else(String::new, ToString::to_string)
        }));
        rows.push(row);
    }

    let widths: Vec<usize> = (0..=keys.len())
        .map(|c| rows.iter().map(|r| r.get(c).map_or(0, String::len)).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    let _ = write!(
        out,
        "{} case(s) over groups {:?}",
        matrix.len(),
        matrix.shape()
    );
    out
}

/// `aerosweep cases`
pub fn cases(sweep_path: &Path) -> color_eyre::Result<()> {
    let sweep = SweepFile::load(sweep_path)?;
    let matrix = sweep.build()?;
    info!(path = %sweep_path.display(), cases = matrix.len(), "expanded sweep");
    println!("{}", format_matrix(&matrix));
    Ok(())
}

/// `aerosweep run`
pub fn run(sweep_path: &Path, options: &RunOptions) -> color_eyre::Result<Vec<RunResult>> {
    let mut sweep = SweepFile::load(sweep_path)?;
    if let Some(jobs) = options.jobs {
        sweep.run.max_parallel = jobs;
    }
    if let Some(dir) = &options.output_dir {
        sweep.run.output_dir = dir.clone();
    }
    sweep.full_run |= options.full;

    // Fail on structural problems before touching the filesystem
    let matrix = sweep.build()?;
    let runner = CaseRunner::new(sweep.run.clone());

    if options.dry_run {
        let inputs = runner.prepare(&matrix, &sweep.base)?;
        println!(
            "wrote {} input file(s) to {}",
            inputs.len(),
            sweep.run.output_dir.display()
        );
        return Ok(Vec::new());
    }

    let progress = RunProgress::new(matrix.len());
    let results = std::thread::scope(|scope| {
        let handle = scope.spawn(|| runner.run(&matrix, &sweep.base, Some(&progress)));
        while !handle.is_finished() {
            std::thread::sleep(Duration::from_millis(500));
            eprint!(
                "\r{}/{} cases finished ({} failed)",
                progress.completed(),
                progress.total(),
                progress.failed()
            );
        }
        eprintln!();
        handle
            .join()
            .map_err(|_| eyre!("run worker panicked"))
    })??;

    for result in &results {
        match (&result.output_path, &result.failure) {
            (Some(path), _) => println!("case {:>4}  ok      {}", result.case_index, path.display()),
            (None, Some(failure)) => println!("case {:>4}  FAILED  {failure}", result.case_index),
            (None, None) => {}
        }
    }
    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        warn!(failed, "some cases failed");
    }
    Ok(results)
}

/// Load every file, reporting all unreadable ones together
pub fn load_tables(files: &[LabeledFile]) -> color_eyre::Result<Vec<ChannelTable>> {
    let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
    let mut tables = Vec::with_capacity(files.len());
    let mut errors = Vec::new();
    for (file, result) in files.iter().zip(load(&paths)) {
        match result {
            Ok(table) => tables.push(table),
            Err(e) => errors.push(format!("{}: {e}", file.label)),
        }
    }
    if !errors.is_empty() {
        bail!("failed to load {} file(s):\n  {}", errors.len(), errors.join("\n  "));
    }
    Ok(tables)
}

/// `aerosweep plot`
pub fn plot(
    files: &[LabeledFile],
    channels: &[String],
    target: &PlotTarget,
) -> color_eyre::Result<()> {
    if files.is_empty() {
        bail!("no files to plot");
    }
    let tables = load_tables(files)?;
    let request = PlotRequest::positional(
        files
            .iter()
            .map(|f| (f.label.clone(), channels.iter().cloned())),
    );
    let data = select(&tables, &request)?;

    match target {
        PlotTarget::Csv(dir) => {
            let mut sink = CsvSink::new(dir)?;
            data.emit(&mut sink)?;
            println!("wrote {} file(s) to {}", sink.files().len(), dir.display());
        }
        PlotTarget::Json(path) => {
            let mut sink = JsonSink::create(path)
                .wrap_err_with(|| format!("cannot create {}", path.display()))?;
            data.emit(&mut sink)?;
            println!("wrote {}", path.display());
        }
        PlotTarget::Terminal => {
            let mut sink = ChartSink::new();
            data.emit(&mut sink)?;
            let labels: Vec<&str> = data.labels().collect();
            let mut viewer = sink.into_viewer(labels.join(" vs "));
            ratatui::run(|terminal| viewer.run(terminal))?;
        }
    }
    Ok(())
}
