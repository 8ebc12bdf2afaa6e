use std::fs;
use std::path::{Path, PathBuf};

use denovo_core::chunking::plan_chunk_sizes;
use denovo_core::config::SearchSettings;
use denovo_core::domain::ChunkResult;
use denovo_core::error::{DenovoError, Result};
use denovo_core::result::line::{ResultLine, classify};
use denovo_core::{
    ChunkSet, ChunkStrategy, LogProgress, Pipeline, ToolKind, collect_inputs, count_spectra,
    merge_and_delete, merge_results, split_file, tool_for,
};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::presentation::cli::ChunkArgs;

fn strategy(args: ChunkArgs) -> Result<ChunkStrategy> {
    match (args.max_spectra, args.chunks) {
        (Some(0), _) | (_, Some(0)) => Err(DenovoError::Config(
            "chunk parameters must be at least 1".into(),
        )),
        (Some(n), _) => Ok(ChunkStrategy::MaxSpectra(n)),
        (None, Some(k)) => Ok(ChunkStrategy::Chunks(k)),
        (None, None) => Ok(ChunkStrategy::Chunks(1)),
    }
}

pub fn handle_count(inputs: Vec<PathBuf>) -> Result<()> {
    for input in collect_inputs(&inputs)? {
        println!("{}\t{}", count_spectra(&input)?, input.display());
    }
    Ok(())
}

pub fn handle_plan(input: PathBuf, chunking: ChunkArgs) -> Result<()> {
    let total = count_spectra(&input)?;
    let sizes = plan_chunk_sizes(total, strategy(chunking)?)?;
    println!("{}: {total} spectra in {} chunks", input.display(), sizes.len());
    let mut offset = 0;
    for (i, n) in sizes.iter().enumerate() {
        println!("#{:<4} spectra={n:<8} offset={offset}", i + 1);
        offset += n;
    }
    Ok(())
}

pub fn handle_split(input: PathBuf, out_dir: PathBuf, chunking: ChunkArgs) -> Result<()> {
    let set = split_file(&input, &out_dir, strategy(chunking)?)?;
    for c in &set.chunks {
        println!("{}\t{}", c.spectra, c.path.display());
    }
    if let Some(m) = &set.manifest {
        eprintln!("manifest: {}", m.display());
    }
    Ok(())
}

pub fn handle_merge(
    out: PathBuf,
    tool: ToolKind,
    manifest: Option<PathBuf>,
    dir: Option<PathBuf>,
    delete: bool,
    files: Vec<PathBuf>,
) -> Result<()> {
    let results = match (manifest, dir) {
        (Some(m), _) => results_from_manifest(&m, tool)?,
        (None, Some(d)) => with_offsets(discover_results(&d, tool)?, tool)?,
        (None, None) if !files.is_empty() => with_offsets(files, tool)?,
        (None, None) => {
            return Err(DenovoError::Config(
                "merge needs --manifest, --dir or result files".into(),
            ));
        }
    };
    let policy = tool_for(tool).merge_policy();
    let stats = if delete {
        merge_and_delete(&results, &out, policy)?
    } else {
        merge_results(&results, &out, policy)?
    };
    eprintln!(
        "merged {} chunks ({} lines) into {}",
        stats.chunks,
        stats.lines,
        out.display()
    );
    Ok(())
}

fn results_from_manifest(manifest: &Path, tool: ToolKind) -> Result<Vec<ChunkResult>> {
    let set = ChunkSet::load(manifest)?;
    let t = tool_for(tool);
    Ok(set
        .chunks
        .iter()
        .map(|c| {
            let dir = c.path.parent().unwrap_or(Path::new("."));
            ChunkResult {
                path: t.result_path(&c.path, dir),
                offset: c.offset,
            }
        })
        .collect())
}

/// Chunk results in `dir`, ordered by the chunk number at the end of their stem.
fn discover_results(dir: &Path, tool: ToolKind) -> Result<Vec<PathBuf>> {
    let suffix = tool.result_suffix();
    let mut found: Vec<(usize, PathBuf)> = Vec::new();
    for e in WalkDir::new(dir).max_depth(1) {
        let e = e.map_err(std::io::Error::other)?;
        if !e.file_type().is_file() {
            continue;
        }
        let name = e.file_name().to_string_lossy();
        let Some(stem) = name.strip_suffix(suffix) else {
            continue;
        };
        if let Some(n) = chunk_number(stem) {
            found.push((n, e.path().to_path_buf()));
        }
    }
    if found.is_empty() {
        return Err(DenovoError::Format(format!(
            "no *_<n>{suffix} results in {}",
            dir.display()
        )));
    }
    found.sort();
    Ok(found.into_iter().map(|(_, p)| p).collect())
}

fn chunk_number(stem: &str) -> Option<usize> {
    let (_, n) = stem.rsplit_once('_')?;
    n.parse().ok()
}

/// Offsets for results without a manifest: PepNovo output is counted by its
/// spectrum separators, other tools do not need offsets.
fn with_offsets(files: Vec<PathBuf>, tool: ToolKind) -> Result<Vec<ChunkResult>> {
    let mut offset = 0;
    let mut out = Vec::with_capacity(files.len());
    for path in files {
        let n = match tool {
            ToolKind::PepNovo => count_separators(&path)?,
            _ => 0,
        };
        out.push(ChunkResult { path, offset });
        offset += n;
    }
    Ok(out)
}

fn count_separators(path: &Path) -> Result<usize> {
    let text = fs::read(path)?;
    Ok(String::from_utf8_lossy(&text)
        .lines()
        .filter(|l| matches!(classify(l), ResultLine::SpectrumSeparator(_)))
        .count())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_run(
    config: Option<PathBuf>,
    tool: Option<ToolKind>,
    executable: Option<PathBuf>,
    threads: Option<usize>,
    max_spectra: Option<usize>,
    output_dir: Option<PathBuf>,
    keep_chunks: bool,
    json: bool,
    inputs: Vec<PathBuf>,
) -> Result<()> {
    let mut settings = match (&config, tool) {
        (Some(p), _) => SearchSettings::load(p)?,
        (None, Some(t)) => SearchSettings::for_tool(t),
        (None, None) => SearchSettings::default(),
    };
    if let Some(t) = tool {
        if t != settings.tool {
            settings.tool = t;
            settings.executable = PathBuf::from(t.default_executable());
        }
    }
    if let Some(e) = executable {
        settings.executable = e;
    }
    if threads.is_some() {
        settings.threads = threads;
    }
    if max_spectra.is_some() {
        settings.max_spectra_per_chunk = max_spectra;
    }
    if output_dir.is_some() {
        settings.output_dir = output_dir;
    }
    settings.keep_chunk_files |= keep_chunks;

    let inputs = collect_inputs(&inputs)?;
    if inputs.is_empty() {
        return Err(DenovoError::Config("no MGF inputs found".into()));
    }
    info!("{settings}");

    let pipeline = Pipeline::new(settings)?;
    let token = pipeline.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
    let progress = LogProgress::new();
    let mut reports = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let report = pipeline.run_file(input, &progress)?;
        if let Some(out) = &report.output {
            eprintln!(
                "{} -> {} ({} spectra, {} chunks, {} ms)",
                input.display(),
                out.display(),
                report.spectra,
                report.chunks,
                report.elapsed_ms
            );
        }
        let canceled = report.canceled;
        reports.push(report);
        if canceled {
            eprintln!("canceled; remaining inputs skipped");
            break;
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}

pub fn handle_init_config(out: PathBuf, tool: ToolKind, force: bool) -> Result<()> {
    if out.exists() && !force {
        return Err(DenovoError::Config(format!(
            "{} exists (use --force to overwrite)",
            out.display()
        )));
    }
    SearchSettings::for_tool(tool).save(&out)?;
    eprintln!("wrote {} settings to {}", tool, out.display());
    Ok(())
}
