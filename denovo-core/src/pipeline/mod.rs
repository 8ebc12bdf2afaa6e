use crate::chunking::split::split_counted;
use crate::chunking::{ChunkSet, plan_chunk_sizes};
use crate::config::SearchSettings;
use crate::domain::{ChunkResult, JobRow};
use crate::error::{DenovoError, Result};
use crate::job::{CancelToken, Job, JobStatus, ProgressListener};
use crate::mgf::{count_spectra, is_compressed, is_spectra_file, spectra_stem};
use crate::result::merge::{merge_and_delete, merge_results};
use crate::stats::MergeStats;
use crate::tool::{SequencingTool, ToolKind, tool_for};
use crate::util::fsx::{remove_quietly, sibling};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of one input file.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub source: PathBuf,
    pub tool: ToolKind,
    /// Merged result file; `None` when the run was canceled.
    pub output: Option<PathBuf>,
    pub spectra: usize,
    pub chunks: usize,
    pub jobs: Vec<JobRow>,
    pub canceled: bool,
    pub merge: Option<MergeStats>,
    pub started: i64,
    pub elapsed_ms: u128,
}

pub struct Pipeline {
    settings: SearchSettings,
    tool: Box<dyn SequencingTool>,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(settings: SearchSettings) -> Result<Self> {
        settings.validate()?;
        let tool = tool_for(settings.tool);
        Ok(Self {
            settings,
            tool,
            cancel: CancelToken::new(),
        })
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Token that cancels every job of this pipeline, running or pending.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run_file(&self, input: &Path, listener: &dyn ProgressListener) -> Result<RunReport> {
        let t0 = Instant::now();
        let started = OffsetDateTime::now_utc().unix_timestamp();
        let stem = spectra_stem(input);
        let out_dir = self.output_dir(input);
        fs::create_dir_all(&out_dir)?;
        let dest = sibling(&out_dir, &stem, self.tool.kind().result_suffix());

        let total = count_spectra(input)?;
        let strategy = self.settings.chunk_strategy();
        let n_chunks = plan_chunk_sizes(total, strategy)?.len();
        info!(
            source = %input.display(),
            spectra = total,
            chunks = n_chunks,
            tool = %self.tool.kind(),
            "starting search"
        );
        listener.input_started(input, total);

        let mut report = RunReport {
            source: input.to_path_buf(),
            tool: self.tool.kind(),
            output: None,
            spectra: total,
            chunks: n_chunks,
            jobs: Vec::new(),
            canceled: false,
            merge: None,
            started,
            elapsed_ms: 0,
        };

        if total == 0 {
            warn!(source = %input.display(), "no spectra found, writing empty result");
            fs::File::create(&dest)?;
            report.output = Some(dest);
            report.merge = Some(MergeStats::default());
            report.elapsed_ms = t0.elapsed().as_millis();
            return Ok(report);
        }

        // Chunk results always live in the work dir; `dest` is only ever written by the merge.
        let work_dir = match &self.settings.chunk_dir {
            Some(d) => d.clone(),
            None => out_dir.join(format!("{stem}_chunks")),
        };
        let created_dir = (!work_dir.exists()).then(|| work_dir.clone());
        fs::create_dir_all(&work_dir)?;
        // The tool reads plain MGF, so a compressed source is always cut into chunk files.
        let chunk_set = if n_chunks <= 1 && !is_compressed(input) {
            ChunkSet::single(input, total)
        } else {
            split_counted(input, &work_dir, strategy, total)?
        };

        let mut jobs = chunk_set
            .chunks
            .iter()
            .map(|c| {
                let inv = self.tool.invocation(&self.settings, &c.path, &work_dir)?;
                Ok(Job::new(c.index, &c.path, inv))
            })
            .collect::<Result<Vec<_>>>()?;

        let threads = self.settings.effective_threads().min(jobs.len()).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| DenovoError::Config(format!("thread pool: {e}")))?;
        pool.install(|| {
            jobs.par_iter_mut().for_each(|job| {
                job.run(&self.cancel, listener);
            });
        });
        report.jobs = jobs.iter().map(Job::row).collect();

        if let Some(failed) = jobs.iter().find(|j| *j.status() == JobStatus::Error) {
            return Err(DenovoError::Job {
                chunk: failed.chunk.clone(),
                message: failed.error().unwrap_or("unknown error").to_string(),
            });
        }

        let keep = self.settings.keep_chunk_files;
        if jobs.iter().any(|j| *j.status() == JobStatus::Canceled) {
            info!(source = %input.display(), "search canceled");
            if !keep {
                for j in &jobs {
                    remove_quietly(j.output());
                }
                self.cleanup(&jobs, &chunk_set, created_dir.as_deref());
            }
            report.canceled = true;
            report.elapsed_ms = t0.elapsed().as_millis();
            return Ok(report);
        }

        let results: Vec<ChunkResult> = jobs
            .iter()
            .zip(chunk_set.chunks.iter())
            .map(|(j, c)| ChunkResult {
                path: j.output().to_path_buf(),
                offset: c.offset,
            })
            .collect();
        let policy = self.tool.merge_policy();
        let stats = if keep {
            merge_results(&results, &dest, policy)?
        } else {
            let stats = merge_and_delete(&results, &dest, policy)?;
            self.cleanup(&jobs, &chunk_set, created_dir.as_deref());
            stats
        };

        report.output = Some(dest);
        report.merge = Some(stats);
        report.elapsed_ms = t0.elapsed().as_millis();
        info!(
            source = %input.display(),
            elapsed_ms = report.elapsed_ms as u64,
            "search finished"
        );
        Ok(report)
    }

    fn output_dir(&self, input: &Path) -> PathBuf {
        match &self.settings.output_dir {
            Some(d) => d.clone(),
            None => input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    fn cleanup(&self, jobs: &[Job], chunk_set: &ChunkSet, created_dir: Option<&Path>) {
        for j in jobs {
            for (p, _) in &j.invocation.support_files {
                remove_quietly(p);
            }
        }
        chunk_set.remove_files();
        if let Some(dir) = created_dir {
            // only succeeds when empty; anything left there is the user's
            let _ = fs::remove_dir(dir);
        }
    }
}

/// Expand directories into the spectra files beneath them, sorted; files pass through.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for p in paths {
        if p.is_dir() {
            let mut found = Vec::new();
            for e in WalkDir::new(p).follow_links(true) {
                let e = e.map_err(std::io::Error::other)?;
                if e.file_type().is_file() && is_spectra_file(e.path()) {
                    found.push(e.path().to_path_buf());
                }
            }
            found.sort();
            out.extend(found);
        } else if p.exists() {
            out.push(p.clone());
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input not found: {}", p.display()),
            )
            .into());
        }
    }
    Ok(out)
}
