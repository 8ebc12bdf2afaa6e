use crate::domain::ChunkResult;
use crate::error::Result;
use crate::result::line::{NO_SOLUTIONS, ResultLine, classify, resequence_separator};
use crate::stats::MergeStats;
use crate::util::fsx::remove_quietly;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// How chunk result files are stitched back together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// Drop progress lines, normalize problem lines, re-sequence `>>` separators.
    PepNovo,
    /// Keep the leading lines starting with `prefix` from the first chunk only.
    HeaderOnce { prefix: &'static str },
    Concatenate,
}

/// Merge `inputs` (in chunk order) into `dest`.
///
/// The output goes to a temporary file beside `dest` that is renamed into
/// place once every input has been copied; on error `dest` is untouched.
pub fn merge_results(inputs: &[ChunkResult], dest: &Path, policy: MergePolicy) -> Result<MergeStats> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    let mut stats = MergeStats::default();
    {
        let mut w = BufWriter::new(tmp.as_file());
        for (i, input) in inputs.iter().enumerate() {
            let r = BufReader::new(File::open(&input.path)?);
            copy_chunk(r, &mut w, policy, i == 0, input.offset, &mut stats)?;
            stats.chunks += 1;
            debug!(chunk = %input.path.display(), offset = input.offset, "merged chunk result");
        }
        w.flush()?;
    }
    tmp.persist(dest).map_err(|e| e.error)?;
    info!(
        dest = %dest.display(),
        chunks = stats.chunks,
        lines = stats.lines,
        dropped = stats.dropped_progress,
        problems = stats.normalized_problems,
        "merged chunk results"
    );
    Ok(stats)
}

/// Merge, then delete the chunk result files. Deletion failures are only logged.
pub fn merge_and_delete(inputs: &[ChunkResult], dest: &Path, policy: MergePolicy) -> Result<MergeStats> {
    let stats = merge_results(inputs, dest, policy)?;
    for input in inputs {
        if input.path != dest {
            remove_quietly(&input.path);
        }
    }
    Ok(stats)
}

fn copy_chunk<R: BufRead, W: Write>(
    r: R,
    w: &mut W,
    policy: MergePolicy,
    first: bool,
    offset: usize,
    stats: &mut MergeStats,
) -> Result<()> {
    let mut in_header = true;
    for raw in r.split(b'\n') {
        let raw = raw?;
        let text = String::from_utf8_lossy(&raw);
        let line = text.strip_suffix('\r').unwrap_or(&text);

        match policy {
            MergePolicy::PepNovo => match classify(line) {
                ResultLine::Progress => {
                    stats.dropped_progress += 1;
                    continue;
                }
                ResultLine::Problem(_) => {
                    stats.normalized_problems += 1;
                    writeln!(w, "{NO_SOLUTIONS}")?;
                }
                ResultLine::SpectrumSeparator(sep) => {
                    stats.spectra += 1;
                    writeln!(w, "{}", resequence_separator(sep, offset))?;
                }
                ResultLine::Content(c) => writeln!(w, "{c}")?,
            },
            MergePolicy::HeaderOnce { prefix } => {
                if in_header && line.starts_with(prefix) {
                    if !first {
                        continue;
                    }
                } else {
                    in_header = false;
                }
                writeln!(w, "{line}")?;
            }
            MergePolicy::Concatenate => writeln!(w, "{line}")?,
        }
        stats.lines += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, text: &str, offset: usize) -> ChunkResult {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        ChunkResult { path, offset }
    }

    #[test]
    fn pepnovo_merge_filters_and_resequences() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(
            dir.path(),
            "run_1.out",
            ">> 0 0 s0\n#Index\tScore\n0\t1.5\tPEPTIDE\n#Processed 1 spectra\n>> 0 1 s1\n#Problem reading spectr",
            0,
        );
        let b = write(dir.path(), "run_2.out", ">> 0 0 s2\r\n0\t2.0\tPEPK\r\n#Processed 3\r\n", 2);
        let dest = dir.path().join("run.out");

        let stats = merge_results(&[a, b], &dest, MergePolicy::PepNovo).unwrap();
        let text = fs::read_to_string(&dest).unwrap();
        assert_eq!(
            text,
            ">> 0 0 s0\n#Index\tScore\n0\t1.5\tPEPTIDE\n>> 0 1 s1\n# No solutions found.\n>> 0 2 s2\n0\t2.0\tPEPK\n"
        );
        assert!(!text.lines().any(|l| l.starts_with("#Processed")));
        assert_eq!(stats.spectra, 3);
        assert_eq!(stats.dropped_progress, 2);
        assert_eq!(stats.normalized_problems, 1);
        assert_eq!(stats.chunks, 2);
    }

    #[test]
    fn header_kept_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.csv", "# v1\n# id, pep\n1, PEP\n", 0);
        let b = write(dir.path(), "b.csv", "# v1\n# id, pep\n2, TIDE\n# not header\n", 1);
        let dest = dir.path().join("all.csv");
        merge_results(&[a, b], &dest, MergePolicy::HeaderOnce { prefix: "#" }).unwrap();
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "# v1\n# id, pep\n1, PEP\n2, TIDE\n# not header\n"
        );
    }

    #[test]
    fn missing_chunk_aborts_and_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", "x\n", 0);
        let gone = ChunkResult {
            path: dir.path().join("missing.txt"),
            offset: 1,
        };
        let dest = dir.path().join("all.txt");
        let a_path = a.path.clone();
        assert!(merge_and_delete(&[a, gone], &dest, MergePolicy::Concatenate).is_err());
        assert!(!dest.exists());
        assert!(a_path.exists());
        let leftovers: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(leftovers, [a_path]);
    }

    #[test]
    fn merge_and_delete_removes_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.txt", "x\n", 0);
        let b = write(dir.path(), "b.txt", "y\n", 1);
        let dest = dir.path().join("all.txt");
        let inputs = [a, b];
        merge_and_delete(&inputs, &dest, MergePolicy::Concatenate).unwrap();
        assert!(inputs.iter().all(|c| !c.path.exists()));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "x\ny\n");
    }
}
