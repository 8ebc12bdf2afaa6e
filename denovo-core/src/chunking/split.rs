use crate::chunking::plan::{ChunkStrategy, chunk_offsets, plan_chunk_sizes};
use crate::domain::ChunkDescriptor;
use crate::error::{DenovoError, Result};
use crate::mgf::{MgfScanner, count_spectra, open_spectra, spectra_stem};
use crate::util::fsx::{remove_quietly, sibling};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_SUFFIX: &str = ".chunks.json";

/// The chunks cut from one source file, in source order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSet {
    pub source: PathBuf,
    pub total_spectra: usize,
    pub chunks: Vec<ChunkDescriptor>,
    /// True when the only chunk is the source file itself; nothing may be deleted then.
    #[serde(default)]
    pub in_place: bool,
    #[serde(skip)]
    pub manifest: Option<PathBuf>,
}

impl ChunkSet {
    /// Treat the whole source as a single chunk, without copying it.
    pub fn single(source: &Path, total_spectra: usize) -> Self {
        Self {
            source: source.to_path_buf(),
            total_spectra,
            chunks: vec![ChunkDescriptor {
                source: source.to_path_buf(),
                index: 1,
                path: source.to_path_buf(),
                spectra: total_spectra,
                offset: 0,
            }],
            in_place: true,
            manifest: None,
        }
    }

    pub fn load(manifest: &Path) -> Result<Self> {
        let f = File::open(manifest)?;
        let mut set: ChunkSet = serde_json::from_reader(std::io::BufReader::new(f))?;
        let sum: usize = set.chunks.iter().map(|c| c.spectra).sum();
        if sum != set.total_spectra {
            return Err(DenovoError::Format(format!(
                "{}: chunks hold {sum} spectra, manifest says {}",
                manifest.display(),
                set.total_spectra
            )));
        }
        set.manifest = Some(manifest.to_path_buf());
        Ok(set)
    }

    fn save(&mut self, manifest: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(manifest)?);
        serde_json::to_writer_pretty(&mut w, &*self)?;
        w.flush()?;
        self.manifest = Some(manifest.to_path_buf());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Delete chunk spectra files and the manifest. Failures are logged only.
    pub fn remove_files(&self) {
        if self.in_place {
            return;
        }
        for c in &self.chunks {
            remove_quietly(&c.path);
        }
        if let Some(m) = &self.manifest {
            remove_quietly(m);
        }
    }
}

pub fn chunk_path(out_dir: &Path, stem: &str, index: usize) -> PathBuf {
    sibling(out_dir, stem, &format!("_{index}.mgf"))
}

/// Split `source` into balanced chunk files under `out_dir` and write the chunk manifest.
///
/// On any failure the chunk files written so far are removed again.
pub fn split_file(source: &Path, out_dir: &Path, strategy: ChunkStrategy) -> Result<ChunkSet> {
    split_counted(source, out_dir, strategy, count_spectra(source)?)
}

/// `split_file` for a source whose spectra were already counted.
pub(crate) fn split_counted(
    source: &Path,
    out_dir: &Path,
    strategy: ChunkStrategy,
    total: usize,
) -> Result<ChunkSet> {
    let sizes = plan_chunk_sizes(total, strategy)?;
    fs::create_dir_all(out_dir)?;

    let stem = spectra_stem(source);
    let mut written: Vec<PathBuf> = Vec::new();
    let result = write_chunks(source, out_dir, &stem, &sizes, &mut written).and_then(|chunks| {
        let mut set = ChunkSet {
            source: source.to_path_buf(),
            total_spectra: total,
            chunks,
            in_place: false,
            manifest: None,
        };
        let manifest = sibling(out_dir, &stem, MANIFEST_SUFFIX);
        written.push(manifest.clone());
        set.save(&manifest)?;
        Ok(set)
    });

    match result {
        Ok(set) => {
            info!(
                source = %source.display(),
                spectra = total,
                chunks = set.len(),
                "split spectra file"
            );
            Ok(set)
        }
        Err(e) => {
            for p in &written {
                remove_quietly(p);
            }
            Err(e)
        }
    }
}

fn write_chunks(
    source: &Path,
    out_dir: &Path,
    stem: &str,
    sizes: &[usize],
    written: &mut Vec<PathBuf>,
) -> Result<Vec<ChunkDescriptor>> {
    let offsets = chunk_offsets(sizes);
    let mut scanner = MgfScanner::new(open_spectra(source)?);
    let mut chunks = Vec::with_capacity(sizes.len());

    for (i, (&size, &offset)) in sizes.iter().zip(offsets.iter()).enumerate() {
        let index = i + 1;
        let path = chunk_path(out_dir, stem, index);
        written.push(path.clone());
        let mut w = BufWriter::new(File::create(&path)?);

        for n in 0..size {
            let rec = scanner.next().ok_or_else(|| {
                DenovoError::Format(format!(
                    "{} ended early: chunk {index} got {n} of {size} spectra",
                    source.display()
                ))
            })??;
            // The header is only known once the first record has been read.
            if n == 0 {
                for h in scanner.header() {
                    writeln!(w, "{h}")?;
                }
                if !scanner.header().is_empty() {
                    writeln!(w)?;
                }
            }
            rec.write_to(&mut w)?;
        }
        w.flush()?;
        debug!(chunk = %path.display(), spectra = size, offset, "wrote chunk");

        chunks.push(ChunkDescriptor {
            source: source.to_path_buf(),
            index,
            path,
            spectra: size,
            offset,
        });
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mgf::SpectrumRecord;

    fn mgf(n: usize) -> String {
        let mut s = String::from("MASS=Monoisotopic\n");
        for i in 0..n {
            s.push_str(&format!(
                "BEGIN IONS\nTITLE=spec{i}\nPEPMASS=4{i}0.5\n10{i}.1 5\nEND IONS\n"
            ));
        }
        s
    }

    fn records(path: &Path) -> Vec<SpectrumRecord> {
        MgfScanner::new(open_spectra(path).unwrap())
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn chunks_keep_order_header_and_balance() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("run.mgf");
        fs::write(&src, mgf(7)).unwrap();
        let out = dir.path().join("chunks");

        let set = split_file(&src, &out, ChunkStrategy::Chunks(3)).unwrap();
        assert_eq!(set.total_spectra, 7);
        let sizes: Vec<_> = set.chunks.iter().map(|c| c.spectra).collect();
        assert_eq!(sizes, [3, 2, 2]);
        assert_eq!(set.chunks[2].offset, 5);
        assert_eq!(set.chunks[0].path, out.join("run_1.mgf"));

        let mut titles = Vec::new();
        for c in &set.chunks {
            let text = fs::read_to_string(&c.path).unwrap();
            assert!(text.starts_with("MASS=Monoisotopic\n"));
            let recs = records(&c.path);
            assert_eq!(recs.len(), c.spectra);
            titles.extend(recs.iter().map(|r| r.title().unwrap().to_string()));
        }
        let expected: Vec<_> = (0..7).map(|i| format!("spec{i}")).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn manifest_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("run.mgf");
        fs::write(&src, mgf(4)).unwrap();
        let set = split_file(&src, dir.path(), ChunkStrategy::MaxSpectra(3)).unwrap();
        let manifest = dir.path().join("run.chunks.json");
        assert_eq!(set.manifest.as_deref(), Some(manifest.as_path()));
        assert_eq!(ChunkSet::load(&manifest).unwrap(), set);
    }

    #[test]
    fn failed_split_leaves_no_chunks_behind() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bad.mgf");
        fs::write(&src, format!("{}BEGIN IONS\nTITLE=open\n", mgf(3))).unwrap();
        let out = dir.path().join("chunks");
        assert!(split_file(&src, &out, ChunkStrategy::Chunks(2)).is_err());
        let left: Vec<_> = fs::read_dir(&out)
            .map(|rd| rd.filter_map(|e| e.ok()).collect())
            .unwrap_or_default();
        assert!(left.is_empty());
    }

    #[test]
    fn remove_files_spares_in_place_sources() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("run.mgf");
        fs::write(&src, mgf(2)).unwrap();
        ChunkSet::single(&src, 2).remove_files();
        assert!(src.exists());

        let set = split_file(&src, &dir.path().join("c"), ChunkStrategy::Chunks(2)).unwrap();
        set.remove_files();
        set.remove_files();
        assert!(set.chunks.iter().all(|c| !c.path.exists()));
        assert!(src.exists());
    }
}
