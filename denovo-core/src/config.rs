use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::chunking::plan::ChunkStrategy;
use crate::error::{DenovoError, Result};
use crate::tool::ToolKind;

/// Search settings shared by every tool, plus one section per tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SearchSettings {
    pub tool: ToolKind,
    /// Path to the sequencer binary. A bare name is resolved through `PATH`.
    pub executable: PathBuf,
    /// Worker threads, i.e. external processes running side by side.
    pub threads: Option<usize>,
    /// Cap on spectra per chunk. When unset the input is split into `threads` chunks.
    pub max_spectra_per_chunk: Option<usize>,
    pub output_dir: Option<PathBuf>,
    /// Where chunk files are written. Defaults to `<stem>_chunks` in the output directory.
    pub chunk_dir: Option<PathBuf>,
    pub keep_chunk_files: bool,
    /// Fragment ion tolerance in Da.
    pub fragment_tolerance: f64,
    /// Precursor tolerance in Da.
    pub precursor_tolerance: f64,
    pub max_charge: u8,
    pub num_solutions: u32,
    /// Appended verbatim to every invocation.
    pub extra_args: Vec<String>,
    pub pepnovo: PepNovoSettings,
    pub directag: DirecTagSettings,
    pub pnovo: PNovoSettings,
    pub novor: NovorSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PepNovoSettings {
    pub model: String,
    pub model_dir: Option<PathBuf>,
    /// PTM tokens in PepNovo+ notation, e.g. `C+57` or `M+16`.
    pub ptms: Vec<String>,
    pub use_spectrum_charge: bool,
    pub use_spectrum_mz: bool,
    pub no_quality_filter: bool,
    pub correct_pm: bool,
}

impl Default for PepNovoSettings {
    fn default() -> Self {
        Self {
            model: "CID_IT_TRYP".to_string(),
            model_dir: None,
            ptms: vec!["C+57".to_string()],
            use_spectrum_charge: false,
            use_spectrum_mz: false,
            no_quality_filter: false,
            correct_pm: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DirecTagSettings {
    pub tag_length: u32,
    pub max_tag_count: u32,
    /// `-DynamicMods` value, e.g. `M * 15.994915`.
    pub dynamic_mods: Option<String>,
    /// `-StaticMods` value, e.g. `C 57.021464`.
    pub static_mods: Option<String>,
}

impl Default for DirecTagSettings {
    fn default() -> Self {
        Self {
            tag_length: 3,
            max_tag_count: 10,
            dynamic_mods: None,
            static_mods: Some("C 57.021464".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PNovoSettings {
    /// `enzyme=` line of the parameter file, e.g. `KR C`.
    pub enzyme: String,
    pub activation: String,
    /// Fixed modification lines, e.g. `C=160.030649`.
    pub fixed_mods: Vec<String>,
    /// Variable modification lines, e.g. `m=147.035385`.
    pub variable_mods: Vec<String>,
}

impl Default for PNovoSettings {
    fn default() -> Self {
        Self {
            enzyme: "KR C".to_string(),
            activation: "HCD".to_string(),
            fixed_mods: vec!["C=160.030649".to_string()],
            variable_mods: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct NovorSettings {
    pub enzyme: String,
    pub fragmentation: String,
    pub mass_analyzer: String,
    pub fixed_mods: Vec<String>,
    pub variable_mods: Vec<String>,
}

impl Default for NovorSettings {
    fn default() -> Self {
        Self {
            enzyme: "Trypsin".to_string(),
            fragmentation: "HCD".to_string(),
            mass_analyzer: "Trap".to_string(),
            fixed_mods: vec!["Carbamidomethyl (C)".to_string()],
            variable_mods: vec!["Oxidation (M)".to_string()],
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            tool: ToolKind::PepNovo,
            executable: PathBuf::from(ToolKind::PepNovo.default_executable()),
            threads: None,
            max_spectra_per_chunk: None,
            output_dir: None,
            chunk_dir: None,
            keep_chunk_files: false,
            fragment_tolerance: 0.5,
            precursor_tolerance: 2.5,
            max_charge: 4,
            num_solutions: 10,
            extra_args: Vec::new(),
            pepnovo: PepNovoSettings::default(),
            directag: DirecTagSettings::default(),
            pnovo: PNovoSettings::default(),
            novor: NovorSettings::default(),
        }
    }
}

impl SearchSettings {
    /// Default settings for `tool`, with the executable set to the tool's usual binary name.
    pub fn for_tool(tool: ToolKind) -> Self {
        Self {
            tool,
            executable: PathBuf::from(tool.default_executable()),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path)?;
        let settings: SearchSettings = serde_json::from_reader(BufReader::new(f))?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.write_all(b"\n")?;
        w.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            return Err(DenovoError::Config("executable is empty".into()));
        }
        // Bare names are looked up on PATH at spawn time.
        if self.executable.components().count() > 1 && !self.executable.exists() {
            return Err(DenovoError::Config(format!(
                "executable not found: {}",
                self.executable.display()
            )));
        }
        if self.threads == Some(0) {
            return Err(DenovoError::Config("threads must be at least 1".into()));
        }
        if self.max_spectra_per_chunk == Some(0) {
            return Err(DenovoError::Config(
                "max-spectra-per-chunk must be at least 1".into(),
            ));
        }
        if !(self.fragment_tolerance > 0.0) || !(self.precursor_tolerance > 0.0) {
            return Err(DenovoError::Config("tolerances must be positive".into()));
        }
        if self.max_charge == 0 {
            return Err(DenovoError::Config("max-charge must be at least 1".into()));
        }
        if self.num_solutions == 0 {
            return Err(DenovoError::Config("num-solutions must be at least 1".into()));
        }
        Ok(())
    }

    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn chunk_strategy(&self) -> ChunkStrategy {
        match self.max_spectra_per_chunk {
            Some(n) => ChunkStrategy::MaxSpectra(n),
            None => ChunkStrategy::Chunks(self.effective_threads()),
        }
    }
}

impl std::fmt::Display for SearchSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "\n---- Search Settings ----\n\
            tool: {}\n\
            executable: {}\n\
            threads: {}\n\
            max_spectra_per_chunk: {:?}\n\
            fragment_tolerance: {}\n\
            precursor_tolerance: {}\n\
            max_charge: {}\n\
            num_solutions: {}\n\
            keep_chunk_files: {}\n\
            -------------------------",
            self.tool,
            self.executable.display(),
            self.effective_threads(),
            self.max_spectra_per_chunk,
            self.fragment_tolerance,
            self.precursor_tolerance,
            self.max_charge,
            self.num_solutions,
            self.keep_chunk_files,
        )
    }
}
