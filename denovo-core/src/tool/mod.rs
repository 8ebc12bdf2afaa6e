use crate::config::SearchSettings;
use crate::error::{DenovoError, Result};
use crate::mgf::spectra_stem;
use crate::result::merge::MergePolicy;
use crate::util::fsx::sibling;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod directag;
pub mod novor;
pub mod pepnovo;
pub mod pnovo;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    PepNovo,
    DirecTag,
    PNovo,
    Novor,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [Self::PepNovo, Self::DirecTag, Self::PNovo, Self::Novor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PepNovo => "pepnovo",
            Self::DirecTag => "directag",
            Self::PNovo => "pnovo",
            Self::Novor => "novor",
        }
    }

    pub fn result_suffix(&self) -> &'static str {
        match self {
            Self::PepNovo => ".out",
            Self::DirecTag => ".tags",
            Self::PNovo => ".pnovo.txt",
            Self::Novor => ".novor.csv",
        }
    }

    pub fn default_executable(&self) -> &'static str {
        match self {
            Self::PepNovo if cfg!(windows) => "PepNovo.exe",
            Self::PepNovo => "PepNovo_bin",
            Self::DirecTag if cfg!(windows) => "directag.exe",
            Self::DirecTag => "directag",
            Self::PNovo => "pNovoplus.exe",
            Self::Novor if cfg!(windows) => "novor.bat",
            Self::Novor => "novor.sh",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = DenovoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pepnovo" | "pepnovo+" => Ok(Self::PepNovo),
            "directag" => Ok(Self::DirecTag),
            "pnovo" | "pnovo+" => Ok(Self::PNovo),
            "novor" => Ok(Self::Novor),
            other => Err(DenovoError::Config(format!("unknown tool: {other}"))),
        }
    }
}

/// A fully resolved external command for one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// When set, the tool reports on stdout and stdout is written here.
    pub capture: Option<PathBuf>,
    /// Result file the tool leaves behind (equal to `capture` for stdout tools).
    pub output: PathBuf,
    /// Parameter files written before launch.
    pub support_files: Vec<(PathBuf, String)>,
    /// Stdout line prefix that marks one processed spectrum.
    pub progress_marker: Option<&'static str>,
}

impl Invocation {
    pub fn command_line(&self) -> String {
        let mut s = self.program.display().to_string();
        for a in &self.args {
            s.push(' ');
            if a.contains(' ') {
                s.push('"');
                s.push_str(a);
                s.push('"');
            } else {
                s.push_str(a);
            }
        }
        s
    }
}

pub trait SequencingTool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn merge_policy(&self) -> MergePolicy;

    fn invocation(
        &self,
        settings: &SearchSettings,
        chunk: &Path,
        out_dir: &Path,
    ) -> Result<Invocation>;

    fn result_path(&self, chunk: &Path, out_dir: &Path) -> PathBuf {
        sibling(out_dir, &spectra_stem(chunk), self.kind().result_suffix())
    }
}

pub fn tool_for(kind: ToolKind) -> Box<dyn SequencingTool> {
    match kind {
        ToolKind::PepNovo => Box::new(pepnovo::PepNovo),
        ToolKind::DirecTag => Box::new(directag::DirecTag),
        ToolKind::PNovo => Box::new(pnovo::PNovo),
        ToolKind::Novor => Box::new(novor::Novor),
    }
}

pub(crate) fn path_arg(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

/// Directory the tool runs in: next to the binary when it is given as a path.
pub(crate) fn tool_home(settings: &SearchSettings, fallback: &Path) -> PathBuf {
    settings
        .executable
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf())
}
