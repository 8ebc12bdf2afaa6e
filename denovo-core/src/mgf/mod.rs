use std::path::Path;

pub mod scan;

pub use scan::{MgfScanner, SpectrumRecord, count_spectra, is_compressed, open_spectra};

/// File stem with the spectra extensions removed: `run1.mgf.zst` -> `run1`.
pub fn spectra_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut stem = name.as_str();
    for ext in [".zst", ".mgf"] {
        let cut = stem.len().saturating_sub(ext.len());
        if cut > 0 && stem.get(cut..).is_some_and(|t| t.eq_ignore_ascii_case(ext)) {
            stem = &stem[..cut];
        }
    }
    stem.to_string()
}

pub fn is_spectra_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".mgf") || name.ends_with(".mgf.zst")
}
