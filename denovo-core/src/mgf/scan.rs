use crate::error::{DenovoError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

pub const BEGIN_IONS: &str = "BEGIN IONS";
pub const END_IONS: &str = "END IONS";

/// One `BEGIN IONS` .. `END IONS` block, plus any non-blank lines that sat
/// between it and the previous block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpectrumRecord {
    pub lines: Vec<String>,
}

impl SpectrumRecord {
    pub fn title(&self) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|l| l.trim_start().strip_prefix("TITLE="))
    }

    /// Writes the record followed by one blank separator line.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for l in &self.lines {
            w.write_all(l.as_bytes())?;
            w.write_all(b"\n")?;
        }
        w.write_all(b"\n")
    }
}

pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zst"))
}

/// Open a spectra file for line reading; `.zst` inputs are decompressed on the fly.
pub fn open_spectra(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let f = File::open(path)?;
    if is_compressed(path) {
        let dec = zstd::stream::Decoder::new(f)?;
        Ok(Box::new(BufReader::new(dec)))
    } else {
        Ok(Box::new(BufReader::with_capacity(1 << 16, f)))
    }
}

/// Streaming MGF record reader. Only one record is held in memory at a time.
pub struct MgfScanner<R: BufRead> {
    reader: R,
    buf: String,
    line_no: u64,
    header: Vec<String>,
    header_done: bool,
    pending: Vec<String>,
    failed: bool,
}

impl<R: BufRead> MgfScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
            header: Vec::new(),
            header_done: false,
            pending: Vec::new(),
            failed: false,
        }
    }

    /// Global parameter lines found before the first record. Complete once the
    /// first record has been yielded (or the input turned out to hold none).
    pub fn header(&self) -> &[String] {
        &self.header
    }

    fn next_line(&mut self) -> std::io::Result<bool> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        let trimmed = self.buf.trim_end_matches(['\n', '\r']).len();
        self.buf.truncate(trimmed);
        Ok(true)
    }

    fn scan_record(&mut self) -> Result<Option<SpectrumRecord>> {
        let mut current: Option<(u64, Vec<String>)> = None;
        loop {
            if !self.next_line()? {
                if let Some((start, _)) = current {
                    return Err(DenovoError::Format(format!(
                        "unterminated spectrum starting at line {start}"
                    )));
                }
                if !self.header_done {
                    self.header = std::mem::take(&mut self.pending);
                    self.header_done = true;
                } else if !self.pending.is_empty() {
                    tracing::warn!(
                        lines = self.pending.len(),
                        "ignoring trailing lines after the last spectrum"
                    );
                    self.pending.clear();
                }
                return Ok(None);
            }

            let line = self.buf.trim();
            if line == BEGIN_IONS {
                if current.is_some() {
                    return Err(DenovoError::Format(format!(
                        "line {}: {BEGIN_IONS} inside an open spectrum",
                        self.line_no
                    )));
                }
                let mut lines = if self.header_done {
                    std::mem::take(&mut self.pending)
                } else {
                    self.header = std::mem::take(&mut self.pending);
                    self.header_done = true;
                    Vec::new()
                };
                lines.push(self.buf.clone());
                current = Some((self.line_no, lines));
            } else if line == END_IONS {
                match current.take() {
                    Some((_, mut lines)) => {
                        lines.push(self.buf.clone());
                        return Ok(Some(SpectrumRecord { lines }));
                    }
                    None => {
                        return Err(DenovoError::Format(format!(
                            "line {}: {END_IONS} without {BEGIN_IONS}",
                            self.line_no
                        )));
                    }
                }
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(self.buf.clone());
            } else if !line.is_empty() {
                self.pending.push(self.buf.clone());
            }
        }
    }
}

impl<R: BufRead> Iterator for MgfScanner<R> {
    type Item = Result<SpectrumRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.scan_record() {
            Ok(Some(r)) => Some(Ok(r)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Number of complete spectra in `path`.
pub fn count_spectra(path: &Path) -> Result<usize> {
    let mut n = 0usize;
    for rec in MgfScanner::new(open_spectra(path)?) {
        rec?;
        n += 1;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MASS=Monoisotopic\nCHARGE=2+\n\nBEGIN IONS\nTITLE=a\nPEPMASS=500.2\n100.1 20\nEND IONS\n\n\
        BEGIN IONS\r\nTITLE=b\r\n200.2 30\r\nEND IONS\r\n";

    #[test]
    fn separates_header_from_records() {
        let mut sc = MgfScanner::new(SAMPLE.as_bytes());
        let first = sc.next().unwrap().unwrap();
        assert_eq!(sc.header(), &["MASS=Monoisotopic", "CHARGE=2+"]);
        assert_eq!(first.title(), Some("a"));
        assert_eq!(first.lines.first().map(String::as_str), Some("BEGIN IONS"));
        let second = sc.next().unwrap().unwrap();
        assert_eq!(second.lines, ["BEGIN IONS", "TITLE=b", "200.2 30", "END IONS"]);
        assert!(sc.next().is_none());
    }

    #[test]
    fn stray_lines_travel_with_next_record() {
        let text = "BEGIN IONS\nEND IONS\nCOM=between\n\nBEGIN IONS\nTITLE=x\nEND IONS\n";
        let recs: Vec<_> = MgfScanner::new(text.as_bytes())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].lines[0], "COM=between");
    }

    #[test]
    fn unterminated_record_is_a_format_error() {
        let text = "BEGIN IONS\nTITLE=a\nEND IONS\nBEGIN IONS\nTITLE=b\n";
        let mut sc = MgfScanner::new(text.as_bytes());
        assert!(sc.next().unwrap().is_ok());
        let err = sc.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("unterminated spectrum starting at line 4"));
        assert!(sc.next().is_none());
    }

    #[test]
    fn orphan_end_marker_is_rejected() {
        let mut sc = MgfScanner::new("TITLE=a\nEND IONS\n".as_bytes());
        assert!(matches!(sc.next(), Some(Err(DenovoError::Format(_)))));
    }

    #[test]
    fn header_only_input_has_no_records() {
        let mut sc = MgfScanner::new("MASS=Average\n".as_bytes());
        assert!(sc.next().is_none());
        assert_eq!(sc.header(), &["MASS=Average"]);
    }

    #[test]
    fn counts_plain_and_zstd_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("s.mgf");
        std::fs::write(&plain, SAMPLE).unwrap();
        assert_eq!(count_spectra(&plain).unwrap(), 2);

        let packed = dir.path().join("s.mgf.zst");
        let data = zstd::stream::encode_all(SAMPLE.as_bytes(), 3).unwrap();
        std::fs::write(&packed, data).unwrap();
        assert_eq!(count_spectra(&packed).unwrap(), 2);
    }
}
