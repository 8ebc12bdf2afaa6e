/// PepNovo+ opens every spectrum block with `>> <file> <index> <title>`.
pub const SPECTRUM_SEPARATOR: &str = ">>";
pub const PROGRESS_MARKER: &str = "#Processed";
pub const PROBLEM_MARKER: &str = "#Problem";
/// Written in place of a `#Problem` line; readers treat it as an empty result.
pub const NO_SOLUTIONS: &str = "# No solutions found.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultLine<'a> {
    SpectrumSeparator(&'a str),
    Progress,
    Problem(&'a str),
    Content(&'a str),
}

pub fn classify(line: &str) -> ResultLine<'_> {
    if line.starts_with(SPECTRUM_SEPARATOR) {
        ResultLine::SpectrumSeparator(line)
    } else if line.starts_with(PROGRESS_MARKER) {
        ResultLine::Progress
    } else if line.starts_with(PROBLEM_MARKER) {
        ResultLine::Problem(line)
    } else {
        ResultLine::Content(line)
    }
}

/// Shift the spectrum index of a separator line by `offset` and pin the file
/// column to 0. Lines that do not parse are returned unchanged.
pub fn resequence_separator(line: &str, offset: usize) -> String {
    parse_separator(line)
        .map(|(index, title)| {
            if title.is_empty() {
                format!("{SPECTRUM_SEPARATOR} 0 {}", index + offset)
            } else {
                format!("{SPECTRUM_SEPARATOR} 0 {} {title}", index + offset)
            }
        })
        .unwrap_or_else(|| line.to_string())
}

fn parse_separator(line: &str) -> Option<(usize, &str)> {
    let rest = line.strip_prefix(SPECTRUM_SEPARATOR)?.trim_start();
    let (_file, rest) = rest.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (index, title) = match rest.split_once(char::is_whitespace) {
        Some((i, t)) => (i, t),
        None => (rest, ""),
    };
    Some((index.parse().ok()?, title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_markers() {
        assert!(matches!(classify(">> 0 3 t"), ResultLine::SpectrumSeparator(_)));
        assert_eq!(classify("#Processed 20 spectra"), ResultLine::Progress);
        assert!(matches!(classify("#Problem reading spec"), ResultLine::Problem(_)));
        assert_eq!(classify("#Index\tProb"), ResultLine::Content("#Index\tProb"));
        assert_eq!(classify(""), ResultLine::Content(""));
    }

    #[test]
    fn resequences_index_and_keeps_title() {
        assert_eq!(resequence_separator(">> 0 3 spec three.dta", 10), ">> 0 13 spec three.dta");
        assert_eq!(resequence_separator(">>  2  0", 5), ">> 0 5");
    }

    #[test]
    fn unparsable_separators_pass_through() {
        assert_eq!(resequence_separator(">> broken", 4), ">> broken");
        assert_eq!(resequence_separator(">> 0 x title", 4), ">> 0 x title");
    }
}
