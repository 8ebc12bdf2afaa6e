use super::{Invocation, SequencingTool, ToolKind, path_arg, tool_home};
use crate::config::SearchSettings;
use crate::error::Result;
use crate::mgf::spectra_stem;
use crate::result::merge::MergePolicy;
use crate::util::fsx::sibling;
use std::fmt::Write as _;
use std::path::Path;

/// pNovo+ takes a single parameter file naming input and output.
pub struct PNovo;

fn parameter_file(settings: &SearchSettings, chunk: &Path, output: &Path) -> String {
    let p = &settings.pnovo;
    let mut s = String::from("[Param]\n");
    let _ = writeln!(s, "spec_path1={}", chunk.display());
    let _ = writeln!(s, "out_path={}", output.display());
    let _ = writeln!(s, "activation_type={}", p.activation);
    let _ = writeln!(s, "enzyme={}", p.enzyme);
    let _ = writeln!(s, "pep_tol={}", settings.precursor_tolerance);
    let _ = writeln!(s, "frag_tol={}", settings.fragment_tolerance);
    let _ = writeln!(s, "max_charge={}", settings.max_charge);
    let _ = writeln!(s, "result_num={}", settings.num_solutions);
    s.push_str("#fixed modifications\n");
    for m in &p.fixed_mods {
        let _ = writeln!(s, "{m}");
    }
    s.push_str("#variable modifications\n");
    for m in &p.variable_mods {
        let _ = writeln!(s, "{m}");
    }
    s
}

impl SequencingTool for PNovo {
    fn kind(&self) -> ToolKind {
        ToolKind::PNovo
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Concatenate
    }

    fn invocation(
        &self,
        settings: &SearchSettings,
        chunk: &Path,
        out_dir: &Path,
    ) -> Result<Invocation> {
        let output = self.result_path(chunk, out_dir);
        let params = sibling(out_dir, &spectra_stem(chunk), ".pnovo.param");
        let mut args = vec![path_arg(&params)];
        args.extend(settings.extra_args.iter().cloned());

        Ok(Invocation {
            program: settings.executable.clone(),
            args,
            working_dir: tool_home(settings, out_dir),
            capture: None,
            support_files: vec![(params, parameter_file(settings, chunk, &output))],
            output,
            progress_marker: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_parameter_file_for_chunk() {
        let s = SearchSettings::for_tool(ToolKind::PNovo);
        let inv = PNovo
            .invocation(&s, Path::new("/w/run_1.mgf"), Path::new("/res"))
            .unwrap();
        assert_eq!(inv.args, ["/res/run_1.pnovo.param"]);
        let (path, text) = &inv.support_files[0];
        assert_eq!(path, Path::new("/res/run_1.pnovo.param"));
        assert!(text.contains("spec_path1=/w/run_1.mgf\n"));
        assert!(text.contains("out_path=/res/run_1.pnovo.txt\n"));
        assert!(text.contains("#fixed modifications\nC=160.030649\n"));
    }
}
