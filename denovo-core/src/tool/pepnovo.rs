use super::{Invocation, SequencingTool, ToolKind, path_arg, tool_home};
use crate::config::SearchSettings;
use crate::error::Result;
use crate::result::line::SPECTRUM_SEPARATOR;
use crate::result::merge::MergePolicy;
use std::path::Path;

/// PepNovo+ prints its results on stdout, one `>>` block per spectrum.
pub struct PepNovo;

impl SequencingTool for PepNovo {
    fn kind(&self) -> ToolKind {
        ToolKind::PepNovo
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::PepNovo
    }

    fn invocation(
        &self,
        settings: &SearchSettings,
        chunk: &Path,
        out_dir: &Path,
    ) -> Result<Invocation> {
        let p = &settings.pepnovo;
        let mut args = vec![
            "-file".to_string(),
            path_arg(chunk),
            "-model".to_string(),
            p.model.clone(),
            "-fragment_tolerance".to_string(),
            settings.fragment_tolerance.to_string(),
            "-pm_tolerance".to_string(),
            settings.precursor_tolerance.to_string(),
            "-num_solutions".to_string(),
            settings.num_solutions.to_string(),
        ];
        if let Some(dir) = &p.model_dir {
            args.push("-model_dir".to_string());
            args.push(path_arg(dir));
        }
        if !p.ptms.is_empty() {
            args.push("-PTMs".to_string());
            args.push(p.ptms.join(":"));
        }
        for (on, flag) in [
            (p.use_spectrum_charge, "-use_spectrum_charge"),
            (p.use_spectrum_mz, "-use_spectrum_mz"),
            (p.no_quality_filter, "-no_quality_filter"),
            (p.correct_pm, "-correct_pm"),
        ] {
            if on {
                args.push(flag.to_string());
            }
        }
        args.extend(settings.extra_args.iter().cloned());

        let output = self.result_path(chunk, out_dir);
        Ok(Invocation {
            program: settings.executable.clone(),
            args,
            // PepNovo+ resolves its Models folder relative to the binary
            working_dir: tool_home(settings, out_dir),
            capture: Some(output.clone()),
            output,
            support_files: Vec::new(),
            progress_marker: Some(SPECTRUM_SEPARATOR),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builds_stdout_capturing_command() {
        let mut s = SearchSettings {
            executable: PathBuf::from("/opt/pepnovo/PepNovo_bin"),
            extra_args: vec!["-digest".into(), "TRYPSIN".into()],
            ..Default::default()
        };
        s.pepnovo.ptms = vec!["C+57".into(), "M+16".into()];
        s.pepnovo.correct_pm = true;
        let inv = PepNovo
            .invocation(&s, Path::new("/w/run_1.mgf"), Path::new("/res"))
            .unwrap();
        assert_eq!(inv.working_dir, PathBuf::from("/opt/pepnovo"));
        assert_eq!(inv.capture.as_deref(), Some(Path::new("/res/run_1.out")));
        assert_eq!(inv.output, PathBuf::from("/res/run_1.out"));
        assert_eq!(inv.progress_marker, Some(">>"));
        assert_eq!(
            inv.command_line(),
            "/opt/pepnovo/PepNovo_bin -file /w/run_1.mgf -model CID_IT_TRYP \
             -fragment_tolerance 0.5 -pm_tolerance 2.5 -num_solutions 10 \
             -PTMs C+57:M+16 -correct_pm -digest TRYPSIN"
        );
    }

    #[test]
    fn bare_executable_runs_in_output_dir() {
        let s = SearchSettings::default();
        let inv = PepNovo
            .invocation(&s, Path::new("run.mgf"), Path::new("/res"))
            .unwrap();
        assert_eq!(inv.working_dir, PathBuf::from("/res"));
    }
}
