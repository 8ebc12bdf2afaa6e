use super::{Invocation, SequencingTool, ToolKind, path_arg, tool_home};
use crate::config::SearchSettings;
use crate::error::Result;
use crate::mgf::spectra_stem;
use crate::result::merge::MergePolicy;
use crate::util::fsx::sibling;
use std::path::Path;

pub struct Novor;

fn parameter_file(settings: &SearchSettings) -> String {
    let n = &settings.novor;
    format!(
        "enzyme = {}\n\
         fragmentation = {}\n\
         massAnalyzer = {}\n\
         fragmentIonErrorTol = {}Da\n\
         precursorErrorTol = {}Da\n\
         variableModifications = {}\n\
         fixedModifications = {}\n\
         forbiddenResidues = I,U\n",
        n.enzyme,
        n.fragmentation,
        n.mass_analyzer,
        settings.fragment_tolerance,
        settings.precursor_tolerance,
        n.variable_mods.join(", "),
        n.fixed_mods.join(", "),
    )
}

impl SequencingTool for Novor {
    fn kind(&self) -> ToolKind {
        ToolKind::Novor
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::HeaderOnce { prefix: "#" }
    }

    fn invocation(
        &self,
        settings: &SearchSettings,
        chunk: &Path,
        out_dir: &Path,
    ) -> Result<Invocation> {
        let output = self.result_path(chunk, out_dir);
        let params = sibling(out_dir, &spectra_stem(chunk), ".novor.params");
        let mut args = vec![
            "-f".to_string(),
            "-p".to_string(),
            path_arg(&params),
            "-o".to_string(),
            path_arg(&output),
        ];
        args.extend(settings.extra_args.iter().cloned());
        args.push(path_arg(chunk));

        Ok(Invocation {
            program: settings.executable.clone(),
            args,
            working_dir: tool_home(settings, out_dir),
            capture: None,
            support_files: vec![(params, parameter_file(settings))],
            output,
            progress_marker: None,
        })
    }
}
