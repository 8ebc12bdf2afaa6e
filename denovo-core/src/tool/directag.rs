use super::{Invocation, SequencingTool, ToolKind, path_arg};
use crate::config::SearchSettings;
use crate::error::Result;
use crate::result::merge::MergePolicy;
use std::path::Path;

/// DirecTag writes `<chunk stem>.tags` into its `-workdir`.
pub struct DirecTag;

impl SequencingTool for DirecTag {
    fn kind(&self) -> ToolKind {
        ToolKind::DirecTag
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::HeaderOnce { prefix: "H" }
    }

    fn invocation(
        &self,
        settings: &SearchSettings,
        chunk: &Path,
        out_dir: &Path,
    ) -> Result<Invocation> {
        let d = &settings.directag;
        let mut args = vec![
            "-workdir".to_string(),
            path_arg(out_dir),
            "-MaxTagCount".to_string(),
            d.max_tag_count.to_string(),
            "-TagLength".to_string(),
            d.tag_length.to_string(),
            "-FragmentMzTolerance".to_string(),
            settings.fragment_tolerance.to_string(),
            "-PrecursorMzTolerance".to_string(),
            settings.precursor_tolerance.to_string(),
            "-NumChargeStates".to_string(),
            settings.max_charge.to_string(),
        ];
        if let Some(mods) = &d.dynamic_mods {
            args.push("-DynamicMods".to_string());
            args.push(mods.clone());
        }
        if let Some(mods) = &d.static_mods {
            args.push("-StaticMods".to_string());
            args.push(mods.clone());
        }
        args.extend(settings.extra_args.iter().cloned());
        args.push(path_arg(chunk));

        Ok(Invocation {
            program: settings.executable.clone(),
            args,
            working_dir: out_dir.to_path_buf(),
            capture: None,
            output: self.result_path(chunk, out_dir),
            support_files: Vec::new(),
            progress_marker: None,
        })
    }
}
