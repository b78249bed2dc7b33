use crate::cli::SplitInputs;
use anyhow::Result;
use medsplit::config::{default_config, load_config, SplitConfig};
use medsplit::{ExecuteOptions, ManifestOptions, SplitRequest, TransferMode};

/// Resolved settings for a `plan` or `split` invocation.
pub(crate) struct SplitContext {
    pub(crate) config: SplitConfig,
    pub(crate) request: SplitRequest,
}

impl SplitContext {
    /// Merge the optional config file under explicit flags.
    pub(crate) fn load(
        inputs: &SplitInputs,
        mode: Option<TransferMode>,
        dry_run: bool,
    ) -> Result<Self> {
        let config = match inputs.config.as_deref() {
            Some(path) => load_config(path)?,
            None => default_config(),
        };
        let manifest = ManifestOptions {
            id_column: inputs
                .id_column
                .clone()
                .unwrap_or_else(|| config.id_column.clone()),
            split_column: inputs
                .split_column
                .clone()
                .unwrap_or_else(|| config.split_column.clone()),
            match_mode: inputs.match_mode.unwrap_or(config.match_mode),
        };
        let execute = ExecuteOptions {
            mode: mode.unwrap_or(config.mode),
            compare: inputs.compare.unwrap_or(config.compare),
            dry_run,
        };
        let request = SplitRequest {
            case_root: inputs.root.clone(),
            manifest_path: inputs.manifest.clone(),
            destination_root: inputs.dest.clone(),
            manifest,
            execute,
        };
        Ok(Self { config, request })
    }
}
