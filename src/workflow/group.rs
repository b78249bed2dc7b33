//! Workflow group step.
//!
//! Builds the case root the splitter expects from a pile of loose volumes.
use crate::cli::GroupArgs;
use anyhow::{anyhow, Context, Result};
use medsplit::group::{execute_groups, plan_groups, scan_volumes, GroupOptions, IdRule};
use medsplit::util::{display_path, is_within, parse_ext_list, DEFAULT_VOLUME_EXTS};

pub(crate) fn run_group(args: &GroupArgs) -> Result<()> {
    if is_within(&args.dest, &args.source) {
        return Err(anyhow!(
            "destination {} must not be inside the source {}",
            args.dest.display(),
            args.source.display()
        ));
    }
    let rule = id_rule(args)?;
    let exts = match args.ext.as_deref() {
        Some(text) => parse_ext_list(text),
        None => DEFAULT_VOLUME_EXTS.iter().map(|ext| ext.to_string()).collect(),
    };
    if exts.is_empty() {
        return Err(anyhow!("--ext must name at least one extension"));
    }

    let volumes = scan_volumes(&args.source, &exts)?;
    let plan = plan_groups(&volumes, &rule, &exts);
    tracing::info!(
        files = plan.file_count(),
        groups = plan.groups.len(),
        rejected = plan.rejected.len(),
        deep = plan.deep_files,
        "planned groups"
    );
    let report = execute_groups(
        &plan,
        &args.dest,
        GroupOptions {
            overwrite: args.overwrite,
            dry_run: args.dry_run,
        },
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let verb = if args.dry_run { "would copy" } else { "copied" };
        println!(
            "{verb} {} files into {} case directories under {}",
            report.copied.len(),
            report.groups,
            args.dest.display()
        );
        for file in report.copied.iter().filter(|file| file.renamed) {
            println!(
                "  renamed {} -> {}",
                display_path(&file.source, Some(&args.source)),
                display_path(&file.destination, Some(&args.dest))
            );
        }
        for rejected in &report.rejected {
            println!(
                "  skipped {}: {}",
                display_path(&rejected.path, Some(&args.source)),
                rejected.reason
            );
        }
        for failure in &report.failures {
            println!(
                "  failed {}: {}",
                display_path(&failure.source, Some(&args.source)),
                failure.error
            );
        }
    }
    if report.has_errors() {
        return Err(anyhow!("{} file(s) failed to copy", report.failures.len()));
    }
    Ok(())
}

fn id_rule(args: &GroupArgs) -> Result<IdRule> {
    if let Some(slice) = args.slice.as_deref() {
        let (start, end) = slice
            .split_once(':')
            .ok_or_else(|| anyhow!("--slice must look like START:END (got {slice:?})"))?;
        let start = start
            .trim()
            .parse::<usize>()
            .with_context(|| format!("parse slice start {start:?}"))?;
        let end = end
            .trim()
            .parse::<usize>()
            .with_context(|| format!("parse slice end {end:?}"))?;
        return IdRule::slice(start, end);
    }
    if let (Some(snippet), Some(example)) = (args.snippet.as_deref(), args.example.as_deref()) {
        return IdRule::from_snippet(example, snippet);
    }
    if let Some(pattern) = args.id_regex.as_deref() {
        return IdRule::regex(pattern);
    }
    Err(anyhow!(
        "choose an id rule: --slice START:END, --snippet TEXT --example NAME, or --id-regex RE"
    ))
}
