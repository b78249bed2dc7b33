//! Workflow rename step.
use crate::cli::RenameArgs;
use anyhow::{anyhow, Context, Result};
use medsplit::group::scan_volumes;
use medsplit::rename::{
    execute_renames, normalize_new_ext, plan_renames, DeleteRule, FileFilter, InsertRule,
    RenameRules,
};
use medsplit::tree::collect_files_recursive;
use medsplit::util::{display_path, parse_ext_list, DEFAULT_VOLUME_EXTS};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub(crate) fn run_rename(args: &RenameArgs) -> Result<()> {
    let rules = rename_rules(args)?;
    let exts = match args.ext.as_deref() {
        Some(text) => parse_ext_list(text),
        None => DEFAULT_VOLUME_EXTS.iter().map(|ext| ext.to_string()).collect(),
    };
    if exts.is_empty() {
        return Err(anyhow!("--ext must name at least one extension"));
    }
    let filter = FileFilter {
        keywords: args.keywords.clone(),
        exact: args.exact,
    };

    let files = scan_volumes(&args.root, &exts)?
        .into_iter()
        .map(|volume| volume.path)
        .filter(|path| filter.matches(path))
        .collect::<Vec<PathBuf>>();
    let existing = collect_files_recursive(&args.root)
        .with_context(|| format!("list {}", args.root.display()))?
        .into_iter()
        .collect::<BTreeSet<_>>();
    let plan = plan_renames(&files, &rules, &exts, &existing);
    tracing::info!(
        files = files.len(),
        renames = plan.renames.len(),
        conflicts = plan.conflicts.len(),
        "planned renames"
    );
    let report = execute_renames(&plan, args.dry_run);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let verb = if args.dry_run { "would rename" } else { "renamed" };
        println!(
            "{verb} {} files under {} ({} unchanged)",
            report.renamed.len(),
            args.root.display(),
            report.unchanged
        );
        for entry in &report.renamed {
            println!(
                "  {} -> {}",
                display_path(&entry.source, Some(&args.root)),
                display_path(&entry.target, Some(&args.root))
            );
        }
        for conflict in &report.conflicts {
            println!(
                "  conflict {} -> {}: {}",
                display_path(&conflict.source, Some(&args.root)),
                display_path(&conflict.target, Some(&args.root)),
                conflict.reason
            );
        }
        for failure in &report.failures {
            println!(
                "  failed {}: {}",
                display_path(&failure.source, Some(&args.root)),
                failure.error
            );
        }
    }
    if report.has_errors() {
        return Err(anyhow!(
            "{} conflict(s), {} failure(s)",
            report.conflicts.len(),
            report.failures.len()
        ));
    }
    Ok(())
}

fn rename_rules(args: &RenameArgs) -> Result<RenameRules> {
    let mut rules = RenameRules::default();
    for item in &args.replacements {
        let (old, new) = item
            .split_once('=')
            .ok_or_else(|| anyhow!("--replace must look like OLD=NEW (got {item:?})"))?;
        if old.is_empty() {
            return Err(anyhow!("--replace needs non-empty text before '=' (got {item:?})"));
        }
        rules.replacements.push((old.to_string(), new.to_string()));
    }
    if let Some(delete) = args.delete.as_deref() {
        let (start, len) = delete
            .split_once(':')
            .ok_or_else(|| anyhow!("--delete must look like START:LEN (got {delete:?})"))?;
        rules.delete = Some(DeleteRule {
            start: start
                .trim()
                .parse()
                .with_context(|| format!("parse delete start {start:?}"))?,
            len: len
                .trim()
                .parse()
                .with_context(|| format!("parse delete length {len:?}"))?,
        });
    }
    if let Some(insert) = args.insert.as_deref() {
        let (position, token) = insert
            .split_once(':')
            .ok_or_else(|| anyhow!("--insert must look like POS:TOKEN (got {insert:?})"))?;
        if token.is_empty() {
            return Err(anyhow!("--insert needs a token after ':'"));
        }
        rules.insert = Some(InsertRule {
            position: position
                .trim()
                .parse()
                .with_context(|| format!("parse insert position {position:?}"))?,
            token: token.to_string(),
        });
    }
    if let Some(ext) = args.new_ext.as_deref() {
        rules.new_ext = Some(normalize_new_ext(ext)?);
    }
    if rules.is_empty() {
        return Err(anyhow!(
            "choose at least one rule: --replace, --delete, --insert, or --new-ext"
        ));
    }
    Ok(rules)
}
