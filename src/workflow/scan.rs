//! Workflow scan step.
use crate::cli::ScanArgs;
use anyhow::Result;
use medsplit::cases::CaseIndex;
use medsplit::util::display_path;

/// List case directories and their file counts.
pub(crate) fn run_scan(args: &ScanArgs) -> Result<()> {
    let index = CaseIndex::scan(&args.root)?;
    let summary = index.summarize()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "{} case directories under {}",
        summary.len(),
        display_path(index.root(), None)
    );
    for case in &summary {
        println!("  {:<32} {:>6} files", case.case_id, case.file_count);
    }
    Ok(())
}
