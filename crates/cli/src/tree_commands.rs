use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    clap::Args,
    ragkit_onboarding::{ExclusionSet, effective_stats, validate_tree},
    ragkit_service_traits::DirectoryTreeNode,
};

#[derive(Args)]
pub struct TreeStatsArgs {
    /// JSON file holding a scanned folder tree.
    tree: PathBuf,
    /// Subfolder path to exclude (repeatable).
    #[arg(long)]
    exclude: Vec<String>,
    /// Fail when a node's totals are smaller than its children's.
    #[arg(long)]
    strict: bool,
}

pub fn handle_tree_stats(args: TreeStatsArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.tree)
        .with_context(|| format!("failed to read {}", args.tree.display()))?;
    let tree: DirectoryTreeNode = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a folder tree", args.tree.display()))?;

    if let Err(e) = validate_tree(&tree) {
        if args.strict {
            return Err(e.into());
        }
        tracing::warn!(error = %e, "folder tree totals are inconsistent, stats may be off");
    }

    let excluded: ExclusionSet = args.exclude.into_iter().collect();
    let stats = effective_stats(&tree, &excluded);
    println!("{} files, {:.1} MB", stats.files, stats.size_mb());
    Ok(())
}
