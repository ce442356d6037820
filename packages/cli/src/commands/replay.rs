use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use markweave_daemon::dom::parse_fragment;
use markweave_daemon::{resolve, Address, Daemon, DaemonConfig, Operation, Surface};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Canonical HTML file to start from
    #[arg(long)]
    pub html: PathBuf,

    /// JSON edit script applied to the live surface
    #[arg(long)]
    pub script: PathBuf,

    /// Print the compiled operation log as JSON
    #[arg(long)]
    pub ops: bool,

    /// Flush after every edit instead of once at the end
    #[arg(long)]
    pub flush_each: bool,
}

/// One scripted user edit, addressed against the live surface
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "edit", rename_all = "camelCase")]
pub enum Edit {
    /// `textContent` assignment on the addressed node
    SetText { path: Address, text: String },
    #[serde(rename_all = "camelCase")]
    InsertHtml {
        parent: Address,
        #[serde(default)]
        before: Option<Address>,
        html: String,
    },
    Remove { path: Address },
}

/// What a replayed script produced
#[derive(Debug)]
pub struct ReplayOutcome {
    pub edits: usize,
    pub operations: Vec<Operation>,
    pub html: String,
}

pub fn replay(args: ReplayArgs, config: DaemonConfig) -> Result<()> {
    let outcome = replay_files(&args, config)?;

    if args.ops {
        println!("{}", serde_json::to_string_pretty(&outcome.operations)?);
    }
    println!("{}", outcome.html);

    eprintln!(
        "{} {} edits → {} operations",
        "✓".green(),
        outcome.edits,
        outcome.operations.len()
    );
    Ok(())
}

/// Loads the document and script named in `args` and runs them
pub fn replay_files(args: &ReplayArgs, config: DaemonConfig) -> Result<ReplayOutcome> {
    let source = fs::read_to_string(&args.html)
        .with_context(|| format!("reading {}", args.html.display()))?;
    let script = fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let edits: Vec<Edit> = serde_json::from_str(&script)
        .with_context(|| format!("parsing script {}", args.script.display()))?;

    let mut daemon = Daemon::from_html(config, &source)?;
    let operations = run_script(&mut daemon, &edits, args.flush_each)?;

    Ok(ReplayOutcome {
        edits: edits.len(),
        operations,
        html: daemon.canonical_html(),
    })
}

/// Applies `edits` through the daemon and returns every operation it flushed
pub fn run_script(daemon: &mut Daemon, edits: &[Edit], flush_each: bool) -> Result<Vec<Operation>> {
    let mut operations = Vec::new();

    for (index, edit) in edits.iter().enumerate() {
        daemon
            .edit(|surface| apply_edit(surface, edit))?
            .map_err(|e| anyhow!("edit {}: {}", index + 1, e))?;

        if flush_each {
            if let Some(report) = daemon.sync_now() {
                operations.extend(report.operations);
            }
        }
    }
    if let Some(report) = daemon.sync_now() {
        operations.extend(report.operations);
    }

    info!(edits = edits.len(), operations = operations.len(), "script replayed");
    Ok(operations)
}

fn apply_edit(surface: &mut Surface, edit: &Edit) -> Result<()> {
    let root = surface.root();
    let locate = |surface: &Surface, address: &Address| {
        resolve(surface.dom(), root, address).ok_or_else(|| anyhow!("no node at {}", address))
    };

    match edit {
        Edit::SetText { path, text } => {
            let node = locate(surface, path)?;
            surface.dom_mut().set_text_content(node, text)?;
        }
        Edit::InsertHtml { parent, before, html } => {
            let parent = locate(surface, parent)?;
            let before = before.as_ref().map(|b| locate(surface, b)).transpose()?;
            let dom = surface.dom_mut();
            let nodes = parse_fragment(dom, html)?;
            dom.insert_all(parent, &nodes, before)?;
        }
        Edit::Remove { path } => {
            if path.is_root() {
                return Err(anyhow!("cannot remove the root"));
            }
            let node = locate(surface, path)?;
            surface.dom_mut().detach(node)?;
        }
    }
    Ok(())
}
