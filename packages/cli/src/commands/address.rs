use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use markweave_daemon::dom::serialize_node;
use markweave_daemon::{address_of, resolve, Address, Surface};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Canonical HTML file
    #[arg(long)]
    pub html: PathBuf,

    /// Address to resolve, e.g. `/p[2]/text()[1]` or `#intro/em[1]`
    #[arg(long)]
    pub path: Option<Address>,
}

pub fn address(args: AddressArgs) -> Result<()> {
    let source = fs::read_to_string(&args.html)?;
    let surface = Surface::from_html(&source)?;

    match args.path {
        Some(path) => println!("{}", describe(&surface, &path)?),
        None => {
            for (address, preview) in list_addresses(&surface) {
                println!("{}  {}", address.bright_blue(), preview.dimmed());
            }
        }
    }

    Ok(())
}

/// HTML of the node at `path`
fn describe(surface: &Surface, path: &Address) -> Result<String> {
    let node = resolve(surface.dom(), surface.root(), path).ok_or_else(|| anyhow!("No node at {}", path))?;
    if path.is_root() {
        Ok(surface.html())
    } else {
        Ok(serialize_node(surface.dom(), node))
    }
}

/// Every addressable node under the root with a one-line preview
fn list_addresses(surface: &Surface) -> Vec<(String, String)> {
    let dom = surface.dom();
    let root = surface.root();
    dom.descendants(root)
        .into_iter()
        .filter_map(|node| {
            let address = address_of(dom, root, node)?;
            let preview = match dom.text(node).filter(|_| dom.is_text(node)) {
                Some(text) => format!("{:?}", text),
                None => format!("<{}>", dom.tag(node).unwrap_or_default()),
            };
            Some((address.to_string(), preview))
        })
        .collect()
}
