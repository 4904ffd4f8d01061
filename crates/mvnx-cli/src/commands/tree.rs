//! Tree command - print the resolved dependency tree

use super::{resolve, ResolveOptions};
use anyhow::Result;
use mvnx_resolver::render_tree;

pub fn run(options: &ResolveOptions, coordinate: &str) -> Result<()> {
    let session = resolve(options, coordinate)?;
    let resolution = &session.resolution;
    print!(
        "{}",
        render_tree(&resolution.graph, resolution.root, &|artifact| {
            options.accepts(artifact)
        })
    );
    Ok(())
}
