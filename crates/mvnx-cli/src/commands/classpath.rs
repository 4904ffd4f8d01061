//! Classpath command - print the runtime classpath of a coordinate

use super::{resolve, ResolveOptions};
use anyhow::Result;
use mvnx_resolver::{Classpath, FetchMode};

const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

pub struct ClasspathArgs {
    pub coordinate: String,
    /// Check existence only and report remote URLs for missing jars
    pub probe: bool,
    /// One entry per line
    pub lines: bool,
}

pub fn run(options: &ResolveOptions, args: ClasspathArgs) -> Result<()> {
    let mut session = resolve(options, &args.coordinate)?;
    let mode = if args.probe {
        FetchMode::Probe
    } else {
        FetchMode::Materialize
    };

    let root = session.resolution.root;
    let classpath = Classpath::assemble(
        &session.resolver,
        &mut session.resolution.graph,
        root,
        &|artifact| options.accepts(artifact),
        mode,
    )?;

    println!("{}", format_classpath(&classpath, args.lines));
    Ok(())
}

/// Render entries joined by the path separator, or one per line
///
/// Probed entries that only exist remotely are printed as URLs.
fn format_classpath(classpath: &Classpath, lines: bool) -> String {
    let entries: Vec<String> = classpath
        .entries()
        .iter()
        .map(|entry| entry.location.to_string())
        .collect();
    if lines {
        entries.join("\n")
    } else {
        entries.join(PATH_SEPARATOR)
    }
}
