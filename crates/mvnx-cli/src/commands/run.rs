//! Run command - launch the main class of a coordinate on its classpath

use super::{resolve, ResolveOptions};
use anyhow::{bail, Context, Result};
use mvnx_resolver::{Classpath, FetchMode, MAIN_CLASS_PROPERTY};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub struct RunArgs {
    pub coordinate: String,
    pub main_class: Option<String>,
    pub java: Option<PathBuf>,
    pub args: Vec<String>,
}

/// Resolve, download and run; returns the program's exit code
pub fn run(options: &ResolveOptions, args: RunArgs) -> Result<i32> {
    let mut session = resolve(options, &args.coordinate)?;
    let root = session.resolution.root;
    let classpath = Classpath::assemble(
        &session.resolver,
        &mut session.resolution.graph,
        root,
        &|artifact| options.accepts(artifact),
        FetchMode::Materialize,
    )?;

    let main_class = match args.main_class.as_deref().or(classpath.main_class()) {
        Some(main_class) => main_class.to_string(),
        None => bail!(
            "{} declares no `{}` property; pass --main-class",
            args.coordinate,
            MAIN_CLASS_PROPERTY
        ),
    };

    let java = java_launcher(args.java, std::env::var_os("JAVA_HOME"));
    let mut command = java_command(&java, &classpath.to_path_string(), &main_class, &args.args);
    debug!(?command, "launching");

    let status = command
        .status()
        .with_context(|| format!("Failed to start {}", java.display()))?;
    // Killed by a signal: no code, report generic failure
    Ok(status.code().unwrap_or(1))
}

/// Explicit launcher, else `$JAVA_HOME/bin/java`, else `java` from PATH
fn java_launcher(explicit: Option<PathBuf>, java_home: Option<OsString>) -> PathBuf {
    if let Some(java) = explicit {
        return java;
    }
    match java_home.filter(|home| !home.is_empty()) {
        Some(home) => Path::new(&home).join("bin").join("java"),
        None => PathBuf::from("java"),
    }
}

fn java_command(java: &Path, classpath: &str, main_class: &str, args: &[String]) -> Command {
    let mut command = Command::new(java);
    command
        .arg("-cp")
        .arg(classpath)
        .arg(main_class)
        .args(args);
    command
}
