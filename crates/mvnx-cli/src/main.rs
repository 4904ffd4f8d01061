use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

mod commands;

use commands::ResolveOptions;

/// Resolve Maven artifacts into runnable classpaths.
///
/// mvnx reads POM documents from the local Maven repository or remote
/// repositories and computes the dependency graph of a coordinate: parent
/// inheritance, dependency management, BOM imports, scopes and properties.
/// No Maven installation is required.
///
/// EXAMPLES:
///     mvnx classpath org.slf4j:slf4j-api:1.7.30     Print the classpath
///     mvnx tree junit:junit:4.10                    Show the dependency tree
///     mvnx run com.example:tool:1.0 -- --help       Run the artifact's main class
///
/// ENVIRONMENT VARIABLES:
///     MVNX_REPOSITORIES       Comma separated remote repository URLs
///     MVNX_LOCAL_REPOSITORY   Local repository root
///     MVNX_TIMEOUT_SECS       Per-request timeout in seconds
///     RUST_LOG                Log filter (e.g. mvnx_resolver=debug)
#[derive(Parser)]
#[command(name = "mvnx")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
struct GlobalArgs {
    /// Remote repository URLs, searched in order
    #[arg(long, global = true, value_delimiter = ',')]
    repositories: Option<Vec<String>>,

    /// Maven settings.xml used to discover the local repository
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Local repository root (skips settings.xml discovery)
    #[arg(long, global = true)]
    local_repository: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Property for ${...} templating, as key=value (repeatable)
    #[arg(short = 'D', global = true, value_name = "KEY=VALUE", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// Keep test-scoped dependencies
    #[arg(long, global = true)]
    include_test: bool,

    /// Keep provided-scoped dependencies
    #[arg(long, global = true)]
    include_provided: bool,

    /// Keep optional dependencies
    #[arg(long, global = true)]
    include_optional: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// No progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the classpath of a coordinate
    ///
    /// Resolves the coordinate and prints its runtime classpath. Jars are
    /// downloaded into the local repository unless --probe is given.
    ///
    /// EXAMPLES:
    ///     mvnx classpath org.slf4j:slf4j-api:1.7.30
    ///     mvnx classpath junit:junit:4.10 --lines
    ///     mvnx classpath junit:junit:4.10 --probe
    #[command(visible_alias = "cp")]
    Classpath {
        /// groupId:artifactId[:packaging[:classifier]]:version
        coordinate: String,
        /// Only check that jars exist; print remote URLs instead of downloading
        #[arg(long)]
        probe: bool,
        /// One entry per line instead of a joined path
        #[arg(long)]
        lines: bool,
    },

    /// Print the resolved dependency tree
    ///
    /// EXAMPLES:
    ///     mvnx tree junit:junit:4.10
    ///     mvnx tree junit:junit:4.10 --include-test
    Tree {
        /// groupId:artifactId[:packaging[:classifier]]:version
        coordinate: String,
    },

    /// Run the main class of a coordinate
    ///
    /// Downloads the classpath and starts `java -cp <classpath> <main class>`.
    /// The main class defaults to the `mainClass` property of the POM.
    /// Arguments after `--` are passed to the program.
    ///
    /// EXAMPLES:
    ///     mvnx run com.example:tool:1.0
    ///     mvnx run com.example:tool:1.0 --main-class com.example.Other -- -x
    #[command(visible_alias = "r")]
    Run {
        /// groupId:artifactId[:packaging[:classifier]]:version
        coordinate: String,
        /// Entry point; overrides the POM's mainClass property
        #[arg(long)]
        main_class: Option<String>,
        /// Java launcher (defaults to $JAVA_HOME/bin/java, then java)
        #[arg(long, env = "MVNX_JAVA")]
        java: Option<PathBuf>,
        /// Arguments for the program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Generate shell completion scripts
    ///
    /// EXAMPLES:
    ///     mvnx completions bash > ~/.local/share/bash-completion/completions/mvnx
    ///     mvnx completions zsh > ~/.zfunc/_mvnx
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse a `-D key=value` property
fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

impl GlobalArgs {
    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            repositories: self.repositories.clone(),
            settings: self.settings.clone(),
            local_repository: self.local_repository.clone(),
            timeout_secs: self.timeout,
            properties: self.properties.clone(),
            include_test: self.include_test,
            include_provided: self.include_provided,
            include_optional: self.include_optional,
            progress: !self.quiet && !self.verbose,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    let options = cli.global.resolve_options();

    match cli.command {
        Commands::Classpath {
            coordinate,
            probe,
            lines,
        } => {
            let args = commands::classpath::ClasspathArgs {
                coordinate,
                probe,
                lines,
            };
            commands::classpath::run(&options, args)?;
        }
        Commands::Tree { coordinate } => {
            commands::tree::run(&options, &coordinate)?;
        }
        Commands::Run {
            coordinate,
            main_class,
            java,
            args,
        } => {
            let args = commands::run::RunArgs {
                coordinate,
                main_class,
                java,
                args,
            };
            let code = commands::run::run(&options, args)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_classpath_command() {
        let cli = Cli::parse_from(["mvnx", "classpath", "junit:junit:4.10", "--lines"]);
        match cli.command {
            Commands::Classpath {
                coordinate,
                lines,
                probe,
            } => {
                assert_eq!(coordinate, "junit:junit:4.10");
                assert!(lines);
                assert!(!probe);
            }
            _ => panic!("Expected Classpath command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "mvnx",
            "tree",
            "g:a:1",
            "--repositories",
            "https://a.example,https://b.example",
            "-D",
            "revision=1.2",
            "-Dflavor=x=y",
            "--include-test",
            "--timeout",
            "5",
        ]);
        let options = cli.global.resolve_options();
        assert_eq!(
            options.repositories,
            Some(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
        assert_eq!(
            options.properties,
            vec![
                ("revision".to_string(), "1.2".to_string()),
                ("flavor".to_string(), "x=y".to_string()),
            ]
        );
        assert!(options.include_test);
        assert_eq!(options.timeout_secs, Some(5));
    }

    #[test]
    fn test_run_passthrough_arguments() {
        let cli = Cli::parse_from([
            "mvnx",
            "run",
            "g:tool:1",
            "--main-class",
            "g.Main",
            "--",
            "--flag",
            "value",
        ]);
        match cli.command {
            Commands::Run {
                main_class, args, ..
            } => {
                assert_eq!(main_class.as_deref(), Some("g.Main"));
                assert_eq!(args, vec!["--flag", "value"]);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_alias_cp_for_classpath() {
        let cli = Cli::parse_from(["mvnx", "cp", "g:a:1"]);
        assert!(matches!(cli.command, Commands::Classpath { .. }));
    }

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property("a=b").unwrap(),
            ("a".to_string(), "b".to_string())
        );
        assert_eq!(parse_property("a=").unwrap(), ("a".to_string(), String::new()));
        assert!(parse_property("novalue").is_err());
        assert!(parse_property("=x").is_err());
    }
}
