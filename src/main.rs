use clap::{Parser, Subcommand};
use comic::generate::GenerateError;
use comic::{config, generate, output, scaffold, scan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "comic")]
#[command(version, about = "Static site generator for webcomics")]
#[command(long_about = "\
Static site generator for webcomics

Each comic is a metadata file plus an image with the same name. Templates
turn them into an archive page and one page per comic.

Project structure:

  mycomic/
  ├── comic.toml                 # Site globals and [build] settings
  ├── comics/
  │   ├── meta/
  │   │   ├── 001.md             # key: value header, blank line, Markdown body
  │   │   └── 002.yaml           # YAML with `long` (HTML body) and `date`
  │   └── images/
  │       ├── 001.png            # Matched to meta/001.md by name
  │       └── 002.jpg
  └── templates/
      ├── base.html
      ├── index.html             # Gets `comics`
      └── comic.html             # Gets slug, html, meta, image_url, prev, next

Run 'comic create' to start a project, or 'comic gen-config' to print a
documented comic.toml.")]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Config file argument, positional or `-f/--file`.
#[derive(clap::Args)]
struct ConfigArgs {
    /// Configuration file [default: ./comic.toml]
    #[arg(value_name = "FILE", conflicts_with = "file_flag")]
    file: Option<PathBuf>,

    /// Configuration file
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file_flag: Option<PathBuf>,
}

impl ConfigArgs {
    fn path(self) -> PathBuf {
        self.file
            .or(self.file_flag)
            .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILENAME))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new webcomic project directory
    Create {
        /// Project name (prompted for when omitted)
        #[arg(value_name = "NAME", conflicts_with = "name_flag")]
        name: Option<String>,

        /// Project name
        #[arg(short = 'n', long = "name", value_name = "NAME")]
        name_flag: Option<String>,
    },
    /// Build the site
    Build(ConfigArgs),
    /// Discover comics and report problems without building
    Check {
        #[command(flatten)]
        config: ConfigArgs,

        /// Print the discovered comics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock comic.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            report_error(err.as_ref());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "comic=debug" } else { "comic=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::Create { name, name_flag } => {
            let name = match name.or(name_flag) {
                Some(name) => name,
                None => dialoguer::Input::<String>::new()
                    .with_prompt("Name of your webcomic")
                    .interact_text()?,
            };
            let scaffold = scaffold::create(Path::new("."), &name)?;
            if scaffold.created {
                println!(
                    "Finished creating your webcomic directory: {}",
                    scaffold.root.display()
                );
            } else {
                println!(
                    "{} already exists, left untouched",
                    scaffold.root.display()
                );
            }
        }
        Command::Build(args) => {
            let config_path = args.path();
            let site_config = config::load_config(&config_path)?;
            let root = config::project_root(&config_path);
            let report = generate::build(&root, &site_config)?;
            output::print_build_output(&report);
        }
        Command::Check { config, json } => {
            let config_path = config.path();
            let site_config = config::load_config(&config_path)?;
            let comics_root =
                config::project_root(&config_path).join(&site_config.build.comics_dir);
            let discovery = scan::discover(&comics_root)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&discovery)?);
                for err in &discovery.errors {
                    eprintln!("error: {err}");
                }
            } else {
                output::print_discovery_output(&discovery, &comics_root);
            }

            if !discovery.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Print an error and its source chain to stderr.
fn report_error(err: &(dyn std::error::Error + 'static)) {
    if let Some(GenerateError::Discovery(errors)) = err.downcast_ref::<GenerateError>() {
        eprintln!("error: {err}");
        for scan_err in errors {
            eprintln!("    {scan_err}");
        }
        return;
    }

    eprintln!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
