use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use social_router::bootstrap::Site;
use social_router::config::load_or_default;
use social_router::routing::{LinkBuilder, Params, RouterCache, ACTION};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect the routes of a social-router site", long_about = None)]
struct Cli {
    /// Site configuration file (defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Accept header to negotiate the route table with
    #[arg(short, long)]
    accept: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a request path to its action and parameters
    Match { path: String },
    /// Build the link for an action
    Generate {
        action: String,
        /// Route arguments as key=value
        args: Vec<String>,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long)]
        query: Vec<String>,
        #[arg(short, long)]
        fragment: Option<String>,
        /// Print an absolute URL on the site base
        #[arg(long)]
        absolute: bool,
    },
    /// List declared paths in declaration order
    List,
}

fn parse_pairs(pairs: &[String]) -> Result<Params, String> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("Expected key=value, got '{}'", pair))
        })
        .collect()
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_or_default(cli.config.as_deref())?;
    let base_url = url::Url::parse(&config.site.base_url)?;
    let fancy = config.site.fancy_urls;

    let cache = RouterCache::new();
    let site = Site::new(config, &cache)?;
    let router = site.router(&cache, site.negotiate(cli.accept.as_deref()))?;

    match cli.command {
        Commands::Match { path } => {
            let path = path.trim_start_matches('/');
            let params = router.map(path)?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
        Commands::Generate {
            action,
            args,
            query,
            fragment,
            absolute,
        } => {
            let args = parse_pairs(&args)?;
            let query = parse_pairs(&query)?;
            let link = if absolute {
                LinkBuilder::new(base_url, fancy).local_url(
                    &router,
                    &action,
                    Some(&args),
                    Some(&query),
                    fragment.as_deref(),
                )?
            } else {
                router.build(&action, Some(&args), Some(&query), fragment.as_deref())?
            };
            println!("{}", link);
        }
        Commands::List => {
            let table = router.table();
            for declaration in table.declarations() {
                println!(
                    "{:<48} {}",
                    if declaration.path.is_empty() { "/" } else { declaration.path.as_str() },
                    declaration.args.get(ACTION).map(String::as_str).unwrap_or("-")
                );
            }
            println!(
                "{} static, {} dynamic routes",
                table.static_count(),
                table.dynamic_count()
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
