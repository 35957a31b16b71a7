//! gendoc: generate AsyncAPI documents from `//+gendoc` annotations.
//!
//! Two stages, usually run in different places:
//!
//! - **single-context**: analyze one repository and store its blocks as an
//!   interim state document, `current/<repo dir>.json`.
//! - **global-context**: merge every interim state, rebuild the service
//!   hierarchy across repositories and emit `asyncapi/<service>.yml`.

mod asyncapi;
mod files;
mod generate;
mod render;
mod storage;
mod tree;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use generate::{Analyzer, DEFAULT_CONCURRENCY};
use gendoc_syntax::Config;
use std::path::Path;
use storage::{FetchRequest, StorageLocation, UploadRequest};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gendoc",
    version,
    about = "Generator for AsyncAPI documents from annotated source repositories"
)]
struct Cli {
    /// Where to read from, e.g. local://./my-repo
    #[arg(short, long, global = true, env = "GENDOC_INPUT", default_value = "local://.")]
    input: String,

    /// Where to write to: local://<path> or azblob://<account>/<container>.
    /// Ignored with --dry-run.
    #[arg(
        short,
        long,
        global = true,
        env = "GENDOC_OUTPUT",
        default_value = "local://$HOME/.gendoc"
    )]
    output: String,

    /// Debug logging on stderr
    #[arg(short, long, global = true, env = "GENDOC_VERBOSE")]
    verbose: bool,

    /// Validate only, nothing is written
    #[arg(long, global = true, env = "GENDOC_DRY_RUN")]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a single repository and store its interim state
    #[command(visible_aliases = ["sc", "single"])]
    SingleContext(SingleContextArgs),

    /// Merge interim states into one AsyncAPI document per service
    #[command(visible_aliases = ["gc", "global"])]
    GlobalContext(GlobalContextArgs),
}

#[derive(Args)]
struct SingleContextArgs {
    /// Business domain, e.g. warehouse
    #[arg(short, long, env = "GENDOC_BUSINESS_DOMAIN", default_value = "")]
    business_domain: String,

    /// Bounded context within the business domain
    #[arg(short = 'c', long, env = "GENDOC_BOUNDED_CTX", default_value = "")]
    bounded_ctx: String,

    /// Repository URL
    #[arg(short, long, env = "GENDOC_REPO", default_value = "")]
    repo: String,

    /// Main language used in the repository
    #[arg(long, env = "GENDOC_LANG", default_value = "C#")]
    lang: String,

    /// Service id for blocks that do not name one
    #[arg(long, env = "GENDOC_SERVICE_ID")]
    service_id: Option<String>,

    /// The repository is a service: its directory name is the service id
    #[arg(short = 's', long, env = "GENDOC_IS_SERVICE")]
    is_service: bool,

    /// Files analyzed at the same time
    #[arg(long, env = "GENDOC_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

#[derive(Args)]
struct GlobalContextArgs {
    /// Output format: yaml (default) or json
    #[arg(short, long, env = "GENDOC_FORMAT", default_value = "yaml")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let input: StorageLocation = cli.input.parse().context("invalid --input location")?;
    let output: StorageLocation = cli.output.parse().context("invalid --output location")?;

    match &cli.command {
        Command::SingleContext(args) => single_context(&cli, args, &input, &output).await,
        Command::GlobalContext(args) => global_context(&cli, args, &input, &output).await,
    }
}

// -- single-context -----------------------------------------------------------

async fn single_context(
    cli: &Cli,
    args: &SingleContextArgs,
    input: &StorageLocation,
    output: &StorageLocation,
) -> Result<()> {
    let search_dir = input
        .local_root()?
        .canonicalize()
        .with_context(|| format!("cannot search {input}"))?;
    let dir_name = dir_name(&search_dir)?;

    let config = parser_config(args, &dir_name);
    debug!(dir = %search_dir.display(), service_id = %config.service_id, "searching");

    let entries = files::list_files(&search_dir)?;
    let inputs = generate::load_inputs(&entries).await?;
    let blocks = Analyzer::new(config, process_environment())
        .with_concurrency(args.concurrency)
        .run(inputs)
        .await?;

    if cli.dry_run {
        info!(blocks = blocks.len(), "dry run, nothing stored");
        return Ok(());
    }

    let client = storage::client_for(output)?;
    let request = UploadRequest {
        key: format!("current/{dir_name}.json"),
        body: generate::interim_state(&blocks)?,
    };
    client
        .upload(&request)
        .await
        .with_context(|| format!("failed to store {} in {output}", request.key))?;
    info!(key = %request.key, "interim state stored");
    Ok(())
}

fn parser_config(args: &SingleContextArgs, dir_name: &str) -> Config {
    let service_id = match &args.service_id {
        Some(id) => id.clone(),
        None if args.is_service => dir_name.to_string(),
        None => String::new(),
    };
    Config {
        service_id,
        service_repo_url: args.repo.clone(),
        service_repo_lang: args.lang.clone(),
        business_domain: args.business_domain.clone(),
        bounded_domain: args.bounded_ctx.clone(),
    }
}

fn dir_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("cannot derive a name from {}", path.display()))
}

/// `KEY=value` pairs of the process environment, captured once.
fn process_environment() -> Vec<String> {
    std::env::vars_os()
        .map(|(key, value)| format!("{}={}", key.to_string_lossy(), value.to_string_lossy()))
        .collect()
}

// -- global-context -----------------------------------------------------------

async fn global_context(
    cli: &Cli,
    args: &GlobalContextArgs,
    input: &StorageLocation,
    output: &StorageLocation,
) -> Result<()> {
    let renderer = render::create_renderer(&args.format)?;

    let download = tempfile::Builder::new()
        .prefix(".gendoc-download-")
        .tempdir()
        .context("failed to create download directory")?;
    storage::client_for(input)?
        .fetch(&FetchRequest {
            emit_path: download.path().to_path_buf(),
        })
        .await
        .with_context(|| format!("failed to fetch {input}"))?;
    debug!(dir = %download.path().display(), "fetched interim states");

    let entries: Vec<_> = files::list_files(download.path())?
        .into_iter()
        .filter(|entry| entry.file_type == "json")
        .collect();
    let inputs = generate::load_inputs(&entries).await?;
    let blocks = generate::merge_interim(&inputs)?;

    let tree = tree::build(&blocks);
    tree::build::log_orphans(&tree);
    let documents = asyncapi::assemble(&tree);
    info!(
        interim = inputs.len(),
        blocks = blocks.len(),
        services = documents.len(),
        orphans = tree.orphan_count(),
        "context tree built"
    );

    let mut rendered = Vec::with_capacity(documents.len());
    for doc in &documents {
        let body = renderer
            .render(&doc.document)
            .with_context(|| format!("failed to render {}", doc.service_id))?;
        let key = format!("asyncapi/{}.{}", doc.service_id, renderer.file_extension());
        rendered.push(UploadRequest {
            key,
            body: body.into_bytes(),
        });
    }

    if cli.dry_run {
        info!(documents = rendered.len(), "dry run, nothing stored");
        return Ok(());
    }

    let client = storage::client_for(output)?;
    for request in &rendered {
        client
            .upload(request)
            .await
            .with_context(|| format!("failed to store {} in {output}", request.key))?;
        info!(key = %request.key, "document stored");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn single_args(service_id: Option<&str>, is_service: bool) -> SingleContextArgs {
        SingleContextArgs {
            business_domain: "shop".to_string(),
            bounded_ctx: "checkout".to_string(),
            repo: "https://git.example/orders".to_string(),
            lang: "C#".to_string(),
            service_id: service_id.map(str::to_string),
            is_service,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn service_id_resolution() {
        assert_eq!(parser_config(&single_args(None, false), "orders").service_id, "");
        assert_eq!(parser_config(&single_args(None, true), "orders").service_id, "orders");
        assert_eq!(
            parser_config(&single_args(Some("explicit"), true), "orders").service_id,
            "explicit"
        );
    }

    #[test]
    fn parser_config_carries_repo_context() {
        let config = parser_config(&single_args(None, true), "orders");
        assert_eq!(config.service_urn("orders"), "urn:shop:checkout:orders");
        assert_eq!(config.service_repo_url, "https://git.example/orders");
        assert_eq!(config.service_repo_lang, "C#");
    }

    #[test]
    fn dir_name_of_canonical_path() {
        assert_eq!(dir_name(Path::new("/src/orders-svc")).unwrap(), "orders-svc");
        assert!(dir_name(Path::new("/")).is_err());
    }

    #[test]
    fn defaults_and_aliases() {
        let cli = Cli::try_parse_from(["gendoc", "sc"]).unwrap();
        assert_eq!(cli.input, "local://.");
        assert!(!cli.dry_run);
        let Command::SingleContext(args) = cli.command else {
            panic!("expected single-context");
        };
        assert_eq!(args.lang, "C#");
        assert_eq!(args.concurrency, 20);

        let cli = Cli::try_parse_from(["gendoc", "global", "--dry-run", "-f", "json"]).unwrap();
        assert!(cli.dry_run);
        let Command::GlobalContext(args) = cli.command else {
            panic!("expected global-context");
        };
        assert_eq!(args.format, "json");
    }

    #[test]
    fn environment_is_captured_as_pairs() {
        let environ = process_environment();
        assert!(environ.iter().all(|pair| pair.contains('=')));
    }
}
