mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ipaschema_api::{ClientConfig, JsonRpcClient, OfflineApi, RemoteApi, expand_tilde};
use ipaschema_registry::{CommandDescriptor, Connection, Descriptor, Namespace, SchemaRegistry, build_clap, collect_values};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Inspect and dry-run the commands a server describes in its API schema.
#[derive(Debug, Parser)]
#[command(name = "ipaschema", version, about)]
struct Cli {
    /// Server URL, e.g. https://ipa.example.test
    #[arg(long, global = true)]
    server: Option<String>,

    /// Read the schema from a JSON or YAML file instead of the server
    #[arg(long, global = true, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Client configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API version the schema call is pinned to
    #[arg(long, global = true)]
    api_version: Option<String>,

    #[command(subcommand)]
    command: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// List command names grouped by topic
    Commands,
    /// Print the topic tree
    Topics,
    /// Print a compiled command or object as JSON
    Show { name: String },
    /// Parse arguments for a command and print the completed keyword values
    Invoke {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let connection = connect(&cli)?;
    let namespace = SchemaRegistry::global()
        .namespace(&connection)
        .context("load the API schema")?;

    match &cli.command {
        Action::Commands => print!("{}", render::command_list(&namespace)),
        Action::Topics => print!("{}", render::topic_tree(namespace.topics())),
        Action::Show { name } => show(&namespace, name)?,
        Action::Invoke { name, args } => invoke(&namespace, name, args)?,
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Picks the schema source: a schema file wins over a server URL. Flags
/// override the configuration file.
fn connect(cli: &Cli) -> Result<Connection> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load_from(path.clone()),
        None => ClientConfig::load(),
    };
    let schema_path = cli
        .schema
        .as_ref()
        .map(|path| expand_tilde(&path.to_string_lossy()))
        .or_else(|| config.schema_path());
    if let Some(path) = schema_path {
        info!(path = %path.display(), "using offline schema");
        let remote: Arc<dyn RemoteApi> = Arc::new(OfflineApi::from_path(&path)?);
        return Ok(Connection::new(remote));
    }

    let Some(server) = cli.server.as_deref().or(config.server.as_deref()) else {
        bail!("no server configured; pass --server or --schema, or set one in the config file");
    };
    let api_version = cli.api_version.as_deref().unwrap_or_else(|| config.api_version());
    debug!(server, api_version, "connecting");
    let client = JsonRpcClient::new(server, api_version).with_context(|| format!("connect to {server}"))?;
    Ok(Connection::new(Arc::new(client)))
}

/// Resolves `user_add` as well as its command-line spelling `user-add`.
fn lookup<'a>(namespace: &'a Namespace, name: &str) -> Option<Descriptor<'a>> {
    namespace.get(name).or_else(|| namespace.get(&name.replace('-', "_")))
}

fn show(namespace: &Namespace, name: &str) -> Result<()> {
    let value = match lookup(namespace, name) {
        Some(Descriptor::Command(command)) => render::command_json(command)?,
        Some(Descriptor::Object(object)) => render::object_json(object)?,
        None => bail!("no command or object named '{name}'"),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn invoke(namespace: &Namespace, name: &str, args: &[String]) -> Result<()> {
    let Some(Descriptor::Command(command)) = lookup(namespace, name) else {
        bail!("no command named '{name}'");
    };
    if command.no_cli {
        bail!("'{}' is not available on the command line", command.name);
    }

    let cli_name = command.cli_name();
    let argv = ["ipa", cli_name.as_str()].into_iter().map(str::to_string).chain(args.iter().cloned());
    let matches = build_clap(namespace).try_get_matches_from(argv).unwrap_or_else(|error| error.exit());
    let (_, sub_matches) = matches
        .subcommand()
        .with_context(|| format!("no arguments parsed for '{}'", command.name))?;

    let mut kw = collect_values(command, sub_matches)?;
    command
        .fill_defaults(&mut kw)
        .with_context(|| format!("complete defaults for '{}'", command.name))?;
    print_kw(command, kw)
}

fn print_kw(command: &CommandDescriptor, kw: serde_json::Map<String, serde_json::Value>) -> Result<()> {
    let payload = serde_json::json!({
        "command": command.full_name,
        "kw": render::redact_values(command, kw),
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
