//! Command-line driver for a running editor bridge.
//!
//! Run with: cargo run -p bridge-cli -- --instance ~/myProgram tree vscode.window
//!
//! Connects either through the instance registry (`--instance`) or straight
//! to an address (`--port`, optionally `--host`).

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use ide_bridge_client::{BridgeClient, RemoteNode, RemoteValue};
use ide_bridge_core::{Endpoint, Literal, NodeKind, NodePath};
use ide_bridge_editor::create_workspace;
use ide_bridge_session::{InstanceRegistry, LaunchOptions, SysinfoProbe, storage::FileStorage};
use ide_bridge_transport::WebSocketTransport;
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ide-bridge")]
#[command(about = "Inspect and drive a running editor through its bridge")]
struct Args {
    /// Registered instance to talk to (usually the project path)
    #[arg(short, long, env = "IDE_BRIDGE_INSTANCE", global = true)]
    instance: Option<String>,

    /// Bridge host, used together with --port
    #[arg(long, env = "IDE_BRIDGE_HOST", global = true)]
    host: Option<String>,

    /// Bridge port; bypasses the instance registry
    #[arg(short, long, env = "IDE_BRIDGE_PORT", global = true)]
    port: Option<u16>,

    /// Instance registry file (defaults to ~/.vscode_instances.json)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// List running editor instances
    Instances,
    /// Start an editor on a project and wait for it to register
    Launch {
        project: String,
        #[arg(long, default_value = "code")]
        program: String,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Walk the remote object tree below a dotted path
    Tree {
        path: Option<String>,
        /// Print an indented outline instead of full paths
        #[arg(long)]
        outline: bool,
    },
    /// Evaluate an expression in the editor
    Eval { expression: String },
    /// Read a remote value
    Get { path: String },
    /// Assign a remote value (JSON scalar; anything else is a string)
    Set { path: String, value: String },
    /// Run an editor command (JSON arguments; anything else is a string)
    #[command(name = "command")]
    Run { name: String, args: Vec<String> },
    /// List editor commands
    Commands,
    /// Create a .code-workspace file in a directory
    Workspace {
        location: PathBuf,
        folders: Vec<String>,
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        instance,
        host,
        port,
        registry,
        action,
    } = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let registry = match registry {
        Some(path) => InstanceRegistry::new(FileStorage::new(path), SysinfoProbe::new()),
        None => InstanceRegistry::user_default()?,
    };

    match action {
        Action::Instances => {
            for (pid, desc) in registry.instances().await? {
                println!("{pid}\t{}\t{}", desc.endpoint(), desc.name);
            }
        }
        Action::Launch {
            project,
            program,
            timeout_secs,
        } => {
            let options = LaunchOptions {
                program,
                timeout: Duration::from_secs(timeout_secs),
                ..LaunchOptions::default()
            };
            let desc = registry.launch(&project, &options).await?;
            println!("{}\t{}\t{}", desc.pid, desc.endpoint(), desc.name);
        }
        Action::Workspace {
            location,
            folders,
            template,
        } => {
            let folders: Vec<&str> = folders.iter().map(String::as_str).collect();
            let file = create_workspace(&location, &folders, template.as_deref()).await?;
            println!("{}", file.display());
        }
        remote => {
            let mut client = connect(instance.as_deref(), host, port, &registry).await?;
            let outcome = run(&mut client, remote).await;
            client.close().await?;
            outcome?;
        }
    }

    Ok(())
}

async fn connect(
    instance: Option<&str>,
    host: Option<String>,
    port: Option<u16>,
    registry: &InstanceRegistry<FileStorage>,
) -> Result<BridgeClient<WebSocketTransport>> {
    if let Some(port) = port {
        let endpoint = Endpoint::new(host, port);
        info!(%endpoint, "Connecting");
        let client = BridgeClient::connect(endpoint).await?;
        return Ok(match instance {
            Some(name) => client.with_instance_name(name),
            None => client,
        });
    }

    let Some(name) = instance else {
        bail!("no bridge selected: pass --instance or --port");
    };
    registry
        .connect(name)
        .await
        .with_context(|| format!("connecting to instance {name}"))
}

async fn run(client: &mut BridgeClient<WebSocketTransport>, action: Action) -> Result<()> {
    match action {
        Action::Tree { path, outline } => {
            let object = path
                .as_deref()
                .map_or_else(|| client.root(), |p| client.object(p));
            if outline {
                println!("{}", object.describe(client, true).await?);
            } else {
                let mut walk = object.tree_walk(client);
                while let Some(node) = walk.try_next().await? {
                    println!("{}\t{}", kind_label(&node), node.full_path());
                }
            }
        }
        Action::Eval { expression } => print_json(&client.eval(&expression).await?)?,
        Action::Get { path } => {
            let value = RemoteValue::new(NodePath::parse(&path));
            print_json(&value.get(client).await?)?;
        }
        Action::Set { path, value } => {
            let literal = match serde_json::from_str::<Value>(&value) {
                Ok(parsed) => Literal::try_from(&parsed)?,
                Err(_) => Literal::Str(value),
            };
            let target = RemoteValue::new(NodePath::parse(&path));
            print_json(&target.set(client, literal).await?)?;
        }
        Action::Run { name, args } => {
            let args = args
                .into_iter()
                .map(|arg| serde_json::from_str::<Value>(&arg).unwrap_or(Value::String(arg)))
                .collect();
            let reply = client
                .command(name)
                .call(client, args, Map::new())
                .await?;
            print_json(&reply)?;
        }
        Action::Commands => {
            for command in client.commands().await? {
                println!("{}", command.name());
            }
        }
        Action::Instances | Action::Launch { .. } | Action::Workspace { .. } => {
            unreachable!("handled without a connection")
        }
    }
    Ok(())
}

const fn kind_label(node: &RemoteNode) -> &'static str {
    match node.kind() {
        NodeKind::Object => "object",
        NodeKind::Function => "function",
        NodeKind::Value => "value",
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
