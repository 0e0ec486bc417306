use crate::dispatcher::Dispatcher;
use crate::echo::{register_echo, register_pass_through_hooks};
use crate::gateway::{compile, Gateway, GatewayConfig};
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer};
use crate::spec::OperationDescriptor;
use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Serve and inspect Swagger-driven dispatch tables.
#[derive(Debug, Parser)]
#[command(name = "specgate", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the specification comes from.
#[derive(Debug, Clone, Args)]
pub struct SpecArgs {
    /// Specification path, file:// or http(s):// URL
    #[arg(short, long, env = "SPECGATE_SPEC")]
    pub spec: Option<String>,

    /// Mount prefix; replaces the document's basePath
    #[arg(short, long)]
    pub route: Option<String>,

    /// Gateway configuration file (YAML)
    #[arg(short, long, conflicts_with = "spec")]
    pub config: Option<PathBuf>,
}

impl SpecArgs {
    /// Build the gateway configuration; `--route` overrides the file's `route`.
    pub fn gateway_config(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match (&self.config, &self.spec) {
            (Some(path), _) => GatewayConfig::from_yaml_file(path)?,
            (None, Some(spec)) => GatewayConfig::from_url(spec.clone()),
            (None, None) => return Err(anyhow!("either --spec or --config is required")),
        };
        if let Some(route) = &self.route {
            config.route = Some(route.clone());
        }
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the specification with echo handlers for every operation
    Serve {
        #[command(flatten)]
        spec: SpecArgs,

        /// Address and port to bind
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Print the compiled dispatch table
    Routes {
        #[command(flatten)]
        spec: SpecArgs,
    },
    /// Compile the specification and report problems
    Check {
        #[command(flatten)]
        spec: SpecArgs,
    },
}

/// One line of the dispatch table: `METHOD route -> controller#method [around]`.
pub fn format_route(op: &OperationDescriptor) -> String {
    let mut line = format!(
        "{:<7} {} -> {}#{}",
        op.method.as_str(),
        op.route_template,
        op.controller_name,
        op.method_name
    );
    if let Some(hook) = &op.around_hook {
        line.push_str(&format!(" (around: {hook})"));
    }
    line
}

fn serve(config: &GatewayConfig, addr: &str) -> anyhow::Result<()> {
    let runtime = RuntimeConfig::from_env();
    runtime.apply();

    let operations = compile(config)?;
    let mut dispatcher = Dispatcher::new().with_runtime(runtime);
    // SAFETY: startup, before any request is served.
    unsafe {
        register_echo(&mut dispatcher, &operations);
    }
    register_pass_through_hooks(&mut dispatcher, &operations);

    let gateway = Gateway::from_operations(operations, dispatcher)?;
    let handle = HttpServer(AppService::new(gateway))
        .start(addr)
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %handle.addr(), "Serving");
    handle
        .join()
        .map_err(|_| anyhow!("server coroutine terminated abnormally"))
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Load, compile and bind failures; `check` fails exactly when the
/// specification does not compile.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Serve { spec, addr } => serve(&spec.gateway_config()?, addr),
        Commands::Routes { spec } => {
            for op in compile(&spec.gateway_config()?)? {
                println!("{}", format_route(&op));
            }
            Ok(())
        }
        Commands::Check { spec } => {
            let operations = compile(&spec.gateway_config()?)?;
            println!("ok: {} operation(s) compiled", operations.len());
            Ok(())
        }
    }
}

/// Parse `std::env::args` and run.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}
