use clap::{Parser, Subcommand};
use cvx::commands::{
    bundle::{self, BundleCommand},
    components,
    config::{self, ConfigAction},
    entry_points, ProjectArgs,
};
use cvx::common::GlobalOpts;
use cvx::errors;
use cvx_logger::Logger;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "cvx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Bundle Convex functions for deployment",
    long_about = "cvx classifies a Convex functions directory, resolves each module's runtime, \
                  bundles it with esbuild and assembles the component graph into one payload."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle the functions directory into a push payload
    Bundle(BundleCommand),
    /// List entry points with their kind and runtime environment
    EntryPoints(ProjectArgs),
    /// Show the component graph rooted at the functions directory
    Components(ProjectArgs),
    /// Configure the cvx tool
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn init_logging(opts: &GlobalOpts) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| opts.default_log_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.global);

    let verbosity = cli.global.verbosity_level();
    let logger = Logger::init(verbosity, cli.global.no_stdout).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to initialize logger: {}", e);
        Logger::new(verbosity, cli.global.no_stdout)
    });

    let result = match cli.command {
        Commands::Bundle(cmd) => bundle::handle_bundle(cmd, &logger),
        Commands::EntryPoints(args) => entry_points::handle_entry_points(args, &logger),
        Commands::Components(args) => components::handle_components(args, &logger),
        Commands::Config { action } => config::handle_config(action, &cli.global, &logger),
    };

    if let Err(e) = result {
        std::process::exit(errors::report(&logger, &e));
    }
}
