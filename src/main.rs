use clap::Parser;
use clashmon::cli::{
    call, handle_completions, handle_config_init, load_config_with_overrides, status, watch, Cli,
    Commands, ConfigCommands, GlobalArgs,
};
use clashmon::config::ClashmonConfig;

/// Load configuration and install the tracing subscriber
fn init(global: &GlobalArgs) -> Result<ClashmonConfig, Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(global)?;
    clashmon::logging::init_tracing(&config.logging)?;
    tracing::debug!(config = ?global.config, "Loaded configuration");
    Ok(config)
}

fn print_output(
    result: Result<String, Box<dyn std::error::Error>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = result?;
    println!("{}", output);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch(args) => match init(&cli.global) {
            Ok(config) => watch::run_watch(args, config).await,
            Err(e) => Err(e),
        },
        Commands::Status(args) => match init(&cli.global) {
            Ok(config) => print_output(status::handle_status(&args, &config).await),
            Err(e) => Err(e),
        },
        Commands::Version => match init(&cli.global) {
            Ok(config) => print_output(call::handle_version(&config).await),
            Err(e) => Err(e),
        },
        Commands::Call(args) => match init(&cli.global) {
            Ok(config) => print_output(call::handle_call(&args, &config).await),
            Err(e) => Err(e),
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
