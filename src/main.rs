use clap::Parser;
use racetrack::cli::{config, run, Cli, Commands, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run::execute(&args).await?,
        Commands::Config(ConfigCommand::Init(args)) => config::execute_init(&args.path, args.force)?,
        Commands::Config(ConfigCommand::Show(arg)) => config::execute_show(&arg.config)?,
        Commands::Config(ConfigCommand::Validate(arg)) => config::execute_validate(&arg.config)?,
    }
    Ok(())
}
