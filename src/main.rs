use clap::Parser;
use teoriat::comms::uci;
use teoriat::{cli::Commands, prelude::*, *};

fn load_config(path: Option<&std::path::Path>) -> miette::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    init();

    let args = cli::Cli::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command.unwrap_or(Commands::Headless) {
        Commands::Decide { mode, moves } => {
            trace!("Deciding after {:?} in {mode} mode", moves);
            let engine = DecisionEngine::from_config(&config)?;
            let decision = engine.decide(&moves, mode).await?;
            info!("{} move in {:?}", decision.source, decision.elapsed);
            println!("{}", decision.uci);
        }
        Commands::Encode { moves } => {
            let vocab = Vocabulary::load(&config.artifacts.vocab)?;
            let encoded = PositionEncoder::new(&vocab, config.window).encode(&moves)?;
            println!("colors: {:?}", encoded.colors);
            println!("tokens: {:?}", encoded.tokens);
            println!("theory: {:?}", encoded.theory);
        }
        Commands::InitConfig { path } => {
            config.save_to_file(&path)?;
            println!("Wrote {}", path.display());
        }
        Commands::Headless => {
            trace!("Running headless");
            let engine = DecisionEngine::from_config(&config)?;
            uci::play(engine).await?;
        }
    }
    Ok(())
}
