use clap::Parser;
use log::error;
use pageshot::orchestrator::EXIT_FAILURE;
use pageshot::{Invocation, RenderOrchestrator, RunConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let invocation = Invocation::parse();

    let config = match RunConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let engine = match pageshot::new_engine(config.engine.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let outcome = RenderOrchestrator::new(config).run(engine, &invocation).await;

    // The CDP engine exits the process itself; this only runs for engines that return
    std::process::exit(outcome.exit_code());
}
