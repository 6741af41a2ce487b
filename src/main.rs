use anyhow::{Context, Result};
use chrono::Utc;
use tou_discharge::controller::DischargeController;
use tou_discharge::persistence::PersistenceManager;
use tou_discharge::runtime::ControllerRuntime;
use tou_discharge::scenario::Scenario;
use tou_discharge::{Config, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    logging::init_logging(&config.logging)?;
    info!(
        "tou-discharge {} starting up (controller {})",
        env!("APP_VERSION"),
        config.controller.id
    );

    let scenario = Scenario::from_file(&config.runtime.scenario_file)
        .with_context(|| format!("Failed to load scenario {}", config.runtime.scenario_file))?;
    let (predictor, tariff, ess) = scenario.into_collaborators(Utc::now());

    let controller = DischargeController::new(config.controller.clone(), predictor, tariff, ess)?;
    let persistence = PersistenceManager::new(&config.runtime.state_file);
    let mut runtime = ControllerRuntime::new(controller, &config.runtime, Some(persistence))?;

    match runtime.run().await {
        Ok(()) => {
            info!("Controller shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Controller failed with error: {}", e);
            Err(anyhow::anyhow!("Controller error: {}", e))
        }
    }
}
