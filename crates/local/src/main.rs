//! Binary to boot a local ministack cluster from a property file.
//!
//! The embedded engines are external collaborators, so this binary runs the
//! cluster against the mock engines, exactly like the integration test
//! environment it exists to serve.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;
use ministack_bootable::ComponentName;
use ministack_broker::BrokerService;
use ministack_cluster::Cluster;
use ministack_coordinator::CoordinatorService;
use ministack_engine::EngineConfig;
use ministack_engine_mock::{Journal, MockEngineFactory};
use ministack_properties::PropertyResolver;
use ministack_sql_gateway::SqlGatewayService;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the cluster property file
    #[arg(
        long,
        env = "MINISTACK_CONFIG",
        default_value = "conf/ministack.properties"
    )]
    config: PathBuf,

    /// Skip booting the SQL gateway
    #[arg(long, default_value_t = false)]
    skip_sql_gateway: bool,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
            .finish(),
    )?;

    info!("loading properties from {}", args.config.display());
    let resolver = PropertyResolver::load(&args.config)?;

    let journal = Journal::new();
    let mut cluster = Cluster::new();

    cluster.register(
        Box::new(CoordinatorService::new(
            &resolver,
            MockEngineFactory::new("coordinator", journal.clone())
                .with_configuration(EngineConfig::new()),
        )?),
        vec![],
    )?;

    cluster.register(
        Box::new(BrokerService::new(
            &resolver,
            MockEngineFactory::new("broker", journal.clone()),
        )?),
        vec![ComponentName::Coordinator],
    )?;

    if args.skip_sql_gateway {
        info!("sql gateway disabled, skipping");
    } else {
        cluster.register(
            Box::new(SqlGatewayService::new(
                &resolver,
                MockEngineFactory::new("sql-gateway", journal.clone())
                    .with_configuration(EngineConfig::new()),
            )?),
            vec![ComponentName::Coordinator],
        )?;
    }

    cluster.start_all().await?;

    for (name, state) in cluster.states().await {
        info!("{} is {} {}", name, state, cluster.get(name)?.describe());
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| Error::Io("unable to listen for shutdown signal", e))?;

    info!("shutdown command received. shutting down...");
    cluster.stop_all().await?;
    info!("cluster shutdown cleanly. goodbye.");

    Ok(())
}
