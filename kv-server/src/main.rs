mod errors;
mod routes;

use std::net::IpAddr;
use std::sync::Arc;

use clap::Parser;
use kv_core::errors::*;
use kv_core::k8s::{
    ClusterClient,
    KubeClusterClient,
};
use kv_core::logging;
use kv_core::prelude::*;
use kv_watch::{
    Broker,
    ViewerConfig,
    WatchManager,
};
use tracing::*;

use crate::routes::{
    AppState,
    build_server,
};

#[derive(Parser, Debug)]
#[command(about = "Live viewer for the workloads in a Kubernetes cluster", version)]
struct Options {
    #[arg(short, long, env = PORT_ENV_VAR, default_value = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    address: IpAddr,

    #[arg(long, env = SINGLE_NAMESPACE_ENV_VAR, long_help = "Only show (and only watch) this namespace")]
    single_namespace: Option<String>,

    #[arg(
        long,
        env = NAMESPACE_FILTER_ENV_VAR,
        long_help = "Regular expression; matching namespaces are hidden from the namespace list"
    )]
    namespace_filter: Option<String>,

    #[arg(short, long)]
    config_file: Option<String>,

    #[arg(short, long, default_value = "info")]
    verbosity: String,
}

impl Options {
    fn load_config(&self) -> anyhow::Result<ViewerConfig> {
        let mut config = match &self.config_file {
            Some(filename) => ViewerConfig::load(filename)?,
            None => ViewerConfig::default(),
        };

        if let Some(ns) = &self.single_namespace {
            config.single_namespace = ns.clone();
        }
        if let Some(filter) = &self.namespace_filter {
            config.namespace_filter = filter.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[instrument(ret, err)]
async fn run(args: Options) -> EmptyResult {
    let config = args.load_config()?;
    let client: Arc<dyn ClusterClient> = Arc::new(KubeClusterClient::try_default().await?);

    let broker = Broker::new(config.client_buffer_size);
    let mut manager = WatchManager::start(client.clone(), &config, broker.clone()).await?;
    let heartbeat = broker.start_heartbeat(config.heartbeat_interval());

    let state = AppState::new(client, &config, broker.clone())?;
    let rkt_config = rocket::Config {
        port: args.port,
        address: args.address,
        ..Default::default()
    };
    info!("KubeView listening on {}:{}", args.address, args.port);
    build_server(&rkt_config, state).launch().await?;

    heartbeat.abort();
    broker.shutdown();
    manager.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Options::parse();
    logging::setup(&format!("{},rocket=warn", args.verbosity));
    if let Err(err) = run(args).await {
        kverr!(err, "kubeview failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests;
