use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use tracing::{error, info};

use hollerns::cli::{Cli, Commands};
use hollerns::config::ConfigFile;
use hollerns::error::HollerError;
use hollerns::querier::{browse, QueryOptions};
use hollerns::responder::{Responder, ResponderConfig};
use hollerns::zones::{ServiceZone, Zone, ZoneSet};

#[tokio::main]
async fn main() -> Result<(), HollerError> {
    let cli = Cli::parse();
    let config = ConfigFile::try_load(cli.config().as_deref())?;
    hollerns::logging::init(&config.log_level, cli.debug())?;

    match cli.command {
        Commands::Browse {
            service,
            timeout,
            unicast,
            interface,
            domain,
            ..
        } => {
            let options = QueryOptions::new(service)
                .with_domain(domain)
                .with_timeout(Duration::from_secs(timeout))
                .with_interface(interface.or(config.interface))
                .with_unicast_response(unicast);
            let mut stream = browse(options).await?.into_stream();
            while let Some(entry) = stream.next().await {
                println!(
                    "{}\n  host: {} port: {}\n  v4: {:?} v6: {:?}\n  txt: {:?}",
                    entry.name, entry.host, entry.port, entry.ipv4, entry.ipv6, entry.txt_fields
                );
            }
            stream.close().await;
        }
        Commands::Respond { .. } => {
            if config.services.is_empty() {
                error!("No services configured, nothing to advertise");
                return Err(HollerError::Config(
                    "The services list in the config file is empty".to_string(),
                ));
            }
            let mut zones = ZoneSet::new();
            for service in &config.services {
                let mut builder = ServiceZone::builder(
                    service.instance.clone(),
                    service.service.clone(),
                    service.port,
                )
                .with_domain(service.domain.clone())
                .with_ips(service.ips.clone())
                .with_txt(service.txt.clone());
                if let Some(host_name) = &service.host_name {
                    builder = builder.with_host_name(host_name.clone());
                }
                let zone = builder.build().await?;
                info!("Advertising {}", zone.instance_addr());
                zones.add(Arc::new(zone));
            }

            let responder_config = ResponderConfig {
                interface: config.interface.clone(),
                log_empty_responses: config.log_empty_responses,
                capture_packets: config.capture_packets,
                disable_ipv4: config.disable_ipv4,
                disable_ipv6: config.disable_ipv6,
                socket: config.socket.clone(),
            };
            let zones: Arc<dyn Zone + Send + Sync> = Arc::new(zones);
            let mut responder = Responder::new(zones, responder_config);
            responder.start().await?;

            tokio::signal::ctrl_c().await?;
            info!("Interrupted, shutting down");
            responder.stop().await;
        }
        Commands::DefaultConfig => {
            println!("{}", ConfigFile::default().as_json_pretty()?);
        }
    }
    Ok(())
}
