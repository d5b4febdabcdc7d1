mod auction;
mod config;
mod event;
mod service;
mod view;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::load()?;

    // one thread: every piece of client state is owned by the controller loop
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: config::Config) -> Result<()> {
    info!(backend = ?config.backend, mode = ?config.sync_mode, "starting");

    let auction_house_client = service::auction_house::new_shared(&config)?;
    let (event_writer, event_reader) = event::channel();

    let svc_ctr = service::ServiceControl::new();

    ctrlc::set_handler({
        let svc_ctr = svc_ctr.clone();
        move || {
            eprintln!("Stopping all services...");
            svc_ctr.stop_all();
        }
    })?;

    let controller =
        service::Controller::new(&config, auction_house_client, event_writer.clone());

    for handle in vec![
        svc_ctr.spawn_service(
            "controller",
            controller.run(event_reader, svc_ctr.stop_token()),
        ),
        svc_ctr.spawn_service(
            "ui",
            service::ui::run_http_server(config.ui_address, event_writer, svc_ctr.stop_token()),
        ),
    ] {
        handle.join().await?
    }

    Ok(())
}

#[cfg(test)]
mod tests;
