mod auction_house_http;
mod config;
mod end_to_end;
mod polling;

use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    event::{self, Event, EventReceiver, UiEvent},
    service::{Controller, InMemoryAuctionHouse},
    view::View,
};

/// How long to wait for spawned requests before calling the loop idle
const SETTLE_TIMEOUT: Duration = Duration::from_millis(100);

/// A controller driven by hand, in front of an in-memory auction house
pub struct Harness {
    pub controller: Controller,
    pub events: EventReceiver,
    pub house: Arc<InMemoryAuctionHouse>,
}

impl Harness {
    pub fn new(config: Config, house: Arc<InMemoryAuctionHouse>) -> Self {
        let (event_writer, events) = event::channel();
        let controller = Controller::new(&config, house.clone(), event_writer);
        Self {
            controller,
            events,
            house,
        }
    }

    pub fn with_demo_catalog() -> Self {
        Self::new(
            Config::default(),
            Arc::new(InMemoryAuctionHouse::with_demo_catalog()),
        )
    }

    pub fn ui(&mut self, event: UiEvent) {
        self.controller.handle_event(Event::Ui(event));
    }

    /// Feed everything the spawned requests send back, until they stop
    pub async fn settle(&mut self) {
        while let Ok(Some(event)) = tokio::time::timeout(SETTLE_TIMEOUT, self.events.recv()).await
        {
            self.controller.handle_event(event);
        }
    }

    pub async fn register(&mut self, name: &str) {
        self.ui(UiEvent::Register {
            name: name.to_owned(),
        });
        self.settle().await;
    }

    pub fn view(&self) -> &View {
        self.controller.view()
    }

    pub fn latest_alert(&self) -> &str {
        self.view()
            .alerts
            .back()
            .map(|alert| alert.message.as_str())
            .unwrap_or("")
    }
}
