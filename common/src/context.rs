use crate::{
    config::DashboardConfig,
    dispatcher::{Dispatch, Dispatcher, FieldState, SetpointChange},
    session::Session,
    types::{AdjustDirection, BrokerCommand, ConnectionSnapshot},
};

/// Everything one dashboard page owns: its topic dispatcher, the displayed
/// field values and the broker session. Created once per process, handed to
/// every event handler.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    dispatcher: Dispatcher,
    fields: FieldState,
    session: Session,
}

impl DashboardContext {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(config),
            fields: FieldState::initial(&config.icons),
            session: Session::new(config.view, &config.namespace),
        }
    }

    pub fn fields(&self) -> &FieldState {
        &self.fields
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn begin_connect(&mut self) {
        self.session.begin_connect();
    }

    pub fn on_connected(&mut self) -> Vec<BrokerCommand> {
        self.session.on_connected()
    }

    pub fn on_subscribe_ack(&mut self, granted: usize, rejected: usize) {
        self.session.on_subscribe_ack(granted, rejected);
    }

    pub fn on_connection_lost(&mut self, reason: impl Into<String>) {
        self.session.on_connection_lost(reason);
    }

    pub fn handle_message(&mut self, topic: &str, payload: &str) -> Dispatch {
        self.dispatcher.handle_message(&mut self.fields, topic, payload)
    }

    pub fn adjust_setpoint(&mut self, direction: AdjustDirection) -> SetpointChange {
        self.dispatcher.adjust_setpoint(&mut self.fields, direction)
    }

    pub fn connection(&self) -> ConnectionSnapshot {
        self.session.snapshot()
    }
}
