use crate::{
    topics::{namespaced, FILTER_CLIMATE_TEMP, FILTER_WEATHER},
    types::{BrokerCommand, ConnectionSnapshot, ConnectionState, DashboardView, Qos},
};

/// Subscription filters a view issues after every successful handshake.
pub fn view_filters(view: DashboardView) -> &'static [&'static str] {
    match view {
        DashboardView::Weather | DashboardView::Thermostat => {
            &[FILTER_WEATHER, FILTER_CLIMATE_TEMP]
        }
        DashboardView::Climate => &[FILTER_CLIMATE_TEMP],
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    view: DashboardView,
    subscriptions: Vec<(String, Qos)>,
    state: ConnectionState,
    pending_acks: usize,
    rejected: usize,
    connect_count: u64,
    loss_count: u64,
    last_error: Option<String>,
}

impl Session {
    pub fn new(view: DashboardView, namespace: &str) -> Self {
        let subscriptions = view_filters(view)
            .iter()
            .map(|filter| (namespaced(namespace, filter), Qos::AtLeastOnce))
            .collect();

        Self {
            view,
            subscriptions,
            state: ConnectionState::Disconnected,
            pending_acks: 0,
            rejected: 0,
            connect_count: 0,
            loss_count: 0,
            last_error: None,
        }
    }

    pub fn view(&self) -> DashboardView {
        self.view
    }

    pub fn client_id(&self) -> &'static str {
        self.view.client_id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn begin_connect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Handshake succeeded. Returns the whole subscription batch.
    pub fn on_connected(&mut self) -> Vec<BrokerCommand> {
        self.state = ConnectionState::Connected;
        self.connect_count = self.connect_count.saturating_add(1);
        self.pending_acks = self.subscriptions.len();
        self.rejected = 0;

        self.subscriptions
            .iter()
            .map(|(filter, qos)| BrokerCommand::Subscribe {
                filter: filter.clone(),
                qos: *qos,
            })
            .collect()
    }

    /// Counts the filters a SUBACK granted or rejected. The session only
    /// reaches `Subscribed` when every filter was granted.
    pub fn on_subscribe_ack(&mut self, granted: usize, rejected: usize) {
        if self.state != ConnectionState::Connected {
            return;
        }
        self.pending_acks = self.pending_acks.saturating_sub(granted + rejected);
        if rejected > 0 {
            self.rejected = self.rejected.saturating_add(rejected);
            self.last_error = Some(format!(
                "broker rejected {} of {} subscriptions",
                self.rejected,
                self.subscriptions.len()
            ));
        }
        if self.pending_acks == 0 && self.rejected == 0 {
            self.state = ConnectionState::Subscribed;
        }
    }

    /// Only a dropped live connection counts as a loss; failed connect
    /// attempts just record the error.
    pub fn on_connection_lost(&mut self, reason: impl Into<String>) {
        if matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Subscribed
        ) {
            self.loss_count = self.loss_count.saturating_add(1);
        }
        self.state = ConnectionState::Disconnected;
        self.pending_acks = 0;
        self.last_error = Some(reason.into());
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            state: self.state.as_str(),
            client_id: self.client_id(),
            connect_count: self.connect_count,
            loss_count: self.loss_count,
            pending_subscriptions: self.pending_acks,
            rejected_subscriptions: self.rejected,
            last_error: self.last_error.clone(),
        }
    }
}
