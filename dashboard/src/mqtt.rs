use std::{sync::Arc, time::Duration};

use rumqttc::{
    AsyncClient, ClientError, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS,
    SubscribeReasonCode, Transport,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use dashboard_common::{
    BrokerCommand, BrokerConfig, ConnectionState, DashboardContext, Dispatch, Qos, Transformed,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const REQUEST_CHANNEL_CAPACITY: usize = 64;

pub fn build_mqtt_options(broker: &BrokerConfig, client_id: &str) -> MqttOptions {
    let mut mqtt_options = MqttOptions::new(client_id, broker.ws_url(), broker.port);
    mqtt_options.set_transport(if broker.use_tls {
        Transport::wss_with_default_config()
    } else {
        Transport::Ws
    });
    mqtt_options.set_clean_session(false);
    mqtt_options.set_keep_alive(Duration::from_secs(broker.keep_alive_secs.max(5)));
    if !broker.user.is_empty() {
        mqtt_options.set_credentials(broker.user.clone(), broker.pass.clone());
    }
    mqtt_options
}

pub fn connect(broker: &BrokerConfig, client_id: &str) -> (AsyncClient, EventLoop) {
    AsyncClient::new(
        build_mqtt_options(broker, client_id),
        REQUEST_CHANNEL_CAPACITY,
    )
}

pub fn to_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Queues one request without waiting. Fails when the request channel is full
/// or the event loop is gone.
pub fn send_command(mqtt: &AsyncClient, command: &BrokerCommand) -> Result<(), ClientError> {
    match command {
        BrokerCommand::Subscribe { filter, qos } => {
            mqtt.try_subscribe(filter.as_str(), to_qos(*qos))
        }
        BrokerCommand::Publish {
            topic,
            payload,
            qos,
            retain,
        } => mqtt.try_publish(topic.as_str(), to_qos(*qos), *retain, payload.clone()),
    }
}

pub fn send_commands(mqtt: &AsyncClient, commands: Vec<BrokerCommand>) {
    for command in &commands {
        if let Err(err) = send_command(mqtt, command) {
            warn!("mqtt request failed for {command:?}: {err}");
        }
    }
}

pub fn spawn_mqtt_loop(
    context: Arc<Mutex<DashboardContext>>,
    mqtt: AsyncClient,
    mut eventloop: EventLoop,
    broker: BrokerConfig,
) {
    let connect_timeout = Duration::from_secs(broker.connect_timeout_secs);
    let reconnect_interval = Duration::from_millis(broker.reconnect_interval_ms);

    tokio::spawn(async move {
        loop {
            match next_event(&context, &mut eventloop, connect_timeout).await {
                Some(event) => handle_event(&context, &mqtt, event).await,
                None => tokio::time::sleep(reconnect_interval).await,
            }
        }
    });
}

/// Polls the event loop once. A handshake that outlasts `connect_timeout`
/// or a poll error is recorded on the session and yields `None`.
async fn next_event(
    context: &Mutex<DashboardContext>,
    eventloop: &mut EventLoop,
    connect_timeout: Duration,
) -> Option<Event> {
    let connecting = {
        let mut context = context.lock().await;
        context.begin_connect();
        context.session().state() == ConnectionState::Connecting
    };

    let polled = if connecting {
        match tokio::time::timeout(connect_timeout, eventloop.poll()).await {
            Ok(result) => result,
            Err(_) => {
                let reason = format!("connect timed out after {}s", connect_timeout.as_secs());
                warn!("mqtt {reason}");
                context.lock().await.on_connection_lost(reason);
                return None;
            }
        }
    } else {
        eventloop.poll().await
    };

    match polled {
        Ok(event) => Some(event),
        Err(err) => {
            warn!("mqtt connection lost: {err}");
            context.lock().await.on_connection_lost(err.to_string());
            None
        }
    }
}

async fn handle_event(context: &Mutex<DashboardContext>, mqtt: &AsyncClient, event: Event) {
    match event {
        Event::Incoming(Incoming::Publish(message)) => {
            handle_mqtt_message(context, &message.topic, &message.payload).await;
        }
        Event::Incoming(Incoming::ConnAck(_)) => {
            let commands = context.lock().await.on_connected();
            info!(
                "mqtt connected, subscribing to {} topic filters",
                commands.len()
            );
            send_commands(mqtt, commands);
        }
        Event::Incoming(Incoming::SubAck(ack)) => {
            let rejected = ack
                .return_codes
                .iter()
                .filter(|code| matches!(code, SubscribeReasonCode::Failure))
                .count();
            if rejected > 0 {
                warn!(
                    "broker rejected {rejected} of {} subscriptions (pkid {})",
                    ack.return_codes.len(),
                    ack.pkid
                );
            }
            let mut context = context.lock().await;
            context.on_subscribe_ack(ack.return_codes.len() - rejected, rejected);
            if context.session().state() == ConnectionState::Subscribed {
                info!("mqtt subscriptions active");
            }
        }
        Event::Outgoing(Outgoing::Disconnect) => {
            info!("mqtt disconnect requested");
            context.lock().await.on_connection_lost("disconnect requested");
        }
        _ => {}
    }
}

async fn handle_mqtt_message(context: &Mutex<DashboardContext>, topic: &str, payload: &[u8]) {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return;
    }

    let Ok(message) = std::str::from_utf8(payload) else {
        warn!("dropping non utf8 MQTT payload on topic {topic}");
        return;
    };
    debug!("{topic} : {message}");

    let dispatch = context.lock().await.handle_message(topic, message);
    match dispatch {
        Dispatch::Applied(update) => {
            if let Transformed::Fallback { reason, .. } = &update.result {
                debug!("{} fell back: {reason}", update.field.as_str());
            }
        }
        Dispatch::StaleEcho { field, payload } => {
            debug!("ignoring stale echo '{payload}' for {}", field.as_str());
        }
        Dispatch::Ignored => {}
    }
}
