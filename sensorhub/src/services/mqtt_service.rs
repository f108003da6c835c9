use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;

use crate::configs::Mqtt;
use crate::errors::{HubError, PublishError};
use crate::services::publisher::{Message, Publisher};

const REQUEST_CAPACITY: usize = 64;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const ONLINE: &str = "1";
const OFFLINE: &str = "0";

/// Broker connection shared by every job.
///
/// The event loop runs on its own task and reconnects after failures; when a
/// last will topic is configured the online flag is re-published after every
/// connect.
pub struct MqttService {
    client: AsyncClient,
    last_will: Option<String>,
    driver: JoinHandle<()>,
}

impl MqttService {
    pub async fn connect(mqtt: &Mqtt) -> Result<Self, HubError> {
        let address = mqtt.address()?;

        let mut options = MqttOptions::new(&mqtt.id, &address.host, address.port);
        options.set_keep_alive(mqtt.keep_alive);

        if let Some(username) = &mqtt.username {
            options.set_credentials(username, mqtt.password.as_deref().unwrap_or_default());
        }

        let last_will = mqtt.last_will().map(str::to_string);
        if let Some(topic) = &last_will {
            options.set_last_will(LastWill::new(topic, OFFLINE, QoS::AtLeastOnce, true));
        }

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);

        tokio::time::timeout(CONNECT_TIMEOUT, wait_for_connack(&mut event_loop))
            .await
            .map_err(|_| HubError::Broker(format!("no answer from {address} within {CONNECT_TIMEOUT:?}")))?
            .map_err(|e| HubError::Broker(format!("{address}: {e}")))?;

        tracing::info!("connected to MQTT broker {} as {}", address, mqtt.id);

        let publisher = MqttPublisher { client: client.clone() };
        if let Some(topic) = &last_will {
            publisher
                .publish(Message::retained(topic.as_str(), ONLINE))
                .await
                .map_err(|e| HubError::Broker(e.to_string()))?;
        }

        let driver = tokio::spawn(drive(event_loop, publisher, last_will.clone()));

        Ok(Self {
            client,
            last_will,
            driver,
        })
    }

    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher {
            client: self.client.clone(),
        }
    }

    /// Marks the hub offline and closes the connection cleanly.
    ///
    /// Never waits on the request queue: while the broker is unreachable the
    /// queue stops draining, so both requests are dropped when it is full and
    /// the event loop is aborted after [`DISCONNECT_TIMEOUT`].
    pub async fn shutdown(self) {
        let publisher = self.publisher();

        if let Some(topic) = &self.last_will {
            if let Err(e) = publisher.try_publish(Message::retained(topic.as_str(), OFFLINE)) {
                tracing::warn!("Failed to publish offline state: {}", e);
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            tracing::warn!("Failed to request disconnect: {}", e);
        }

        let mut driver = self.driver;
        if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut driver).await.is_err() {
            tracing::warn!("MQTT event loop did not stop within {:?}, dropping it", DISCONNECT_TIMEOUT);
            driver.abort();
        }
    }
}

async fn wait_for_connack(event_loop: &mut EventLoop) -> Result<(), ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(_)) = event_loop.poll().await? {
            return Ok(());
        }
    }
}

async fn drive(mut event_loop: EventLoop, publisher: MqttPublisher, last_will: Option<String>) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("reconnected to MQTT broker");

                if let Some(topic) = &last_will {
                    if let Err(e) = publisher.try_publish(Message::retained(topic.as_str(), ONLINE)) {
                        tracing::warn!("Failed to publish online state: {}", e);
                    }
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("MQTT connection error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Data goes out at QoS 0; retained state flags at QoS 1.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    fn qos(message: &Message) -> QoS {
        if message.retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        }
    }

    /// Queues `message` without waiting for room in the request queue.
    pub fn try_publish(&self, message: Message) -> Result<(), PublishError> {
        let qos = Self::qos(&message);
        self.client
            .try_publish(message.topic, qos, message.retain, message.payload)?;

        Ok(())
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, message: Message) -> Result<(), PublishError> {
        let qos = Self::qos(&message);
        self.client
            .publish(message.topic, qos, message.retain, message.payload)
            .await?;

        Ok(())
    }
}
