//! AMQP event publisher.
//!
//! One durable topic exchange carries every downstream event; the routing
//! key is the event type and the message id is the outbox dedupe key.
//! Publisher confirms are enabled so a publish only counts once the broker
//! has accepted the message.

use crate::error::CoreError;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

/// Name of the topic exchange all core events are routed through.
pub const EXCHANGE: &str = "tro.events";

pub struct EventPublisher {
    // The channel dies with its connection, so the connection is kept alive here.
    _connection: Connection,
    channel: Channel,
}

impl EventPublisher {
    /// Connect to the broker and declare the durable topic exchange.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let connection = Connection::connect(
            url,
            ConnectionProperties::default().with_connection_name("tro-publisher".into()),
        )
        .await?;

        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        channel
            .exchange_declare(
                EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(exchange = EXCHANGE, "Broker exchange declared");

        Ok(Self {
            _connection: connection,
            channel,
        })
    }

    /// Publish one JSON payload, waiting for the broker's acknowledgement.
    #[tracing::instrument(skip_all, err, fields(routing_key = routing_key, message_id = dedupe_key))]
    pub async fn publish(
        &self,
        routing_key: &str,
        dedupe_key: &str,
        payload: &[u8],
    ) -> Result<(), CoreError> {
        let properties = BasicProperties::default()
            .with_message_id(dedupe_key.to_string().into())
            .with_content_type("application/json".into());

        let confirmation = self
            .channel
            .basic_publish(
                EXCHANGE,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await?
            .await?;

        match confirmation {
            Confirmation::Nack(_) => Err(CoreError::Transient(format!(
                "broker nacked publish of {routing_key}"
            ))),
            _ => Ok(()),
        }
    }
}
