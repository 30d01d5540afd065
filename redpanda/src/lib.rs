//! Kafka event bus for the FRANC portal.
//!
//! This crate provides the Kafka-compatible publisher behind the
//! [`EventBus`] trait from `franc-portal-core`. It uses rdkafka and works
//! against Redpanda, Apache Kafka or any managed Kafka service.
//!
//! # Delivery Semantics
//!
//! **Best effort, keyed by change number**:
//! - Every message is keyed by [`SerializedEvent::key`] (the change number), so
//!   all events for one change land on one partition in order
//! - `acks=all` by default; a send that is not acknowledged within the
//!   timeout fails with [`EventBusError::Timeout`]
//! - There are no retries beyond librdkafka's own; the caller decides what a
//!   failure means (the portal still accepts the request)
//!
//! When publishing is switched off the portal uses [`NoopEventBus`], which
//! reports itself as disabled and drops every event.
//!
//! # Example
//!
//! ```no_run
//! use franc_portal_redpanda::{RedpandaEventBus, SecurityProtocol};
//! use franc_portal_core::event_bus::EventBus;
//! use franc_portal_core::event::SerializedEvent;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let event_bus = RedpandaEventBus::builder()
//!     .brokers("broker-1:9092,broker-2:9092")
//!     .security_protocol(SecurityProtocol::SaslSsl)
//!     .sasl("SCRAM-SHA-512", "portal", "secret")
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let event = SerializedEvent::new(
//!     "device_connection".to_string(),
//!     "CHG-1".to_string(),
//!     br#"{"change_number":"CHG-1"}"#.to_vec(),
//!     None,
//! );
//! event_bus.publish("franc.device.connection", &event).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use franc_portal_core::event::SerializedEvent;
use franc_portal_core::event_bus::{BusFuture, EventBus, EventBusError};
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Default producer send timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the client talks to the brokers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SecurityProtocol {
    /// No TLS, no SASL
    #[default]
    Plaintext,
    /// TLS
    Ssl,
    /// SASL without TLS
    SaslPlaintext,
    /// SASL over TLS
    SaslSsl,
}

impl SecurityProtocol {
    /// librdkafka name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }

    /// Whether SASL credentials are needed
    #[must_use]
    pub const fn uses_sasl(self) -> bool {
        matches!(self, Self::SaslPlaintext | Self::SaslSsl)
    }
}

impl fmt::Display for SecurityProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityProtocol {
    type Err = EventBusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAINTEXT" => Ok(Self::Plaintext),
            "SSL" => Ok(Self::Ssl),
            "SASL_PLAINTEXT" => Ok(Self::SaslPlaintext),
            "SASL_SSL" => Ok(Self::SaslSsl),
            other => Err(EventBusError::Configuration(format!(
                "unknown security protocol '{other}'"
            ))),
        }
    }
}

#[derive(Clone)]
struct SaslCredentials {
    mechanism: String,
    username: String,
    password: String,
}

/// Kafka event bus implementation.
///
/// Cheap to share behind an `Arc<dyn EventBus>`; the underlying producer is
/// thread-safe and batches sends internally.
pub struct RedpandaEventBus {
    /// Kafka producer for publishing events
    producer: FutureProducer,
    /// Broker addresses
    brokers: String,
    /// Producer timeout
    timeout: Duration,
}

impl fmt::Debug for RedpandaEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedpandaEventBus")
            .field("brokers", &self.brokers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RedpandaEventBus {
    /// Create an event bus for `brokers` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the producer cannot be
    /// created.
    pub fn new(brokers: &str) -> Result<Self, EventBusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the event bus.
    #[must_use]
    pub fn builder() -> RedpandaEventBusBuilder {
        RedpandaEventBusBuilder::default()
    }

    /// Get a reference to the brokers string.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Builder for configuring a [`RedpandaEventBus`].
#[derive(Default, Clone)]
pub struct RedpandaEventBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
    client_id: Option<String>,
    security_protocol: SecurityProtocol,
    sasl: Option<SaslCredentials>,
    ssl_ca_location: Option<String>,
    ssl_certificate_location: Option<String>,
    ssl_key_location: Option<String>,
}

impl RedpandaEventBusBuilder {
    /// Set the broker addresses (comma-separated).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgment mode: "0", "1" or "all".
    ///
    /// Default: "all"
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec.
    ///
    /// Default: "none"
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 10 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the client id reported to the brokers.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the security protocol.
    #[must_use]
    pub const fn security_protocol(mut self, protocol: SecurityProtocol) -> Self {
        self.security_protocol = protocol;
        self
    }

    /// Set SASL mechanism and credentials.
    #[must_use]
    pub fn sasl(
        mut self,
        mechanism: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.sasl = Some(SaslCredentials {
            mechanism: mechanism.into(),
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Set TLS material: CA bundle, client certificate and client key paths.
    #[must_use]
    pub fn ssl_files(
        mut self,
        ca_location: Option<String>,
        certificate_location: Option<String>,
        key_location: Option<String>,
    ) -> Self {
        self.ssl_ca_location = ca_location;
        self.ssl_certificate_location = certificate_location;
        self.ssl_key_location = key_location;
        self
    }

    /// The librdkafka producer configuration this builder describes.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if no brokers are set, or
    /// [`EventBusError::Configuration`] if a SASL protocol has no credentials.
    pub fn client_config(&self) -> Result<ClientConfig, EventBusError> {
        let brokers = self
            .brokers
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| EventBusError::ConnectionFailed("Brokers not configured".to_string()))?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", self.producer_acks.as_deref().unwrap_or("all"))
            .set("compression.type", self.compression.as_deref().unwrap_or("none"))
            .set("security.protocol", self.security_protocol.as_str());

        if let Some(client_id) = &self.client_id {
            config.set("client.id", client_id);
        }

        if self.security_protocol.uses_sasl() {
            let sasl = self.sasl.as_ref().ok_or_else(|| {
                EventBusError::Configuration(format!(
                    "{} requires a SASL mechanism, username and password",
                    self.security_protocol
                ))
            })?;
            config
                .set("sasl.mechanism", &sasl.mechanism)
                .set("sasl.username", &sasl.username)
                .set("sasl.password", &sasl.password);
        }

        for (key, value) in [
            ("ssl.ca.location", &self.ssl_ca_location),
            ("ssl.certificate.location", &self.ssl_certificate_location),
            ("ssl.key.location", &self.ssl_key_location),
        ] {
            if let Some(path) = value {
                config.set(key, path);
            }
        }

        Ok(config)
    }

    /// Build the [`RedpandaEventBus`].
    ///
    /// # Errors
    ///
    /// See [`RedpandaEventBusBuilder::client_config`]; also returns
    /// [`EventBusError::ConnectionFailed`] if the producer cannot be created.
    pub fn build(self) -> Result<RedpandaEventBus, EventBusError> {
        let config = self.client_config()?;
        let producer: FutureProducer = config.create().map_err(|e| {
            EventBusError::ConnectionFailed(format!("Failed to create producer: {e}"))
        })?;

        let brokers = self.brokers.unwrap_or_default();
        tracing::info!(
            brokers = %brokers,
            acks = self.producer_acks.as_deref().unwrap_or("all"),
            security_protocol = %self.security_protocol,
            "RedpandaEventBus created"
        );

        Ok(RedpandaEventBus {
            producer,
            brokers,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

fn publish_error(topic: String, error: &KafkaError, timeout: Duration) -> EventBusError {
    if error.rdkafka_error_code() == Some(RDKafkaErrorCode::MessageTimedOut) {
        return EventBusError::Timeout {
            topic,
            seconds: timeout.as_secs(),
        };
    }
    EventBusError::PublishFailed {
        topic,
        reason: error.to_string(),
    }
}

impl EventBus for RedpandaEventBus {
    fn publish(&self, topic: &str, event: &SerializedEvent) -> BusFuture<'_> {
        // Clone data before moving into async block
        let topic = topic.to_string();
        let event = event.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let started = Instant::now();
            let headers = OwnedHeaders::new().insert(Header {
                key: "event_type",
                value: Some(event.event_type.as_str()),
            });
            let record = FutureRecord::to(&topic)
                .payload(&event.data)
                .key(event.key.as_bytes())
                .headers(headers);

            match self.producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => {
                    metrics::counter!("event_bus_messages_published_total").increment(1);
                    metrics::histogram!("event_bus_publish_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::debug!(
                        topic = %topic,
                        partition,
                        offset,
                        key = %event.key,
                        event_type = %event.event_type,
                        "Event published"
                    );
                    Ok(())
                },
                Err((kafka_error, _)) => {
                    metrics::counter!("event_bus_publish_errors_total").increment(1);
                    tracing::error!(
                        topic = %topic,
                        key = %event.key,
                        error = %kafka_error,
                        "Failed to publish event"
                    );
                    Err(publish_error(topic, &kafka_error, timeout))
                },
            }
        })
    }

    fn check_connection(&self) -> BusFuture<'_> {
        let producer = self.producer.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let probe = tokio::task::spawn_blocking(move || {
                producer
                    .client()
                    .fetch_metadata(None, Timeout::After(timeout))
                    .map(|metadata| metadata.brokers().len())
            })
            .await
            .map_err(|e| EventBusError::ConnectionFailed(e.to_string()))?;

            match probe {
                Ok(brokers) => {
                    tracing::debug!(brokers, "Broker metadata fetched");
                    Ok(())
                },
                Err(e) => Err(EventBusError::ConnectionFailed(e.to_string())),
            }
        })
    }
}

/// Event bus used when publishing is switched off.
///
/// Every publish succeeds without sending anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventBus;

impl NoopEventBus {
    /// Create a no-op bus
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventBus for NoopEventBus {
    fn publish(&self, topic: &str, event: &SerializedEvent) -> BusFuture<'_> {
        tracing::debug!(topic, key = %event.key, "Event bus disabled, dropping event");
        Box::pin(async { Ok(()) })
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn redpanda_event_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaEventBus>();
        assert_sync::<RedpandaEventBus>();
    }

    #[test]
    fn defaults_wait_for_all_replicas() {
        let config = RedpandaEventBus::builder()
            .brokers("localhost:9092")
            .client_config()
            .unwrap();
        assert_eq!(config.get("acks"), Some("all"));
        assert_eq!(config.get("message.timeout.ms"), Some("10000"));
        assert_eq!(config.get("security.protocol"), Some("PLAINTEXT"));
        assert_eq!(config.get("sasl.mechanism"), None);
    }

    #[test]
    fn missing_brokers_is_rejected() {
        let err = RedpandaEventBus::builder().brokers("  ").client_config().unwrap_err();
        assert_eq!(
            err,
            EventBusError::ConnectionFailed("Brokers not configured".to_string())
        );
    }

    #[test]
    fn sasl_protocol_requires_credentials() {
        let err = RedpandaEventBus::builder()
            .brokers("b:9092")
            .security_protocol(SecurityProtocol::SaslSsl)
            .client_config()
            .unwrap_err();
        assert!(matches!(err, EventBusError::Configuration(_)));

        let config = RedpandaEventBus::builder()
            .brokers("b:9092")
            .security_protocol(SecurityProtocol::SaslSsl)
            .sasl("PLAIN", "portal", "secret")
            .ssl_files(Some("/etc/ca.pem".to_string()), None, None)
            .timeout(Duration::from_secs(3))
            .client_config()
            .unwrap();
        assert_eq!(config.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(config.get("sasl.username"), Some("portal"));
        assert_eq!(config.get("ssl.ca.location"), Some("/etc/ca.pem"));
        assert_eq!(config.get("ssl.key.location"), None);
        assert_eq!(config.get("message.timeout.ms"), Some("3000"));
    }

    #[test]
    fn security_protocol_parses_case_insensitively() {
        assert_eq!("sasl_ssl".parse::<SecurityProtocol>(), Ok(SecurityProtocol::SaslSsl));
        assert_eq!("PLAINTEXT".parse::<SecurityProtocol>(), Ok(SecurityProtocol::Plaintext));
        assert!("KERBEROS".parse::<SecurityProtocol>().is_err());
    }

    #[tokio::test]
    async fn noop_bus_is_disabled_and_accepts_everything() {
        let bus = NoopEventBus::new();
        let event = SerializedEvent::new(
            "pop_deployment".to_string(),
            "CHG-1".to_string(),
            b"{}".to_vec(),
            None,
        );
        assert!(!bus.is_enabled());
        assert_eq!(bus.publish("franc.pop.deployment", &event).await, Ok(()));
        assert_eq!(bus.check_connection().await, Ok(()));
    }
}
