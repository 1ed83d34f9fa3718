// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller configuration.

use std::time::Duration;

use crate::state::{DEFAULT_HEALTH_THRESHOLD, WritePolicy};
use crate::telemetry::{DEFAULT_NAMESPACE, DEFAULT_SENSOR_PREFIX, TopicScheme};

/// Runtime settings of a [`Controller`](crate::Controller).
///
/// # Examples
///
/// ```
/// use brigid::ControllerConfig;
/// use std::time::Duration;
///
/// let config = ControllerConfig::default()
///     .with_namespace("house")
///     .with_reconcile_interval(Duration::from_secs(10));
///
/// assert_eq!(config.scheme().command_topic("heater"), "house/cmnd/heater/Power");
/// assert!(config.subscriptions().contains(&"house/stat/+/POWER".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    scheme: TopicScheme,
    reconcile_interval: Duration,
    heartbeat_interval: Duration,
    health_threshold: Duration,
    write_policy: WritePolicy,
    subscriptions: Option<Vec<String>>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scheme: TopicScheme::default(),
            reconcile_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
            health_threshold: DEFAULT_HEALTH_THRESHOLD,
            write_policy: WritePolicy::default(),
            subscriptions: None,
        }
    }
}

impl ControllerConfig {
    /// Sets the Tasmota topic namespace (default: `outlet`).
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.scheme = TopicScheme::new(namespace, self.scheme.sensor_prefix());
        self
    }

    /// Sets the zigbee sensor topic prefix
    /// (default: `zigbee2mqtt/sensors/WSDCGQ11LM`).
    #[must_use]
    pub fn with_sensor_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.scheme = TopicScheme::new(self.scheme.namespace(), prefix);
        self
    }

    /// Sets the reconciliation period (default: 5 seconds).
    #[must_use]
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// Sets the ingestion heartbeat period (default: 5 seconds).
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the maximum heartbeat age for a healthy report
    /// (default: 600 seconds).
    #[must_use]
    pub fn with_health_threshold(mut self, threshold: Duration) -> Self {
        self.health_threshold = threshold;
        self
    }

    /// Sets the store write policy (default: arrival order).
    #[must_use]
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Overrides the topic filters returned by [`subscriptions`](Self::subscriptions).
    #[must_use]
    pub fn with_subscriptions<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscriptions = Some(filters.into_iter().map(Into::into).collect());
        self
    }

    /// The topic layout.
    #[must_use]
    pub fn scheme(&self) -> &TopicScheme {
        &self.scheme
    }

    /// The reconciliation period.
    #[must_use]
    pub const fn reconcile_interval(&self) -> Duration {
        self.reconcile_interval
    }

    /// The ingestion heartbeat period.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// The health check threshold.
    #[must_use]
    pub const fn health_threshold(&self) -> Duration {
        self.health_threshold
    }

    /// The store write policy.
    #[must_use]
    pub const fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Topic filters to subscribe to.
    ///
    /// Derived from the topic layout unless overridden.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .clone()
            .unwrap_or_else(|| self.scheme.subscriptions())
    }
}
