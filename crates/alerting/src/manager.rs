//! Alert Manager Implementation

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{AlertChannelConfig, AlertChannels, AlertConfig, Channel, ChannelError};

/// Alert gate and dispatcher.
///
/// Holds the single cooldown window shared by every detection source: once an
/// alert passes the gate, no other alert is dispatched until `cooldown_secs`
/// have elapsed.
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Channel implementations
    channels: AlertChannels,
    /// Time the last alert passed the gate
    last_alert_time: Mutex<Option<Instant>>,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig, channels: AlertChannels) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            channels,
            last_alert_time: Mutex::new(None),
        }
    }

    /// Cooldown between dispatched alerts
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.config.cooldown_secs)
    }

    /// Check the cooldown window and claim it if it is open.
    ///
    /// The check and the update happen under one lock, so concurrent callers
    /// cannot both pass.
    pub fn should_send_alert(&self) -> bool {
        let cooldown = self.cooldown();
        let mut last = self
            .last_alert_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < cooldown {
                info!(
                    "Alert in cooldown, {:.1}s remaining",
                    (cooldown - elapsed).as_secs_f64()
                );
                return false;
            }
        }

        *last = Some(now);
        true
    }

    /// Time left before the gate reopens
    pub fn remaining_cooldown(&self) -> Option<Duration> {
        let last = self
            .last_alert_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = (*last)?;
        self.cooldown()
            .checked_sub(Instant::now().saturating_duration_since(previous))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Force the next alert through regardless of elapsed time
    pub fn reset_cooldown(&self) {
        *self
            .last_alert_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        info!("Alert cooldown reset");
    }

    /// Send an alert to every enabled channel.
    ///
    /// Returns true if at least one channel delivered it. Returns false
    /// without contacting any channel while the cooldown is active.
    pub async fn send_alert(
        &self,
        detection_type: &str,
        confidence: f64,
        timestamp: &str,
        config: &AlertChannelConfig,
    ) -> bool {
        if !self.should_send_alert() {
            metrics::counter!("armsight_alerts_suppressed_total").increment(1);
            return false;
        }

        let message = format_alert_message(detection_type, confidence, timestamp);
        let title = format!("🚨 Alert: {}", detection_type.to_uppercase());

        let sms = async {
            match config.sms_target() {
                Some(to) => Some(
                    self.dispatch(Channel::Sms, self.channels.sms.send_sms(to, &message))
                        .await,
                ),
                None => None,
            }
        };
        let push = async {
            match config.push_target() {
                Some(token) => Some(
                    self.dispatch(
                        Channel::Push,
                        self.channels.push.send_push(token, &title, &message),
                    )
                    .await,
                ),
                None => None,
            }
        };
        let email = async {
            match config.email_target() {
                Some(to) => Some(
                    self.dispatch(
                        Channel::Email,
                        self.channels.email.send_email(to, &title, &message),
                    )
                    .await,
                ),
                None => None,
            }
        };

        let (sms, push, email) = tokio::join!(sms, push, email);
        let sent = [sms, push, email].into_iter().flatten().any(|delivered| delivered);

        if sent {
            metrics::counter!("armsight_alerts_sent_total").increment(1);
            info!("Alert dispatched: {} ({:.2})", detection_type, confidence);
        } else {
            warn!("Alert for {} was not delivered on any channel", detection_type);
        }
        sent
    }

    /// Run one channel send under the configured timeout
    async fn dispatch<F>(&self, channel: Channel, send: F) -> bool
    where
        F: Future<Output = Result<(), ChannelError>>,
    {
        let timeout_secs = self.config.channel_timeout_secs;
        let result = match tokio::time::timeout(Duration::from_secs(timeout_secs), send).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(timeout_secs)),
        };

        match result {
            Ok(()) => {
                debug!("{} alert delivered", channel);
                true
            }
            Err(e) if e.is_unavailable() => {
                warn!("{} alert not sent: {}", channel, e);
                false
            }
            Err(e) => {
                metrics::counter!("armsight_channel_failures_total", "channel" => channel.as_str())
                    .increment(1);
                error!("{} alert failed: {}", channel, e);
                false
            }
        }
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default(), AlertChannels::unavailable())
    }
}

/// Human-readable alert body
pub fn format_alert_message(detection_type: &str, confidence: f64, timestamp: &str) -> String {
    format!(
        "🚨 SECURITY ALERT 🚨\n\n\
         Detected: {}\n\
         Confidence: {:.1}%\n\
         Time: {}\n\n\
         Check the security cameras immediately.",
        detection_type.to_uppercase(),
        confidence * 100.0,
        timestamp
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmailSender, PushSender, SmsSender, UnavailableChannel};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Channel double recording calls; succeeds unless `fail` is set
    #[derive(Default)]
    struct MockChannel {
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockChannel {
        fn ok() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Default::default()
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay: Some(delay),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn respond(&self) -> Result<(), ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                Err(ChannelError::Provider {
                    status: 500,
                    body: "provider down".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SmsSender for MockChannel {
        async fn send_sms(&self, _to: &str, _body: &str) -> Result<(), ChannelError> {
            self.respond().await
        }
    }

    #[async_trait]
    impl PushSender for MockChannel {
        async fn send_push(&self, _token: &str, _title: &str, _body: &str) -> Result<(), ChannelError> {
            self.respond().await
        }
    }

    #[async_trait]
    impl EmailSender for MockChannel {
        async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), ChannelError> {
            self.respond().await
        }
    }

    fn sms_only() -> AlertChannelConfig {
        AlertChannelConfig {
            phone_number: Some("+15550001111".to_string()),
            enable_sms: true,
            enable_push: false,
            ..Default::default()
        }
    }

    fn all_channels() -> AlertChannelConfig {
        AlertChannelConfig {
            phone_number: Some("+15550001111".to_string()),
            fcm_token: Some("device-token".to_string()),
            email: Some("ops@example.com".to_string()),
            enable_sms: true,
            enable_push: true,
            enable_email: true,
        }
    }

    fn manager_with(
        sms: Arc<MockChannel>,
        push: Arc<MockChannel>,
        email: Arc<MockChannel>,
    ) -> AlertManager {
        AlertManager::new(
            AlertConfig::default(),
            AlertChannels { sms, push, email },
        )
    }

    #[test]
    fn test_cooldown_gate() {
        let manager = AlertManager::default();

        assert!(manager.remaining_cooldown().is_none());
        assert!(manager.should_send_alert());
        assert!(!manager.should_send_alert());
        assert!(manager.remaining_cooldown().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expires() {
        let manager = AlertManager::default();
        assert!(manager.should_send_alert());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!manager.should_send_alert());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(manager.should_send_alert());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_check_does_not_extend_window() {
        let manager = AlertManager::default();
        assert!(manager.should_send_alert());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!manager.should_send_alert());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(manager.should_send_alert());
    }

    #[test]
    fn test_reset_cooldown() {
        let manager = AlertManager::default();
        assert!(manager.should_send_alert());
        assert!(!manager.should_send_alert());

        manager.reset_cooldown();
        assert!(manager.should_send_alert());
    }

    #[tokio::test]
    async fn test_single_channel_success() {
        let sms = MockChannel::ok();
        let manager = manager_with(sms.clone(), MockChannel::ok(), MockChannel::ok());

        assert!(manager.send_alert("pistol", 0.92, "2024-01-15T10:00:00", &sms_only()).await);
        assert_eq!(sms.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_channel_failure() {
        let sms = MockChannel::failing();
        let manager = manager_with(sms.clone(), MockChannel::ok(), MockChannel::ok());

        assert!(!manager.send_alert("pistol", 0.92, "2024-01-15T10:00:00", &sms_only()).await);
        assert_eq!(sms.calls(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_channel_reports_not_sent() {
        let manager = AlertManager::new(AlertConfig::default(), AlertChannels::unavailable());
        assert!(!manager.send_alert("knife", 0.7, "2024-01-15T10:00:00", &sms_only()).await);
    }

    #[tokio::test]
    async fn test_suppressed_alert_contacts_no_channel() {
        let (sms, push, email) = (MockChannel::ok(), MockChannel::ok(), MockChannel::ok());
        let manager = manager_with(sms.clone(), push.clone(), email.clone());

        assert!(manager.send_alert("rifle", 0.8, "t1", &all_channels()).await);
        assert!(!manager.send_alert("rifle", 0.8, "t2", &all_channels()).await);

        assert_eq!(sms.calls(), 1);
        assert_eq!(push.calls(), 1);
        assert_eq!(email.calls(), 1);
    }

    #[tokio::test]
    async fn test_one_failing_channel_does_not_block_others() {
        let (sms, push, email) = (MockChannel::failing(), MockChannel::ok(), MockChannel::failing());
        let manager = manager_with(sms.clone(), push.clone(), email.clone());

        assert!(manager.send_alert("pistol", 0.9, "t", &all_channels()).await);
        assert_eq!(sms.calls(), 1);
        assert_eq!(push.calls(), 1);
        assert_eq!(email.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_channels_are_skipped() {
        let (sms, push, email) = (MockChannel::ok(), MockChannel::ok(), MockChannel::ok());
        let manager = manager_with(sms.clone(), push.clone(), email.clone());

        let config = AlertChannelConfig {
            phone_number: Some("+15550001111".to_string()),
            enable_sms: false,
            enable_push: true,
            fcm_token: None,
            ..Default::default()
        };

        assert!(!manager.send_alert("pistol", 0.9, "t", &config).await);
        assert_eq!(sms.calls() + push.calls() + email.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_channel_times_out() {
        let sms = MockChannel::slow(Duration::from_secs(30));
        let manager = manager_with(sms.clone(), MockChannel::ok(), MockChannel::ok());

        assert!(!manager.send_alert("pistol", 0.9, "t", &sms_only()).await);
        assert_eq!(sms.calls(), 1);
    }

    #[tokio::test]
    async fn test_email_stub_never_delivers() {
        let manager = AlertManager::new(
            AlertConfig::default(),
            AlertChannels {
                sms: Arc::new(UnavailableChannel),
                push: Arc::new(UnavailableChannel),
                email: Arc::new(crate::UnimplementedEmail),
            },
        );
        let config = AlertChannelConfig {
            email: Some("ops@example.com".to_string()),
            enable_email: true,
            enable_push: false,
            ..Default::default()
        };

        assert!(!manager.send_alert("knife", 0.6, "t", &config).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gate_admits_one() {
        let manager = Arc::new(AlertManager::default());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.should_send_alert() })
            })
            .collect();

        let mut passed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                passed += 1;
            }
        }
        assert_eq!(passed, 1);
    }

    #[test]
    fn test_alert_message() {
        let message = format_alert_message("pistol", 0.876, "2024-01-15T10:30:00");
        assert!(message.starts_with("🚨 SECURITY ALERT 🚨"));
        assert!(message.contains("Detected: PISTOL"));
        assert!(message.contains("Confidence: 87.6%"));
        assert!(message.contains("Time: 2024-01-15T10:30:00"));
    }

    proptest! {
        #[test]
        fn prop_alerts_respect_cooldown(gaps in proptest::collection::vec(0u64..150, 1..40)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let fired = rt.block_on(async {
                let manager = AlertManager::default();
                let mut fired = Vec::new();
                for gap in gaps {
                    tokio::time::advance(Duration::from_secs(gap)).await;
                    if manager.should_send_alert() {
                        fired.push(Instant::now());
                    }
                }
                fired
            });

            prop_assert!(!fired.is_empty());
            for pair in fired.windows(2) {
                prop_assert!(pair[1] - pair[0] >= Duration::from_secs(60));
            }
        }
    }
}
