use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{DeviceEnvironment, RegistrationGate, RegistrationStore};
use crate::{
    backend::{BackendClient, BackendError, DeviceRegisterPayload},
    log_debug, log_error, log_info, log_warn,
};

const ENABLE_LOGS: bool = true;

#[async_trait]
pub trait RegistrationTransport: Send + Sync {
    async fn register(&self, payload: &DeviceRegisterPayload) -> Result<(), BackendError>;
}

#[async_trait]
impl RegistrationTransport for BackendClient {
    async fn register(&self, payload: &DeviceRegisterPayload) -> Result<(), BackendError> {
        self.register_device(payload).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// One entry per attempt; the delay follows a transient failure.
    pub retry_delays: Vec<Duration>,
    /// How long a failed signature is left alone.
    pub failure_cooldown: Duration,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            retry_delays: vec![
                Duration::from_millis(500),
                Duration::from_millis(1500),
                Duration::from_millis(3000),
            ],
            failure_cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unchanged,
    CoolingDown,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Skipped(SkipReason),
    Registered,
    Failed,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct DeviceRegistrar {
    store: RegistrationStore,
    transport: Arc<dyn RegistrationTransport>,
    environment: Arc<dyn DeviceEnvironment>,
    gate: Arc<RegistrationGate>,
    policy: RegistrationPolicy,
    clock: Clock,
}

impl DeviceRegistrar {
    pub fn new(
        store: RegistrationStore,
        transport: Arc<dyn RegistrationTransport>,
        environment: Arc<dyn DeviceEnvironment>,
    ) -> Self {
        Self {
            store,
            transport,
            environment,
            gate: Arc::new(RegistrationGate::new()),
            policy: RegistrationPolicy::default(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the wall clock used for the failure cool-down.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &RegistrationStore {
        &self.store
    }

    pub async fn store_token(&self, token: &str) -> Result<()> {
        self.store
            .store_token(token)
            .await
            .context("Failed to cache push token")
    }

    /// Registers the cached token, if there is one.
    pub async fn register_cached(&self, force: bool) -> Option<RegistrationOutcome> {
        match self.store.cached_token().await {
            Ok(Some(token)) => Some(self.register_if_needed(&token, force).await),
            Ok(None) => None,
            Err(err) => {
                log_error!("Failed to read cached push token: {err:?}");
                None
            }
        }
    }

    /// Never fails; problems are logged and reported as `Failed`.
    pub async fn register_if_needed(&self, token: &str, force: bool) -> RegistrationOutcome {
        let push_enabled = self.environment.push_enabled();
        let timezone = self.environment.timezone();
        let apns_environment = self.environment.apns_environment();
        let signature = format!(
            "{token}|{push_enabled}|{timezone}|{}",
            apns_environment.map_or("none", |env| env.as_str())
        );

        log_debug!("Device registration signature {signature} (force: {force})");

        if !force {
            if let Some(reason) = self.skip_reason(&signature).await {
                log_info!("Device registration skipped: {reason:?}");
                return RegistrationOutcome::Skipped(reason);
            }
        }

        let Some(_guard) = self.gate.try_acquire() else {
            log_info!("Device registration already in progress; dropping duplicate");
            return RegistrationOutcome::Skipped(SkipReason::InFlight);
        };

        let install_id = match self.store.install_id().await {
            Ok(id) => id,
            Err(err) => {
                log_error!("Failed to load install id: {err:?}");
                return RegistrationOutcome::Failed;
            }
        };

        let payload = DeviceRegisterPayload {
            install_id,
            device_token: token.to_string(),
            timezone,
            push_enabled,
            apns_environment,
        };

        match self.send_with_retry(&payload).await {
            Ok(()) => {
                if let Err(err) = self.store.record_success(&signature).await {
                    log_error!("Failed to record device registration: {err:?}");
                }
                log_info!("Device registered with backend");
                RegistrationOutcome::Registered
            }
            Err(err) => {
                let now = (self.clock)();
                if let Err(store_err) = self.store.record_failure(&signature, now).await {
                    log_error!("Failed to record registration failure: {store_err:?}");
                }
                log_error!("Failed to register device with backend: {err}");
                RegistrationOutcome::Failed
            }
        }
    }

    async fn skip_reason(&self, signature: &str) -> Option<SkipReason> {
        match self.store.last_sent_signature().await {
            Ok(Some(last)) if last == signature => return Some(SkipReason::Unchanged),
            Ok(_) => {}
            Err(err) => {
                log_warn!("Failed to read last sent signature: {err:?}");
            }
        }

        match self.store.last_failure().await {
            Ok(Some((failed, at))) if failed == signature => {
                let elapsed = (self.clock)().signed_duration_since(at);
                let cooling = elapsed
                    .to_std()
                    .map_or(true, |elapsed| elapsed < self.policy.failure_cooldown);
                cooling.then_some(SkipReason::CoolingDown)
            }
            Ok(_) => None,
            Err(err) => {
                log_warn!("Failed to read last registration failure: {err:?}");
                None
            }
        }
    }

    async fn send_with_retry(&self, payload: &DeviceRegisterPayload) -> Result<(), BackendError> {
        let mut last_error = BackendError::Unexpected("no attempts configured".to_string());

        for (attempt, delay) in self.policy.retry_delays.iter().enumerate() {
            match self.transport.register(payload).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() => {
                    log_warn!(
                        "Device register failed (attempt {}), retrying: {err}",
                        attempt + 1
                    );
                    tokio::time::sleep(*delay).await;
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::ApnsEnvironment, db::Database};
    use chrono::TimeZone;
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
    };
    use tempfile::TempDir;
    use tokio::{sync::Notify, time::Instant};

    #[derive(Default)]
    struct FakeTransport {
        responses: Mutex<VecDeque<Result<(), BackendError>>>,
        calls: Mutex<Vec<(DeviceRegisterPayload, Instant)>>,
        hold: Option<Arc<Notify>>,
        entered: Arc<Notify>,
    }

    impl FakeTransport {
        fn with_responses(responses: Vec<Result<(), BackendError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RegistrationTransport for FakeTransport {
        async fn register(&self, payload: &DeviceRegisterPayload) -> Result<(), BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push((payload.clone(), Instant::now()));
            self.entered.notify_one();
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            self.responses.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    struct FakeEnvironment {
        push_enabled: AtomicBool,
    }

    impl DeviceEnvironment for FakeEnvironment {
        fn push_enabled(&self) -> bool {
            self.push_enabled.load(Ordering::SeqCst)
        }

        fn timezone(&self) -> String {
            "America/New_York".to_string()
        }

        fn apns_environment(&self) -> Option<ApnsEnvironment> {
            Some(ApnsEnvironment::Sandbox)
        }
    }

    struct Harness {
        _dir: TempDir,
        registrar: DeviceRegistrar,
        transport: Arc<FakeTransport>,
        environment: Arc<FakeEnvironment>,
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    fn status(code: u16) -> Result<(), BackendError> {
        Err(BackendError::Status {
            status: code,
            body: "<empty>".into(),
        })
    }

    fn harness(transport: FakeTransport) -> Harness {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("withyou.sqlite3")).unwrap();
        let transport = Arc::new(transport);
        let environment = Arc::new(FakeEnvironment {
            push_enabled: AtomicBool::new(true),
        });
        let now = Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(2026, 2, 9, 12, 0, 0).unwrap(),
        ));
        let clock_now = now.clone();
        let registrar = DeviceRegistrar::new(
            RegistrationStore::new(db),
            transport.clone(),
            environment.clone(),
        )
        .with_clock(move || *clock_now.lock().unwrap());

        Harness {
            _dir: dir,
            registrar,
            transport,
            environment,
            now,
        }
    }

    #[tokio::test]
    async fn unchanged_signature_is_sent_once() {
        let h = harness(FakeTransport::default());

        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Skipped(SkipReason::Unchanged)
        );
        assert_eq!(h.transport.call_count(), 1);

        let (payload, _) = h.transport.calls.lock().unwrap()[0].clone();
        assert_eq!(payload.device_token, "tok");
        assert_eq!(payload.timezone, "America/New_York");
        assert!(payload.push_enabled);
        assert_eq!(payload.apns_environment, Some(ApnsEnvironment::Sandbox));
        assert_eq!(
            payload.install_id,
            h.registrar.store().install_id().await.unwrap()
        );
    }

    #[tokio::test]
    async fn changed_push_permission_registers_again() {
        let h = harness(FakeTransport::default());
        h.registrar.register_if_needed("tok", false).await;
        h.environment.push_enabled.store(false, Ordering::SeqCst);

        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(h.transport.call_count(), 2);
        assert!(!h.transport.calls.lock().unwrap()[1].0.push_enabled);
    }

    #[tokio::test]
    async fn force_bypasses_dedup() {
        let h = harness(FakeTransport::default());
        h.registrar.register_if_needed("tok", false).await;
        assert_eq!(
            h.registrar.register_if_needed("tok", true).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(h.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn permanent_failure_stops_after_one_attempt() {
        let h = harness(FakeTransport::with_responses(vec![status(400)]));
        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Failed
        );
        assert_eq!(h.transport.call_count(), 1);

        let (signature, at) = h.registrar.store().last_failure().await.unwrap().unwrap();
        assert!(signature.starts_with("tok|true|America/New_York|sandbox"));
        assert_eq!(at, *h.now.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_on_schedule() {
        let h = harness(FakeTransport::with_responses(vec![
            status(500),
            status(500),
            status(500),
        ]));

        let started = Instant::now();
        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Failed
        );

        let calls = h.transport.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].1 - calls[0].1, Duration::from_millis(500));
        assert_eq!(calls[2].1 - calls[1].1, Duration::from_millis(1500));
        assert!(started.elapsed() >= Duration::from_secs(5));

        let (signature, at) = h.registrar.store().last_failure().await.unwrap().unwrap();
        assert_eq!(signature, "tok|true|America/New_York|sandbox");
        assert_eq!(at, *h.now.lock().unwrap());
        assert_eq!(h.registrar.store().last_sent_signature().await.unwrap(), None);

        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Skipped(SkipReason::CoolingDown)
        );
        assert_eq!(h.transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_then_success() {
        let h = harness(FakeTransport::with_responses(vec![
            status(429),
            Err(BackendError::Connectivity("timed out".into())),
            Ok(()),
        ]));
        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(h.transport.call_count(), 3);
        assert_eq!(h.registrar.store().last_failure().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_signature_cools_down() {
        let h = harness(FakeTransport::with_responses(vec![status(400)]));
        h.registrar.register_if_needed("tok", false).await;

        *h.now.lock().unwrap() += chrono::Duration::seconds(30);
        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Skipped(SkipReason::CoolingDown)
        );
        assert_eq!(h.transport.call_count(), 1);

        // A different token is not affected by the cool-down.
        assert_eq!(
            h.registrar.register_if_needed("other", false).await,
            RegistrationOutcome::Registered
        );

        *h.now.lock().unwrap() += chrono::Duration::seconds(31);
        assert_eq!(
            h.registrar.register_if_needed("tok", false).await,
            RegistrationOutcome::Registered
        );
        assert_eq!(h.transport.call_count(), 3);
    }

    #[tokio::test]
    async fn force_bypasses_cooldown() {
        let h = harness(FakeTransport::with_responses(vec![status(400)]));
        h.registrar.register_if_needed("tok", false).await;
        assert_eq!(
            h.registrar.register_if_needed("tok", true).await,
            RegistrationOutcome::Registered
        );
    }

    #[tokio::test]
    async fn concurrent_call_is_dropped() {
        let hold = Arc::new(Notify::new());
        let transport = FakeTransport {
            hold: Some(hold.clone()),
            ..FakeTransport::default()
        };
        let h = harness(transport);
        let entered = h.transport.entered.clone();

        let first = {
            let registrar = h.registrar.clone();
            tokio::spawn(async move { registrar.register_if_needed("tok-a", false).await })
        };
        entered.notified().await;

        assert_eq!(
            h.registrar.register_if_needed("tok-b", false).await,
            RegistrationOutcome::Skipped(SkipReason::InFlight)
        );
        assert_eq!(
            h.registrar.register_if_needed("tok-a", true).await,
            RegistrationOutcome::Skipped(SkipReason::InFlight)
        );

        hold.notify_one();
        assert_eq!(first.await.unwrap(), RegistrationOutcome::Registered);
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn register_cached_uses_stored_token() {
        let h = harness(FakeTransport::default());
        assert_eq!(h.registrar.register_cached(false).await, None);

        h.registrar.store_token("cached").await.unwrap();
        assert_eq!(
            h.registrar.register_cached(false).await,
            Some(RegistrationOutcome::Registered)
        );
        assert_eq!(h.transport.calls.lock().unwrap()[0].0.device_token, "cached");
    }
}
