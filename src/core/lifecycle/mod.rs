use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleState {
    Init,
    Starting,
    Ready,
    Shutdown,
}

/// A long-running piece of the process (the HTTP API, for now).
#[async_trait::async_trait]
pub trait LifecycleComponent {
    fn name(&self) -> &'static str;

    async fn on_init(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

pub type SharedComponent = Arc<Mutex<dyn LifecycleComponent + Send + Sync>>;

/// Drives attached components through init, start and shutdown, and owns
/// the cron scheduler that periodic jobs are registered on.
pub struct LifecycleManager {
    state: LifecycleState,
    components: Vec<SharedComponent>,
    scheduler: JobScheduler,
}

impl LifecycleManager {
    pub async fn new() -> Result<Self> {
        Ok(Self {
            state: LifecycleState::Init,
            components: Vec::new(),
            scheduler: JobScheduler::new().await?,
        })
    }

    pub fn attach(&mut self, component: SharedComponent) {
        self.components.push(component);
    }

    /// Jobs only fire once `start` has brought the scheduler up.
    pub async fn schedule(&mut self, job: Job) -> Result<()> {
        self.scheduler.add(job).await?;
        Ok(())
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub async fn start(&mut self) -> Result<()> {
        self.state = LifecycleState::Init;
        for component in &self.components {
            let mut component = component.lock().await;
            let name = component.name();
            component
                .on_init()
                .await
                .with_context(|| format!("{name} failed to initialize"))?;
        }

        self.state = LifecycleState::Starting;
        for component in &self.components {
            let mut component = component.lock().await;
            let name = component.name();
            component
                .on_start()
                .await
                .with_context(|| format!("{name} failed to start"))?;
            info!("Component '{}' started", name);
        }

        self.scheduler.start().await?;
        self.state = LifecycleState::Ready;
        info!("All components ready");
        Ok(())
    }

    /// Stops the scheduler, then components in reverse attach order.
    /// Errors along the way are logged and skipped.
    pub async fn shutdown(&mut self) {
        self.state = LifecycleState::Shutdown;

        if let Err(e) = self.scheduler.shutdown().await {
            warn!("Scheduler did not stop cleanly: {}", e);
        }
        for component in self.components.iter().rev() {
            let mut component = component.lock().await;
            if let Err(e) = component.on_shutdown().await {
                warn!("Component '{}' shutdown error: {}", component.name(), e);
            }
        }
        info!("Shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    type Calls = Arc<std::sync::Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        calls: Calls,
        fail_start: bool,
        fail_shutdown: bool,
    }

    impl Recorder {
        fn shared(name: &'static str, calls: &Calls) -> SharedComponent {
            Arc::new(Mutex::new(Self {
                name,
                calls: calls.clone(),
                fail_start: false,
                fail_shutdown: false,
            }))
        }

        fn push(&self, phase: &str) {
            self.calls.lock().unwrap().push(format!("{}:{}", self.name, phase));
        }
    }

    #[async_trait::async_trait]
    impl LifecycleComponent for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn on_init(&mut self) -> Result<()> {
            self.push("init");
            Ok(())
        }
        async fn on_start(&mut self) -> Result<()> {
            self.push("start");
            if self.fail_start {
                return Err(anyhow!("port taken"));
            }
            Ok(())
        }
        async fn on_shutdown(&mut self) -> Result<()> {
            self.push("shutdown");
            if self.fail_shutdown {
                return Err(anyhow!("boom"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn shutdown_runs_in_reverse_and_swallows_errors() {
        let calls = Calls::default();
        let mut lifecycle = LifecycleManager::new().await.unwrap();
        lifecycle.attach(Recorder::shared("a", &calls));
        lifecycle.attach(Arc::new(Mutex::new(Recorder {
            name: "b",
            calls: calls.clone(),
            fail_start: false,
            fail_shutdown: true,
        })));

        lifecycle.start().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Ready);

        lifecycle.shutdown().await;
        assert_eq!(lifecycle.state(), LifecycleState::Shutdown);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["a:init", "b:init", "a:start", "b:start", "b:shutdown", "a:shutdown"]
        );
    }

    #[tokio::test]
    async fn start_failure_names_the_component() {
        let calls = Calls::default();
        let mut lifecycle = LifecycleManager::new().await.unwrap();
        lifecycle.attach(Arc::new(Mutex::new(Recorder {
            name: "api",
            calls: calls.clone(),
            fail_start: true,
            fail_shutdown: false,
        })));

        let err = lifecycle.start().await.unwrap_err();
        assert_eq!(err.to_string(), "api failed to start");
        assert_eq!(lifecycle.state(), LifecycleState::Starting);
    }
}
