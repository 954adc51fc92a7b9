//! Registry of running editor instances.

use std::{io, process::Stdio, time::Duration};

use ide_bridge_client::BridgeClient;
use ide_bridge_core::{
    BridgeError, Endpoint, InstanceMap, InstanceStorage, ProcessId, Result, SessionDescriptor,
};
use ide_bridge_transport::WebSocketTransport;
use tokio::{process::Command, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    probe::{ProcessProbe, SysinfoProbe},
    storage::FileStorage,
};

/// How to start a new editor and how long to wait for it to register.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Executable name, looked up on `PATH`.
    pub program: String,
    /// Arguments placed before the project path.
    pub args: Vec<String>,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            program: "code".to_string(),
            args: Vec::new(),
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Maps instance names to bridge endpoints.
///
/// Every read goes back to storage, so instances registered by other
/// processes are seen immediately. Entries whose process has exited are
/// dropped on read.
pub struct InstanceRegistry<S, P = SysinfoProbe> {
    storage: S,
    probe: P,
}

impl InstanceRegistry<FileStorage, SysinfoProbe> {
    /// Registry file in the user's home directory, checked against the
    /// OS process table.
    ///
    /// # Errors
    /// Returns error if the home directory cannot be determined.
    pub fn user_default() -> Result<Self> {
        Ok(Self::new(FileStorage::user_default()?, SysinfoProbe::new()))
    }
}

impl<S, P> InstanceRegistry<S, P>
where
    S: InstanceStorage,
    P: ProcessProbe,
{
    #[must_use]
    pub const fn new(storage: S, probe: P) -> Self {
        Self { storage, probe }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Live instances keyed by process id.
    ///
    /// Storage is rewritten only when dead entries were removed.
    ///
    /// # Errors
    /// Returns error if storage cannot be read or rewritten.
    pub async fn instances(&self) -> Result<InstanceMap> {
        let mut instances = self.storage.load().await?;
        let before = instances.len();

        instances.retain(|pid, desc| {
            let alive = self.probe.is_alive(*pid);
            if !alive {
                debug!(pid, name = %desc.name, "Dropping exited instance");
            }
            alive
        });

        if instances.len() != before {
            warn!(
                removed = before - instances.len(),
                "Pruned stale editor instances"
            );
            self.storage.save(&instances).await?;
        }

        Ok(instances)
    }

    /// Find a live instance by name.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn find(&self, name: &str) -> Result<Option<SessionDescriptor>> {
        Ok(self
            .instances()
            .await?
            .into_values()
            .find(|desc| desc.name == name))
    }

    /// Connection parameters of the instance called `name`.
    ///
    /// # Errors
    /// Returns `BridgeError::NoInstance` (listing the known names) if no
    /// live instance has that name.
    pub async fn resolve(&self, name: &str) -> Result<Endpoint> {
        let instances = self.instances().await?;
        instances
            .values()
            .find(|desc| desc.name == name)
            .map(SessionDescriptor::endpoint)
            .ok_or_else(|| no_instance(name, &instances))
    }

    /// Record an instance, replacing any entry with the same process id.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn register(&self, descriptor: SessionDescriptor) -> Result<()> {
        let mut instances = self.instances().await?;
        info!(name = %descriptor.name, pid = descriptor.pid, port = descriptor.port, "Registering instance");
        instances.insert(descriptor.pid, descriptor);
        self.storage.save(&instances).await?;
        Ok(())
    }

    /// Store the native window handle of a registered instance.
    ///
    /// Returns `false` if no live instance has that process id.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub async fn record_window_handle(&self, pid: ProcessId, hwnd: u64) -> Result<bool> {
        let mut instances = self.instances().await?;
        let Some(desc) = instances.get_mut(&pid) else {
            return Ok(false);
        };
        if desc.hwnd != Some(hwnd) {
            desc.hwnd = Some(hwnd);
            self.storage.save(&instances).await?;
        }
        Ok(true)
    }

    /// Open a client on the instance called `name`.
    ///
    /// # Errors
    /// Returns `BridgeError::NoInstance` for an unknown name, or a transport
    /// error if the bridge cannot be reached.
    pub async fn connect(&self, name: &str) -> Result<BridgeClient<WebSocketTransport>> {
        let endpoint = self.resolve(name).await?;
        Ok(BridgeClient::connect(endpoint)
            .await?
            .with_instance_name(name))
    }

    /// Start an editor on `project` and wait for it to register under that
    /// name. An already running instance is returned as is.
    ///
    /// # Errors
    /// Returns `BridgeError::Io` if the editor cannot be found or spawned,
    /// and `BridgeError::NoInstance` if it does not register in time.
    pub async fn launch(&self, project: &str, options: &LaunchOptions) -> Result<SessionDescriptor> {
        if let Some(existing) = self.find(project).await? {
            return Ok(existing);
        }

        let lookup = options.program.clone();
        let program = tokio::task::spawn_blocking(move || which::which(lookup))
            .await
            .map_err(io::Error::other)?
            .map_err(|e| {
                io::Error::new(io::ErrorKind::NotFound, format!("{}: {e}", options.program))
            })?;
        info!(program = %program.display(), project, "Launching editor");

        // The editor outlives this handle; the registry entry is the link.
        let _child = Command::new(&program)
            .args(&options.args)
            .arg(project)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        self.wait_for(project, options).await
    }

    /// Poll until an instance called `name` appears.
    ///
    /// # Errors
    /// Returns `BridgeError::NoInstance` once `options.timeout` elapses.
    pub async fn wait_for(&self, name: &str, options: &LaunchOptions) -> Result<SessionDescriptor> {
        // A timeout past the clock's range means no deadline.
        let deadline = Instant::now().checked_add(options.timeout);
        loop {
            let instances = self.instances().await?;
            if let Some(desc) = instances.values().find(|desc| desc.name == name) {
                return Ok(desc.clone());
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(name, timeout = ?options.timeout, "Editor did not register");
                return Err(no_instance(name, &instances));
            }
            tokio::time::sleep(options.poll_interval).await;
        }
    }
}

fn no_instance(name: &str, instances: &InstanceMap) -> BridgeError {
    BridgeError::NoInstance {
        name: name.to_string(),
        known: instances.values().map(|desc| desc.name.clone()).collect(),
    }
}
