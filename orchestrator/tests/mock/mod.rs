/*!

Mock implementations of the [`CommandExecutor`], [`ClusterApi`] and [`Downloader`] traits, so the
orchestrators can be exercised without a host to install on or a Kubernetes API server.

Both the executor and the cluster write to a shared [`Journal`], which lets tests assert on the
relative order of commands and API calls.

!*/

#![allow(dead_code)]

pub(crate) mod cluster;
pub(crate) mod downloader;
pub(crate) mod executor;

pub(crate) use cluster::MockCluster;
pub(crate) use downloader::MockDownloader;
pub(crate) use executor::MockExecutor;

use k3s_model::PropertyStore;
use k3s_orchestrator::{Context, Settings};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// An ordered record of everything the mocks were asked to do.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record<S: Into<String>>(&self, entry: S) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Index of the first entry starting with `prefix`.
    pub(crate) fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }
}

/// A throwaway host: every local path lives in a temporary directory.
pub(crate) struct Harness {
    pub(crate) dir: TempDir,
    pub(crate) journal: Journal,
    pub(crate) executor: MockExecutor,
    pub(crate) cluster: MockCluster,
    pub(crate) downloader: MockDownloader,
    pub(crate) properties: PropertyStore,
    pub(crate) settings: Settings,
    pub(crate) cancel: CancellationToken,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::default();
        let settings = Settings {
            k3s_binary: dir.path().join("bin/k3s"),
            kubeconfig: dir.path().join("etc/k3s.yaml"),
            registry_config: dir.path().join("etc/registries.yaml"),
            manifests_dir: dir.path().join("manifests"),
            uninstall_script: dir.path().join("bin/k3s-uninstall.sh"),
            convergence_attempts: 3,
            convergence_delay: Duration::from_millis(1),
            ..Settings::default()
        };
        Self {
            properties: PropertyStore::new(dir.path().join("properties.json")),
            executor: MockExecutor::new(journal.clone()),
            cluster: MockCluster::new(journal.clone()),
            downloader: MockDownloader::default(),
            settings,
            cancel: CancellationToken::new(),
            journal,
            dir,
        }
    }

    /// Pretends the runtime has been installed on this host.
    pub(crate) fn install_runtime(&self) {
        let binary = &self.settings.k3s_binary;
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(binary, b"").unwrap();
    }

    pub(crate) fn write_registry_config(&self, contents: &str) {
        let path = &self.settings.registry_config;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    pub(crate) fn context(&self) -> Context<'_, MockExecutor, MockCluster> {
        Context::new(
            &self.executor,
            &self.cluster,
            &self.properties,
            &self.settings,
            self.cancel.clone(),
        )
    }
}
