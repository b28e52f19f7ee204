use k3s_model::constants::{
    CONVERGENCE_ATTEMPTS, CONVERGENCE_DELAY_SECS, INSTALLER_URL, K3S_BINARY_PATH,
    KUBECONFIG_PATH, REGISTRY_CONFIG_PATH, REMOTE_INSTALLER_PATH, SERVER_MANIFESTS_DIR,
    SERVICE_ACCOUNT, UNINSTALL_SCRIPT_PATH,
};
use std::path::PathBuf;
use std::time::Duration;

/// Paths, programs and tunables used by the orchestrators. `Settings::default()` describes a
/// standard k3s host; tests point the local paths at temporary directories.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The runtime binary. Its presence means the runtime is installed.
    pub k3s_binary: PathBuf,
    pub kubeconfig: PathBuf,
    pub registry_config: PathBuf,
    /// Directory the control plane watches for add-on manifests.
    pub manifests_dir: PathBuf,
    pub uninstall_script: PathBuf,
    pub installer_url: String,
    pub remote_installer: String,
    pub remote_registry_config: String,
    pub remote_uninstall_script: String,
    pub helm: String,
    /// The local account granted access to the registry credentials.
    pub service_account: String,
    pub convergence_attempts: usize,
    pub convergence_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            k3s_binary: PathBuf::from(K3S_BINARY_PATH),
            kubeconfig: PathBuf::from(KUBECONFIG_PATH),
            registry_config: PathBuf::from(REGISTRY_CONFIG_PATH),
            manifests_dir: PathBuf::from(SERVER_MANIFESTS_DIR),
            uninstall_script: PathBuf::from(UNINSTALL_SCRIPT_PATH),
            installer_url: INSTALLER_URL.to_string(),
            remote_installer: REMOTE_INSTALLER_PATH.to_string(),
            remote_registry_config: REGISTRY_CONFIG_PATH.to_string(),
            remote_uninstall_script: UNINSTALL_SCRIPT_PATH.to_string(),
            helm: "helm".to_string(),
            service_account: SERVICE_ACCOUNT.to_string(),
            convergence_attempts: CONVERGENCE_ATTEMPTS,
            convergence_delay: Duration::from_secs(CONVERGENCE_DELAY_SECS),
        }
    }
}
