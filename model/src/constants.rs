/// Helper macro to avoid retyping the base domain-like name used for the annotations we own. When
/// given no parameters, this returns the base domain-like name. When given a string literal
/// parameter it adds `/parameter` to the end.
macro_rules! dokku {
    () => {
        "dokku.com"
    };
    ($s:literal) => {
        concat!(dokku!(), "/", $s)
    };
}

// Annotation keys
/// Records the remote host a node was joined from. Only nodes carrying this annotation may be
/// removed through the remote uninstall path.
pub const ANNOTATION_REMOTE_HOST: &str = dokku!("remote-host");

// Label keys and values
pub const LABEL_ENABLE_LB: &str = "svccontroller.k3s.cattle.io/enablelb";
pub const LABEL_NODE_ROLE: &str = "node-role.kubernetes.io/role";
pub const LABEL_NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";

// Taints
pub const CRITICAL_ADDONS_TAINT: &str = "CriticalAddonsOnly=true:NoSchedule";

// Runtime installation
pub const INSTALLER_URL: &str = "https://get.k3s.io";
pub const INSTALLER_VERSION_ENV: &str = "INSTALL_K3S_VERSION";
pub const API_SERVER_PORT: u16 = 6443;
pub const DEPENDENCY_PACKAGES: &[&str] = &[
    "ca-certificates",
    "curl",
    "open-iscsi",
    "nfs-common",
    "wireguard",
];

// Local paths
pub const K3S_BINARY_PATH: &str = "/usr/local/bin/k3s";
pub const KUBECONFIG_PATH: &str = "/etc/rancher/k3s/k3s.yaml";
pub const REGISTRY_CONFIG_PATH: &str = "/etc/rancher/k3s/registries.yaml";
pub const SERVER_MANIFESTS_DIR: &str = "/var/lib/rancher/k3s/server/manifests";
pub const INGRESS_CONFIG_FILE: &str = "traefik-custom.yaml";
pub const UNINSTALL_SCRIPT_PATH: &str = "/usr/local/bin/k3s-uninstall.sh";
pub const PROPERTIES_PATH: &str = "/var/lib/dokku/config/scheduler-k3s/properties.json";

// Remote paths
pub const REMOTE_INSTALLER_PATH: &str = "/tmp/k3s-installer.sh";

/// The local account that needs read/write access to the registry credentials.
pub const SERVICE_ACCOUNT: &str = "dokku";

/// The field manager name used for server-side apply.
pub const FIELD_MANAGER: &str = "k3sctl";

// Defaults for options that do not default to the empty string
pub const DEFAULT_NETWORK_INTERFACE: &str = "eth0";

/// How many times the convergence waiter asks for a freshly joined node before giving up.
pub const CONVERGENCE_ATTEMPTS: usize = 20;
/// Seconds between convergence attempts.
pub const CONVERGENCE_DELAY_SECS: u64 = 5;
