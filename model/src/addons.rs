/// A plain Kubernetes manifest that is applied to the cluster during bootstrap.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Manifest {
    pub name: &'static str,
    pub version: &'static str,
    pub url: &'static str,
}

/// A chart installed (or upgraded) by the package manager during bootstrap. The target namespace
/// is created when missing.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct HelmChart {
    pub release_name: &'static str,
    pub chart: &'static str,
    pub repo_url: &'static str,
    pub namespace: &'static str,
    pub version: &'static str,
    /// `--set` overrides passed to the install.
    pub values: &'static [(&'static str, &'static str)],
}

/// Manifests in apply order. Later entries may rely on CRDs created by earlier ones.
pub const KUBERNETES_MANIFESTS: &[Manifest] = &[Manifest {
    name: "system-upgrader",
    version: "0.13.2",
    url: "https://github.com/rancher/system-upgrade-controller/releases/download/v0.13.2/system-upgrade-controller.yaml",
}];

/// Charts in install order.
pub const HELM_CHARTS: &[HelmChart] = &[
    HelmChart {
        release_name: "cert-manager",
        chart: "cert-manager",
        repo_url: "https://charts.jetstack.io",
        namespace: "cert-manager",
        version: "v1.13.3",
        values: &[("installCRDs", "true")],
    },
    HelmChart {
        release_name: "longhorn",
        chart: "longhorn",
        repo_url: "https://charts.longhorn.io",
        namespace: "longhorn-system",
        version: "1.5.3",
        values: &[],
    },
];
