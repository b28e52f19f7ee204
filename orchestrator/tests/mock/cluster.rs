use super::Journal;
use k3s_model::ClusterNode;
use k3s_orchestrator::{ClientError, ClientResult, ClusterApi};
use kube::error::ErrorResponse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, ClusterNode>,
    labels: BTreeMap<String, BTreeMap<String, String>>,
    annotations: BTreeMap<String, BTreeMap<String, String>>,
    manifests: Vec<String>,
    gets: HashMap<String, usize>,
    /// Unknown nodes appear after this many "not found" answers. `None` means never.
    visible_after: Option<usize>,
    get_error: bool,
    delete_error: bool,
    apply_error: bool,
}

/// An in-memory cluster. Nodes the orchestrators install show up on their own once they have been
/// asked for `visible_after` times, mimicking a node registering with the API server.
pub(crate) struct MockCluster {
    journal: Journal,
    state: Mutex<State>,
}

impl MockCluster {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Mutex::new(State {
                visible_after: Some(0),
                ..State::default()
            }),
        }
    }

    pub(crate) fn add_node(&self, name: &str, remote_host: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .nodes
            .insert(name.to_string(), node(name, remote_host));
    }

    pub(crate) fn visible_after(&self, not_found_answers: Option<usize>) {
        self.state.lock().unwrap().visible_after = not_found_answers;
    }

    pub(crate) fn fail_gets(&self) {
        self.state.lock().unwrap().get_error = true;
    }

    pub(crate) fn fail_deletes(&self) {
        self.state.lock().unwrap().delete_error = true;
    }

    pub(crate) fn fail_applies(&self) {
        self.state.lock().unwrap().apply_error = true;
    }

    pub(crate) fn has_node(&self, name: &str) -> bool {
        self.state.lock().unwrap().nodes.contains_key(name)
    }

    pub(crate) fn gets(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .gets
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn labels(&self, name: &str) -> BTreeMap<String, String> {
        self.state
            .lock()
            .unwrap()
            .labels
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn annotations(&self, name: &str) -> BTreeMap<String, String> {
        self.state
            .lock()
            .unwrap()
            .annotations
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn manifests(&self) -> Vec<String> {
        self.state.lock().unwrap().manifests.clone()
    }
}

fn node(name: &str, remote_host: Option<&str>) -> ClusterNode {
    ClusterNode {
        name: name.to_string(),
        ready: true,
        roles: BTreeSet::new(),
        version: "v1.28.5+k3s1".to_string(),
        remote_host: remote_host.map(str::to_string),
    }
}

fn not_found(name: &str) -> ClientError {
    ClientError::NotFound {
        what: format!("node '{}'", name),
    }
}

fn unavailable(action: &str) -> ClientError {
    ClientError::Kube {
        action: action.to_string(),
        source: kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "the server is currently unable to handle the request".to_string(),
            reason: "ServiceUnavailable".to_string(),
            code: 503,
        }),
    }
}

#[async_trait::async_trait]
impl ClusterApi for MockCluster {
    async fn list_nodes(&self) -> ClientResult<Vec<ClusterNode>> {
        self.journal.record("list");
        Ok(self.state.lock().unwrap().nodes.values().cloned().collect())
    }

    async fn get_node(&self, name: &str) -> ClientResult<ClusterNode> {
        self.journal.record(format!("get {}", name));
        let mut state = self.state.lock().unwrap();
        if state.get_error {
            return Err(unavailable("get node"));
        }
        let gets = {
            let gets = state.gets.entry(name.to_string()).or_default();
            *gets += 1;
            *gets
        };
        if let Some(node) = state.nodes.get(name) {
            return Ok(node.clone());
        }
        match state.visible_after {
            Some(after) if gets > after => {
                let node = node(name, None);
                state.nodes.insert(name.to_string(), node.clone());
                Ok(node)
            }
            _ => Err(not_found(name)),
        }
    }

    async fn delete_node(&self, name: &str) -> ClientResult<()> {
        self.journal.record(format!("delete {}", name));
        let mut state = self.state.lock().unwrap();
        if state.delete_error {
            return Err(unavailable("delete node"));
        }
        state.nodes.remove(name);
        Ok(())
    }

    async fn label_node(&self, name: &str, key: &str, value: &str) -> ClientResult<()> {
        self.journal.record(format!("label {} {}={}", name, key, value));
        let mut state = self.state.lock().unwrap();
        if !state.nodes.contains_key(name) {
            return Err(not_found(name));
        }
        state
            .labels
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn annotate_node(&self, name: &str, key: &str, value: &str) -> ClientResult<()> {
        self.journal
            .record(format!("annotate {} {}={}", name, key, value));
        let mut state = self.state.lock().unwrap();
        let node = state.nodes.get_mut(name).ok_or_else(|| not_found(name))?;
        if key == k3s_model::constants::ANNOTATION_REMOTE_HOST {
            node.remote_host = Some(value.to_string());
        }
        state
            .annotations
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn apply_manifest(&self, source: &str) -> ClientResult<()> {
        self.journal.record(format!("apply {}", source));
        let mut state = self.state.lock().unwrap();
        if state.apply_error {
            return Err(unavailable("apply manifest"));
        }
        state.manifests.push(source.to_string());
        Ok(())
    }
}
