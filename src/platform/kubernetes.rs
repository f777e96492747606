//! Pod metadata exposed through the Downward API as environment variables.

use std::collections::BTreeMap;

use serde::Serialize;

const LABEL_PREFIX: &str = "K8S_LABEL_";
const ANNOTATION_PREFIX: &str = "K8S_ANNOTATION_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesFacts {
    pub namespace: String,
    pub pod_name: String,
    #[serde(rename = "podIp", skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_port: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl KubernetesFacts {
    /// Present only when both namespace and pod name are set.
    pub fn from_vars(vars: &BTreeMap<String, String>) -> Option<Self> {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        Some(Self {
            namespace: get("K8S_NAMESPACE")?,
            pod_name: get("K8S_POD_NAME")?,
            pod_ip: get("K8S_POD_IP"),
            node_name: get("K8S_NODE_NAME"),
            service_host: get("KUBERNETES_SERVICE_HOST"),
            service_port: get("KUBERNETES_SERVICE_PORT"),
            labels: strip_prefixed(vars, LABEL_PREFIX),
            annotations: strip_prefixed(vars, ANNOTATION_PREFIX),
        })
    }
}

fn strip_prefixed(vars: &BTreeMap<String, String>, prefix: &str) -> BTreeMap<String, String> {
    vars.iter()
        .filter_map(|(name, value)| {
            name.strip_prefix(prefix)
                .filter(|key| !key.is_empty())
                .map(|key| (key.to_string(), value.clone()))
        })
        .collect()
}
