//! Filtered view of the process environment.

use std::collections::BTreeMap;

/// Pick the variables shown in the server block.
///
/// With a non-empty `display` list, each listed variable that is set and
/// non-empty; otherwise `HOSTNAME`. Outside Kubernetes every `K8S_*`
/// variable is added so local runs still show what the pod would see.
pub fn environment_subset(
    display: &[String],
    vars: &BTreeMap<String, String>,
    in_kubernetes: bool,
) -> BTreeMap<String, String> {
    let mut shown = BTreeMap::new();

    let wanted: Vec<&str> = if display.is_empty() {
        vec!["HOSTNAME"]
    } else {
        display.iter().map(|s| s.trim()).collect()
    };
    for name in wanted {
        if let Some(value) = vars.get(name).filter(|v| !v.is_empty()) {
            shown.insert(name.to_string(), value.clone());
        }
    }

    if !in_kubernetes {
        for (name, value) in vars.iter().filter(|(name, _)| name.starts_with("K8S_")) {
            shown.insert(name.clone(), value.clone());
        }
    }

    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_to_hostname() {
        let env = vars(&[("HOSTNAME", "pod-1"), ("SECRET", "x")]);
        let shown = environment_subset(&[], &env, true);
        assert_eq!(shown, vars(&[("HOSTNAME", "pod-1")]));
    }

    #[test]
    fn test_display_list() {
        let env = vars(&[("A", "1"), ("B", ""), ("HOSTNAME", "h")]);
        let display = vec!["A".to_string(), " B ".to_string(), "C".to_string()];
        assert_eq!(environment_subset(&display, &env, true), vars(&[("A", "1")]));
    }

    #[test]
    fn test_k8s_vars_outside_kubernetes() {
        let env = vars(&[("K8S_NAMESPACE", "ns"), ("K8S_LABEL_app", "echo"), ("K9", "no"), ("HOSTNAME", "h")]);
        let shown = environment_subset(&[], &env, false);
        assert_eq!(
            shown,
            vars(&[("HOSTNAME", "h"), ("K8S_LABEL_app", "echo"), ("K8S_NAMESPACE", "ns")])
        );

        let shown = environment_subset(&[], &env, true);
        assert_eq!(shown, vars(&[("HOSTNAME", "h")]));
    }
}
