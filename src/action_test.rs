#[cfg(test)]
mod tests {
    use crate::action::*;
    use crate::patch::PatchType;
    use crate::runs::{runs_kind, runs_resource};
    use kube::api::ListParams;
    use serde_json::json;

    #[test]
    fn test_list_action_carries_selectors() {
        let params = ListParams::default()
            .labels("app=build")
            .fields("metadata.name=run-1");
        let action = Action::list(runs_resource(), runs_kind(), "ci", &params).unwrap();

        assert_eq!(action.verb, Verb::List);
        assert_eq!(action.namespace, "ci");
        assert_eq!(action.kind, Some(runs_kind()));

        let restrictions = action.restrictions().unwrap();
        assert!(restrictions.matches_labels(&json!({"metadata": {"labels": {"app": "build"}}})));
        assert!(!restrictions.matches_labels(&json!({"metadata": {}})));
        assert!(!restrictions.fields.is_empty());
    }

    #[test]
    fn test_missing_selectors_match_everything() {
        let action = Action::watch(runs_resource(), "", &ListParams::default()).unwrap();
        let restrictions = action.restrictions().unwrap();

        assert!(restrictions.labels.selects_all());
        assert!(restrictions.fields.is_empty());
        assert!(restrictions.matches(&json!({"metadata": {"name": "x"}})).unwrap());
    }

    #[test]
    fn test_invalid_selector_fails_before_action_is_built() {
        let params = ListParams::default().labels("env in prod");
        let err = Action::delete_collection(runs_resource(), "ci", &params).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidSelector { .. }));

        let params = ListParams::default().fields("metadata.name");
        assert!(Action::list(runs_resource(), runs_kind(), "ci", &params).is_err());
    }

    #[test]
    fn test_extract_from_list_params() {
        let params = ListParams {
            resource_version: Some("12".to_string()),
            ..Default::default()
        };
        let (labels, fields, rv) = extract_from_list_params(&params).unwrap();
        assert!(labels.is_none());
        assert!(fields.is_none());
        assert_eq!(rv.as_deref(), Some("12"));
    }

    #[test]
    fn test_matches_wildcards() {
        let action = Action::get(runs_resource(), "ci", "run-1");

        assert!(action.matches("get", "runs"));
        assert!(action.matches("*", "runs"));
        assert!(action.matches("get", "*"));
        assert!(!action.matches("list", "runs"));
        assert!(!action.matches("get", "taskruns"));
    }

    #[test]
    fn test_names_and_subresources() {
        let create = Action::create(runs_resource(), "ci", json!({"metadata": {"name": "run-1"}}));
        assert_eq!(create.name(), Some("run-1"));
        assert!(create.object().is_some());
        assert!(!create.is_status());

        let status = Action::update_subresource(
            runs_resource(),
            "status",
            "ci",
            json!({"metadata": {"name": "run-1"}}),
        );
        assert!(status.is_status());
        assert_eq!(status.verb, Verb::Update);

        let patch = Action::patch_subresource(
            runs_resource(),
            "ci",
            "run-1",
            PatchType::MergePatch,
            br#"{"spec":{}}"#,
            &[],
        );
        assert_eq!(patch.name(), Some("run-1"));
        assert_eq!(patch.subresource, None);

        let status_patch = Action::patch_subresource(
            runs_resource(),
            "ci",
            "run-1",
            PatchType::MergePatch,
            b"{}",
            &["status"],
        );
        assert!(status_patch.is_status());
    }

    #[test]
    fn test_display() {
        let action = Action::update_subresource(
            runs_resource(),
            "status",
            "ci",
            json!({"metadata": {"name": "run-1"}}),
        );
        assert_eq!(action.to_string(), "update runs/status in ci (run-1)");
        assert_eq!(Verb::DeleteCollection.to_string(), "delete-collection");
    }
}
