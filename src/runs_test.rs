#[cfg(test)]
mod tests {
    use crate::action::{Payload, Verb};
    use crate::patch::PatchType;
    use crate::run::{Condition, Param, Run, RunRef, RunStatus, CONDITION_SUCCEEDED};
    use crate::runs::RunInterface;
    use crate::{Clientset, Error};
    use futures::StreamExt;
    use kube::api::{DeleteParams, GetParams, ListParams, PatchParams, PostParams};
    use kube::core::WatchEvent;
    use std::collections::BTreeMap;

    fn new_run(name: &str, labels: &[(&str, &str)]) -> Run {
        let mut run = Run::default();
        run.metadata.name = Some(name.to_string());
        if !labels.is_empty() {
            run.metadata.labels = Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            );
        }
        run.spec.ref_ = Some(RunRef {
            api_version: Some("example.dev/v0".to_string()),
            kind: Some("Wait".to_string()),
            name: None,
        });
        run.spec.params = vec![Param::string("duration", "5s")];
        run
    }

    fn succeeded() -> RunStatus {
        RunStatus {
            conditions: vec![Condition {
                type_: CONDITION_SUCCEEDED.to_string(),
                status: "True".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn names(list: &crate::RunList) -> Vec<String> {
        list.items
            .iter()
            .map(|r| r.metadata.name.clone().unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");

        let created = runs
            .create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();
        assert_eq!(created.metadata.namespace.as_deref(), Some("ci"));
        assert!(created.metadata.resource_version.is_some());

        let fetched = runs.get("run-1", &GetParams::default()).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.spec.params, vec![Param::string("duration", "5s")]);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let cs = Clientset::new();
        let err = cs
            .tekton_v1beta1()
            .runs("ci")
            .get("missing", &GetParams::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.code(), 404);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_already_exists() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        runs.create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();

        let err = runs
            .create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_list_filters_by_label_in_tracker_order() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        for (name, app) in [("c", "build"), ("a", "build"), ("b", "deploy")] {
            runs.create(&new_run(name, &[("app", app)]), &PostParams::default())
                .await
                .unwrap();
        }

        let all = runs.list(&ListParams::default()).await.unwrap();
        assert_eq!(names(&all), ["a", "b", "c"]);
        assert!(all.metadata.resource_version.is_some());

        let build = runs
            .list(&ListParams::default().labels("app=build"))
            .await
            .unwrap();
        assert_eq!(names(&build), ["a", "c"]);
        assert_eq!(build.metadata, all.metadata);

        let none = runs
            .list(&ListParams::default().labels("app in (test)"))
            .await
            .unwrap();
        assert!(none.items.is_empty());
    }

    #[tokio::test]
    async fn test_list_namespace_scoping() {
        let cs = Clientset::new();
        cs.tekton_v1beta1()
            .runs("ci")
            .create(&new_run("a", &[]), &PostParams::default())
            .await
            .unwrap();
        cs.tekton_v1beta1()
            .runs("prod")
            .create(&new_run("b", &[]), &PostParams::default())
            .await
            .unwrap();

        let ci = cs.tekton_v1beta1().runs("ci");
        assert_eq!(names(&ci.list(&ListParams::default()).await.unwrap()), ["a"]);

        let everywhere = cs.tekton_v1beta1().runs("");
        assert_eq!(
            names(&everywhere.list(&ListParams::default()).await.unwrap()),
            ["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_list_field_selector() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        for name in ["a", "b"] {
            runs.create(&new_run(name, &[]), &PostParams::default())
                .await
                .unwrap();
        }

        let only_b = runs
            .list(&ListParams::default().fields("metadata.name=b"))
            .await
            .unwrap();
        assert_eq!(names(&only_b), ["b"]);

        let err = runs
            .list(&ListParams::default().fields("spec.timeout=1h"))
            .await
            .unwrap_err();
        assert!(err.is_bad_request());
    }

    #[tokio::test]
    async fn test_invalid_label_selector_records_nothing() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");

        let err = runs
            .list(&ListParams::default().labels("env in prod"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));
        assert!(cs.fake().actions().is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        runs.create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();

        runs.delete("run-1", &DeleteParams::default()).await.unwrap();
        let err = runs.get("run-1", &GetParams::default()).await.unwrap_err();
        assert!(err.is_not_found());

        let err = runs
            .delete("run-1", &DeleteParams::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_collection_respects_selectors() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        for (name, app) in [("a", "build"), ("b", "deploy"), ("c", "build")] {
            runs.create(&new_run(name, &[("app", app)]), &PostParams::default())
                .await
                .unwrap();
        }
        cs.tekton_v1beta1()
            .runs("prod")
            .create(&new_run("d", &[("app", "build")]), &PostParams::default())
            .await
            .unwrap();

        runs.delete_collection(&DeleteParams::default(), &ListParams::default().labels("app=build"))
            .await
            .unwrap();

        assert_eq!(names(&runs.list(&ListParams::default()).await.unwrap()), ["b"]);
        let prod = cs.tekton_v1beta1().runs("prod");
        assert_eq!(names(&prod.list(&ListParams::default()).await.unwrap()), ["d"]);
    }

    #[tokio::test]
    async fn test_update_and_update_status_keep_each_others_changes() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        let created = runs
            .create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();

        let mut with_status = created.clone();
        with_status.status = Some(succeeded());
        let after_status = runs
            .update_status(&with_status, &PostParams::default())
            .await
            .unwrap();
        assert!(after_status.is_successful());

        let mut with_spec = after_status.clone();
        with_spec.spec.timeout = Some("1h0m0s".to_string());
        with_spec.status = None;
        let after_spec = runs.update(&with_spec, &PostParams::default()).await.unwrap();

        assert_eq!(after_spec.spec.timeout.as_deref(), Some("1h0m0s"));
        assert!(after_spec.is_successful(), "update must not drop status");

        let mut status_only = after_spec.clone();
        status_only.spec.timeout = Some("9h".to_string());
        status_only.status = None;
        let final_run = runs
            .update_status(&status_only, &PostParams::default())
            .await
            .unwrap();
        assert_eq!(final_run.spec.timeout.as_deref(), Some("1h0m0s"));

        let actions = cs.fake().actions();
        let status_updates = actions
            .iter()
            .filter(|a| a.verb == Verb::Update && a.is_status())
            .count();
        assert_eq!(status_updates, 2);
    }

    #[tokio::test]
    async fn test_stale_update_is_conflict() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        let created = runs
            .create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();

        let mut first = created.clone();
        first.spec.retries = Some(1);
        runs.update(&first, &PostParams::default()).await.unwrap();

        let mut second = created;
        second.spec.retries = Some(2);
        let err = runs
            .update(&second, &PostParams::default())
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = runs.get("run-1", &GetParams::default()).await.unwrap();
        assert_eq!(stored.spec.retries, Some(1));
    }

    #[tokio::test]
    async fn test_patch_types() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        runs.create(&new_run("run-1", &[("app", "build")]), &PostParams::default())
            .await
            .unwrap();

        let merged = runs
            .patch(
                "run-1",
                PatchType::MergePatch,
                br#"{"spec":{"status":"RunCancelled"}}"#,
                &PatchParams::default(),
                &[],
            )
            .await
            .unwrap();
        assert!(merged.is_cancelled());

        let json_patched = runs
            .patch(
                "run-1",
                PatchType::JsonPatch,
                br#"[{"op":"replace","path":"/metadata/labels/app","value":"deploy"}]"#,
                &PatchParams::default(),
                &[],
            )
            .await
            .unwrap();
        assert_eq!(
            json_patched.metadata.labels.unwrap().get("app").map(String::as_str),
            Some("deploy")
        );

        let strategic = runs
            .patch(
                "run-1",
                PatchType::StrategicMergePatch,
                br#"{"spec":{"retries":3}}"#,
                &PatchParams::default(),
                &[],
            )
            .await
            .unwrap();
        assert_eq!(strategic.spec.retries, Some(3));
        assert!(strategic.is_cancelled());
    }

    #[tokio::test]
    async fn test_invalid_patch_leaves_object_unchanged() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        let created = runs
            .create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();

        let malformed = runs
            .patch(
                "run-1",
                PatchType::MergePatch,
                b"{not json",
                &PatchParams::default(),
                &[],
            )
            .await;
        assert!(malformed.unwrap_err().is_bad_request());

        let failing = runs
            .patch(
                "run-1",
                PatchType::JsonPatch,
                br#"[{"op":"replace","path":"/spec/timeout","value":"1h"},{"op":"remove","path":"/spec/missing"}]"#,
                &PatchParams::default(),
                &[],
            )
            .await;
        assert!(failing.is_err());

        let stored = runs.get("run-1", &GetParams::default()).await.unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn test_status_patch_and_unknown_subresource() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        runs.create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();

        let patched = runs
            .patch(
                "run-1",
                PatchType::MergePatch,
                br#"{"status":{"conditions":[{"type":"Succeeded","status":"False"}]},"spec":{"retries":7}}"#,
                &PatchParams::default(),
                &["status"],
            )
            .await
            .unwrap();
        assert!(patched.is_done());
        assert!(!patched.is_successful());
        assert_eq!(patched.spec.retries, None);

        let err = runs
            .patch(
                "run-1",
                PatchType::MergePatch,
                b"{}",
                &PatchParams::default(),
                &["scale"],
            )
            .await
            .unwrap_err();
        assert!(err.is_bad_request());
    }

    #[tokio::test]
    async fn test_apply_patch_creates_missing_run() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");

        let body = b"apiVersion: tekton.dev/v1beta1\nkind: Run\nmetadata:\n  labels:\n    app: build\nspec:\n  retries: 2\n";
        let applied = runs
            .patch("applied", PatchType::ApplyPatch, body, &PatchParams::apply("test"), &[])
            .await
            .unwrap();

        assert_eq!(applied.metadata.name.as_deref(), Some("applied"));
        assert_eq!(applied.spec.retries, Some(2));
    }

    #[tokio::test]
    async fn test_apply_patch_with_malformed_metadata_changes_nothing() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");

        let err = runs
            .patch(
                "missing",
                PatchType::ApplyPatch,
                b"metadata: oops\n",
                &PatchParams::apply("test"),
                &[],
            )
            .await
            .unwrap_err();
        assert!(err.is_bad_request());
        assert!(cs.tracker().list(&crate::runs_resource(), "").unwrap().is_empty());

        // The clientset keeps working afterwards
        let err = runs.get("x", &GetParams::default()).await.unwrap_err();
        assert!(err.is_not_found());
        runs.create(&new_run("x", &[]), &PostParams::default())
            .await
            .unwrap();
        assert_eq!(cs.fake().actions().len(), 3);
    }

    #[tokio::test]
    async fn test_apply_patch_on_status_of_missing_run_is_not_found() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");

        let err = runs
            .patch(
                "missing",
                PatchType::ApplyPatch,
                b"status:\n  conditions: []\n",
                &PatchParams::apply("test"),
                &["status"],
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(cs.tracker().list(&crate::runs_resource(), "").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_sees_matching_mutations_after_start() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        runs.create(&new_run("before", &[("app", "build")]), &PostParams::default())
            .await
            .unwrap();

        let mut stream = runs
            .watch(&ListParams::default().labels("app=build"))
            .await
            .unwrap();

        runs.create(&new_run("other-app", &[("app", "deploy")]), &PostParams::default())
            .await
            .unwrap();
        cs.tekton_v1beta1()
            .runs("prod")
            .create(&new_run("other-ns", &[("app", "build")]), &PostParams::default())
            .await
            .unwrap();
        let created = runs
            .create(&new_run("watched", &[("app", "build")]), &PostParams::default())
            .await
            .unwrap();
        let mut with_status = created;
        with_status.status = Some(succeeded());
        runs.update_status(&with_status, &PostParams::default())
            .await
            .unwrap();
        runs.delete("watched", &DeleteParams::default()).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let event = stream.next().await.unwrap().unwrap();
            let (kind, run) = match event {
                WatchEvent::Added(r) => ("Added", r),
                WatchEvent::Modified(r) => ("Modified", r),
                WatchEvent::Deleted(r) => ("Deleted", r),
                other => panic!("unexpected event: {:?}", other),
            };
            seen.push((kind, run.metadata.name.unwrap_or_default()));
        }

        assert_eq!(
            seen,
            [
                ("Added", "watched".to_string()),
                ("Modified", "watched".to_string()),
                ("Deleted", "watched".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_reactor_errors_and_results() {
        let cs = Clientset::new();
        cs.fake().prepend_reactor("delete", "runs", |_| {
            Err(Error::Api(kube::core::ErrorResponse {
                status: "Failure".to_string(),
                message: "forbidden by test".to_string(),
                reason: "Forbidden".to_string(),
                code: 403,
            }))
        });
        cs.fake().prepend_reactor("get", "runs", |action| {
            let mut run = serde_json::to_value(new_run(action.name().unwrap_or_default(), &[]))?;
            run["metadata"]["namespace"] = "ci".into();
            Ok(Some(run))
        });

        let runs = cs.tekton_v1beta1().runs("ci");
        let err = runs
            .delete("anything", &DeleteParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), 403);
        assert_eq!(err.reason(), "Forbidden");

        let fabricated = runs.get("made-up", &GetParams::default()).await.unwrap();
        assert_eq!(fabricated.metadata.name.as_deref(), Some("made-up"));
    }

    #[tokio::test]
    async fn test_each_call_records_one_action() {
        let cs = Clientset::new();
        let runs = cs.tekton_v1beta1().runs("ci");
        let created = runs
            .create(&new_run("run-1", &[]), &PostParams::default())
            .await
            .unwrap();
        runs.update(&created, &PostParams::default()).await.unwrap();
        runs.list(&ListParams::default()).await.unwrap();
        let _ = runs.get("missing", &GetParams::default()).await;
        runs.patch("run-1", PatchType::MergePatch, b"{}", &PatchParams::default(), &[])
            .await
            .unwrap();
        runs.delete("run-1", &DeleteParams::default()).await.unwrap();

        let actions = cs.fake().actions();
        let verbs: Vec<Verb> = actions.iter().map(|a| a.verb).collect();
        assert_eq!(
            verbs,
            [
                Verb::Create,
                Verb::Update,
                Verb::List,
                Verb::Get,
                Verb::Patch,
                Verb::Delete
            ]
        );
        assert!(actions.iter().all(|a| a.namespace == "ci"));
        assert!(matches!(&actions[3].payload, Payload::Name(name) if name == "missing"));
    }
}
