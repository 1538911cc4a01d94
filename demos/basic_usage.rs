//! Basic typed client operations on runs

use kube::api::{DeleteParams, GetParams, ListParams, PatchParams, PostParams};
use std::collections::BTreeMap;
use tekton_fake_client::{ClientBuilder, Param, PatchType, Run, RunInterface, RunRef};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut seeded = Run::default();
    seeded.metadata.name = Some("nightly".to_string());
    seeded.metadata.namespace = Some("ci".to_string());
    seeded.metadata.labels = Some(BTreeMap::from([("app".to_string(), "release".to_string())]));

    let cs = ClientBuilder::new().with_object(seeded).build()?;
    let runs = cs.tekton_v1beta1().runs("ci");

    let mut run = Run::default();
    run.metadata.name = Some("wait-5s".to_string());
    run.metadata.labels = Some(BTreeMap::from([("app".to_string(), "build".to_string())]));
    run.spec.ref_ = Some(RunRef {
        api_version: Some("example.dev/v0".to_string()),
        kind: Some("Wait".to_string()),
        name: None,
    });
    run.spec.params = vec![Param::string("duration", "5s")];

    let created = runs.create(&run, &PostParams::default()).await?;
    println!(
        "Created run {} at resourceVersion {:?}",
        created.metadata.name.as_deref().unwrap_or_default(),
        created.metadata.resource_version
    );

    let all = runs.list(&ListParams::default()).await?;
    println!("\nRuns in ci: {}", all.items.len());
    for run in &all.items {
        println!("  - {}", run.metadata.name.as_deref().unwrap_or_default());
    }

    let builds = runs.list(&ListParams::default().labels("app=build")).await?;
    println!("Runs with app=build: {}", builds.items.len());

    let cancelled = runs
        .patch(
            "wait-5s",
            PatchType::MergePatch,
            br#"{"spec":{"status":"RunCancelled"}}"#,
            &PatchParams::default(),
            &[],
        )
        .await?;
    println!("\nCancelled: {}", cancelled.is_cancelled());

    runs.delete("wait-5s", &DeleteParams::default()).await?;
    match runs.get("wait-5s", &GetParams::default()).await {
        Err(e) if e.is_not_found() => println!("Deleted wait-5s"),
        other => println!("Unexpected: {:?}", other),
    }

    println!("\nRecorded actions:");
    for action in cs.fake().actions() {
        println!("  {}", action);
    }

    Ok(())
}
