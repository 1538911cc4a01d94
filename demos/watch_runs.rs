//! Watching runs while another task mutates them

use futures::StreamExt;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::core::WatchEvent;
use std::collections::BTreeMap;
use tekton_fake_client::{Clientset, Condition, Run, RunInterface, RunStatus, CONDITION_SUCCEEDED};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cs = Clientset::new();
    let runs = cs.tekton_v1beta1().runs("ci");

    let mut events = runs
        .watch(&ListParams::default().labels("app=build"))
        .await?;

    let writer = runs.clone();
    let producer = tokio::spawn(async move {
        let mut run = Run::default();
        run.metadata.name = Some("watched".to_string());
        run.metadata.labels = Some(BTreeMap::from([("app".to_string(), "build".to_string())]));
        let mut run = writer.create(&run, &PostParams::default()).await?;

        run.status = Some(RunStatus {
            conditions: vec![Condition {
                type_: CONDITION_SUCCEEDED.to_string(),
                status: "True".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        writer.update_status(&run, &PostParams::default()).await?;
        writer.delete("watched", &DeleteParams::default()).await?;
        Ok::<_, tekton_fake_client::Error>(())
    });

    for _ in 0..3 {
        match events.next().await {
            Some(Ok(WatchEvent::Added(run))) => println!("ADDED    {:?}", run.metadata.name),
            Some(Ok(WatchEvent::Modified(run))) => {
                println!("MODIFIED {:?} done={}", run.metadata.name, run.is_done())
            }
            Some(Ok(WatchEvent::Deleted(run))) => println!("DELETED  {:?}", run.metadata.name),
            Some(Ok(other)) => println!("other event: {:?}", other),
            Some(Err(e)) => println!("decode error: {}", e),
            None => break,
        }
    }

    producer.await??;
    Ok(())
}
