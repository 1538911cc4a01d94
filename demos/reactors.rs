//! Injecting failures and canned responses with reactors

use kube::api::{DeleteParams, GetParams, PostParams};
use kube::core::ErrorResponse;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tekton_fake_client::{ClientBuilder, Error, Run, RunInterface};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let creates = Arc::new(AtomicUsize::new(0));
    let counter = creates.clone();

    let cs = ClientBuilder::new()
        // Fail every other create, let the rest through to the store
        .with_reactor("create", "runs", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                return Err(Error::Api(ErrorResponse {
                    status: "Failure".to_string(),
                    message: "etcd leader changed".to_string(),
                    reason: "ServiceUnavailable".to_string(),
                    code: 503,
                }));
            }
            Ok(None)
        })
        // Answer gets for a magic name without touching the store
        .with_reactor("get", "runs", |action| {
            if action.name() != Some("phantom") {
                return Ok(None);
            }
            Ok(Some(json!({
                "apiVersion": "tekton.dev/v1beta1",
                "kind": "Run",
                "metadata": {"name": "phantom", "namespace": action.namespace},
                "spec": {}
            })))
        })
        .build()?;

    let runs = cs.tekton_v1beta1().runs("ci");
    for i in 0..4 {
        let mut run = Run::default();
        run.metadata.name = Some(format!("run-{}", i));
        match runs.create(&run, &PostParams::default()).await {
            Ok(_) => println!("run-{} created", i),
            Err(e) => println!("run-{} failed: {} ({})", i, e, e.code()),
        }
    }

    let phantom = runs.get("phantom", &GetParams::default()).await?;
    println!("\nGot {:?} from a reactor", phantom.metadata.name);

    // Reactors can also be added after construction; prepended ones run first
    cs.fake().prepend_reactor("delete", "*", |action| {
        Err(Error::Conflict(format!("{} is pinned", action.name().unwrap_or_default())))
    });
    if let Err(e) = runs.delete("run-0", &DeleteParams::default()).await {
        println!("Delete refused: {}", e);
    }

    println!("\n{} actions recorded", cs.fake().actions().len());
    Ok(())
}
