//! Testing a custom task controller against the fake clientset

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{GetParams, ListParams, PostParams};
use std::sync::Arc;
use tekton_fake_client::{
    ClientBuilder, Condition, ParamValue, Run, RunInterface, RunStatus, CONDITION_SUCCEEDED,
};

/// Completes `Wait` runs immediately, failing those without a duration
pub struct WaitController {
    runs: Arc<dyn RunInterface>,
}

impl WaitController {
    pub fn new(runs: Arc<dyn RunInterface>) -> Self {
        Self { runs }
    }

    pub async fn reconcile(&self, name: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut run = self.runs.get(name, &GetParams::default()).await?;
        if run.is_done() {
            return Ok(());
        }

        let now = Time(Utc::now());
        let duration = run
            .spec
            .params
            .iter()
            .find(|p| p.name == "duration")
            .map(|p| p.value.clone());

        let condition = if run.is_cancelled() {
            succeeded("False", "RunCancelled", "cancelled before completion")
        } else {
            match duration {
                Some(ParamValue::String(d)) => {
                    succeeded("True", "Succeeded", &format!("waited {}", d))
                }
                _ => succeeded("False", "InvalidParams", "missing string param \"duration\""),
            }
        };

        run.status = Some(RunStatus {
            conditions: vec![condition],
            start_time: Some(now.clone()),
            completion_time: Some(now),
            ..Default::default()
        });
        self.runs.update_status(&run, &PostParams::default()).await?;
        Ok(())
    }

    pub async fn reconcile_all(&self) -> Result<(), Box<dyn std::error::Error>> {
        let pending = self.runs.list(&ListParams::default()).await?;
        for run in pending.items {
            if let Some(name) = &run.metadata.name {
                self.reconcile(name).await?;
            }
        }
        Ok(())
    }
}

fn succeeded(status: &str, reason: &str, message: &str) -> Condition {
    Condition {
        type_: CONDITION_SUCCEEDED.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cs = ClientBuilder::new()
        .with_fixture_dir("fixtures")
        .load_fixture("runs.yaml")?
        .build()?;

    for namespace in ["default", "ci"] {
        let runs = cs.tekton_v1beta1().runs(namespace);
        WaitController::new(Arc::new(runs)).reconcile_all().await?;
    }

    let everywhere = cs.tekton_v1beta1().runs("");
    for run in everywhere.list(&ListParams::default()).await?.items {
        let condition = run.condition(CONDITION_SUCCEEDED);
        println!(
            "{}/{}: {:?}",
            run.metadata.namespace.as_deref().unwrap_or_default(),
            run.metadata.name.as_deref().unwrap_or_default(),
            condition.map(|c| (&c.status, &c.reason))
        );
    }

    Ok(())
}
