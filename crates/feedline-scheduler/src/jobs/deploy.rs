use async_trait::async_trait;
use chrono::Utc;
use feedline_core::deployer::DeployOutcome;
use feedline_core::job::{JOB_COMPLETE, JobKind};
use feedline_core::project::DeploySummary;
use std::collections::HashSet;
use tracing::info;

use crate::context::JobContext;
use crate::error::JobError;
use crate::job::JobWork;

pub const PINNED_DEPLOYMENT_MISSING: &str =
    "Pinned deployment does not exist. Cancelling auto-deploy.";
pub const CRITICAL_ERRORS: &str =
    "Feed version has critical errors or is out of date. Cancelling auto-deploy.";
pub const NEVER_DEPLOYED: &str =
    "Pinned deployment has never been deployed. Cancelling auto-deploy.";

/// Puts the new version into the project's pinned deployment and redeploys
/// it to the server it last went to.
pub struct AutoDeployJob;

#[async_trait]
impl JobWork for AutoDeployJob {
    fn kind(&self) -> JobKind {
        JobKind::AutoDeploy
    }

    async fn execute(&self, ctx: &mut JobContext) -> Result<String, JobError> {
        let pinned_id = ctx.project.as_ref().and_then(|p| p.pinned_deployment_id);
        let mut deployment = match pinned_id {
            Some(id) => ctx.repos().deployments.find_deployment(id).await?,
            None => None,
        }
        .ok_or_else(|| JobError::Configuration(PINNED_DEPLOYMENT_MISSING.to_string()))?;

        let version = ctx
            .current_version()
            .await?
            .ok_or_else(|| JobError::Content("Feed source has no versions to deploy.".to_string()))?;
        let today = Utc::now().date_naive();
        let deployable = version
            .validation
            .as_ref()
            .is_some_and(|v| !v.has_critical_errors() && !v.is_expired(today));
        if !deployable {
            return Err(JobError::Content(CRITICAL_ERRORS.to_string()));
        }

        let server_id = deployment
            .latest()
            .map(|summary| summary.server_id.clone())
            .ok_or_else(|| JobError::Configuration(NEVER_DEPLOYED.to_string()))?;

        // One version per feed source: drop the one this version supersedes.
        let superseded: HashSet<_> = ctx
            .repos()
            .feed_versions
            .list_feed_versions(ctx.feed_source.id)
            .await?
            .into_iter()
            .map(|v| v.id)
            .collect();
        deployment.feed_version_ids.retain(|id| !superseded.contains(id));
        deployment.feed_version_ids.push(version.id);

        // Stored deployment is only written once the server accepts.
        match ctx
            .services
            .deploy_target
            .trigger(&server_id, &deployment)
            .await?
        {
            DeployOutcome::Accepted => {}
            DeployOutcome::Rejected { reason } => {
                return Err(JobError::Transient(format!(
                    "Deployment to {} was rejected: {}",
                    server_id, reason
                )));
            }
        }

        deployment.deploy_summaries.push(DeploySummary {
            server_id: server_id.clone(),
            deployed_at: Utc::now(),
        });
        ctx.repos().deployments.save_deployment(&deployment).await?;
        info!(
            deployment_id = %deployment.id,
            feed_version_id = %version.id,
            server_id = %server_id,
            "Auto-deploy triggered"
        );
        Ok(JOB_COMPLETE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::run_job;
    use crate::testing::Harness;
    use chrono::Duration;
    use feedline_core::feed::ValidationSummary;
    use feedline_core::job::JobState;

    #[tokio::test]
    async fn test_missing_pinned_deployment() {
        let harness = Harness::new().await;
        harness.enable_auto_deploy(None).await;
        let mut ctx = harness
            .context_with_validated_version(ValidationSummary::default())
            .await;

        let job = run_job(&AutoDeployJob, &mut ctx).await;
        assert_eq!(job.status.state, JobState::Failed);
        assert_eq!(job.status.message, PINNED_DEPLOYMENT_MISSING);
    }

    #[tokio::test]
    async fn test_dangling_pinned_deployment() {
        let harness = Harness::new().await;
        harness
            .enable_auto_deploy(Some(feedline_core::ResourceId::new()))
            .await;
        let mut ctx = harness
            .context_with_validated_version(ValidationSummary::default())
            .await;

        let job = run_job(&AutoDeployJob, &mut ctx).await;
        assert_eq!(job.status.message, PINNED_DEPLOYMENT_MISSING);
    }

    #[tokio::test]
    async fn test_blocking_error_cancels_deploy() {
        let harness = Harness::new().await;
        harness.pin_deployment(&["otp-prod"]).await;
        let mut ctx = harness
            .context_with_validated_version(ValidationSummary {
                blocking_error_count: 1,
                ..Default::default()
            })
            .await;

        let job = run_job(&AutoDeployJob, &mut ctx).await;
        assert_eq!(job.status.message, CRITICAL_ERRORS);
        assert_eq!(harness.deploy_target.triggers(), 0);
    }

    #[tokio::test]
    async fn test_expired_feed_cancels_deploy() {
        let harness = Harness::new().await;
        harness.pin_deployment(&["otp-prod"]).await;
        let mut ctx = harness
            .context_with_validated_version(ValidationSummary {
                end_date: Some(Utc::now().date_naive() - Duration::days(1)),
                ..Default::default()
            })
            .await;

        let job = run_job(&AutoDeployJob, &mut ctx).await;
        assert_eq!(job.status.message, CRITICAL_ERRORS);
    }

    #[tokio::test]
    async fn test_never_deployed() {
        let harness = Harness::new().await;
        harness.pin_deployment(&[]).await;
        let mut ctx = harness
            .context_with_validated_version(ValidationSummary::default())
            .await;

        let job = run_job(&AutoDeployJob, &mut ctx).await;
        assert_eq!(job.status.message, NEVER_DEPLOYED);
    }

    #[tokio::test]
    async fn test_clean_version_is_deployed_to_latest_server() {
        let harness = Harness::new().await;
        let deployment_id = harness.pin_deployment(&["otp-staging", "otp-prod"]).await;
        let old = harness.context_with_validated_version(ValidationSummary::default()).await;
        let old_id = old.new_version.as_ref().unwrap().id;
        let mut deployment = harness.repos.deployments.get_deployment(deployment_id).await.unwrap();
        deployment.feed_version_ids.push(old_id);
        harness.repos.deployments.save_deployment(&deployment).await.unwrap();

        let mut ctx = harness
            .context_with_validated_version(ValidationSummary::default())
            .await;
        let new_id = ctx.new_version.as_ref().unwrap().id;

        let job = run_job(&AutoDeployJob, &mut ctx).await;
        assert!(job.succeeded());
        assert_eq!(job.status.message, JOB_COMPLETE);
        assert_eq!(harness.deploy_target.last_server().as_deref(), Some("otp-prod"));

        let stored = harness.repos.deployments.get_deployment(deployment_id).await.unwrap();
        assert_eq!(stored.feed_version_ids, vec![new_id]);
        assert_eq!(stored.deploy_summaries.len(), 3);
        assert_eq!(stored.latest().unwrap().server_id, "otp-prod");
    }

    #[tokio::test]
    async fn test_rejected_trigger_fails() {
        let harness = Harness::new().await;
        let deployment_id = harness.pin_deployment(&["otp-prod"]).await;
        harness.deploy_target.reject("busy");
        let mut ctx = harness
            .context_with_validated_version(ValidationSummary::default())
            .await;
        let before = harness.repos.deployments.get_deployment(deployment_id).await.unwrap();

        let job = run_job(&AutoDeployJob, &mut ctx).await;
        assert!(job.status.error);
        assert_eq!(job.status.message, "Deployment to otp-prod was rejected: busy");

        let after = harness.repos.deployments.get_deployment(deployment_id).await.unwrap();
        assert_eq!(after.feed_version_ids, before.feed_version_ids);
        assert!(after.feed_version_ids.is_empty());
        assert_eq!(after.deploy_summaries.len(), before.deploy_summaries.len());
    }
}
