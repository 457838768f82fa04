mod common;

use anyhow::Result;
use chrono::Duration;
use common::TestApp;
use patd::deadline::sweep_soft_deleted;
use patd::store::PatdStore;
use patd::workflow;
use patd::PatdError;

const INSUBORDINATION: &str = "Respondeu de forma desrespeitosa ao sargento de dia";

#[tokio::test]
async fn expired_trash_is_purged_with_its_artifacts() -> Result<()> {
    let app = TestApp::new().await?;
    let staff = &app.cast.staff.actor;

    let purged = app.notified_case(INSUBORDINATION).await?;
    workflow::attach_file(&app.state, staff, purged, "parte.pdf", b"%PDF parte".to_vec()).await?;
    let kept = app.notified_case(INSUBORDINATION).await?;
    let blobs_of_kept = app.storage.keys_with_prefix(&format!("patd_{kept}/")).await.len();

    workflow::soft_delete(&app.state, staff, purged).await?;
    app.clock.advance(Duration::days(20));
    workflow::soft_delete(&app.state, staff, kept).await?;

    app.clock.advance(Duration::days(11));
    let report = sweep_soft_deleted(&app.state).await?;
    assert_eq!(report.purged, 1);
    assert_eq!(report.blobs_removed, 2);
    assert_eq!(report.failed, 0);

    assert!(app.store.find_patd(purged)?.is_none());
    assert!(app.storage.keys_with_prefix(&format!("patd_{purged}/")).await.is_empty());
    assert!(app.store.list_attachments(purged)?.is_empty());
    let err = workflow::get_patd(&app.state, purged, true).await.unwrap_err();
    assert!(matches!(err, PatdError::NotFound(_)));

    // The trail outlives the case.
    let trail = workflow::history(&app.state, purged).await?;
    assert!(trail.iter().any(|entry| entry.reason == "case moved to trash"));

    assert!(workflow::get_patd(&app.state, kept, true).await?.is_deleted());
    assert_eq!(
        app.storage.keys_with_prefix(&format!("patd_{kept}/")).await.len(),
        blobs_of_kept
    );
    Ok(())
}

#[tokio::test]
async fn restored_case_survives_the_sweep() -> Result<()> {
    let app = TestApp::new().await?;
    let staff = &app.cast.staff.actor;
    let case = app.open_case(INSUBORDINATION).await?;

    workflow::soft_delete(&app.state, staff, case).await?;
    app.clock.advance(Duration::days(10));
    workflow::restore(&app.state, staff, case).await?;
    app.clock.advance(Duration::days(40));

    let report = sweep_soft_deleted(&app.state).await?;
    assert_eq!(report.purged, 0);
    assert!(!workflow::get_patd(&app.state, case, false).await?.is_deleted());
    Ok(())
}

#[tokio::test]
async fn retention_follows_the_configuration() -> Result<()> {
    let app = TestApp::new().await?;
    let staff = &app.cast.staff.actor;
    let mut configuration = app.state.configuration()?;
    configuration.soft_delete_retention_days = 7;
    workflow::update_configuration(&app.state, &app.cast.admin.actor, configuration).await?;

    let case = app.open_case(INSUBORDINATION).await?;
    workflow::soft_delete(&app.state, staff, case).await?;

    app.clock.advance(Duration::days(7));
    assert_eq!(sweep_soft_deleted(&app.state).await?.purged, 0);
    app.clock.advance(Duration::hours(1));
    assert_eq!(sweep_soft_deleted(&app.state).await?.purged, 1);

    let trail = workflow::history(&app.state, case).await?;
    assert_eq!(trail.len(), 2);
    Ok(())
}
