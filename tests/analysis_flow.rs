mod common;

use anyhow::Result;
use chrono::Duration;
use common::{signature, TestApp};
use patd::audit::NewAuditEntry;
use patd::clock::Clock;
use patd::machine::Status;
use patd::patd::Patd;
use patd::sanction::{Sanction, SanctionType};
use patd::store::PatdStore;
use patd::workflow;
use patd::PatdError;

const MISSED_ESCORT: &str = "Faltou à missão de escolta do comboio de abastecimento";

async fn defended_case(app: &TestApp) -> Result<i64> {
    let case = app.notified_case(MISSED_ESCORT).await?;
    app.clock.advance(Duration::hours(1));
    workflow::submit_defense(
        &app.state,
        &app.cast.accused.actor,
        case,
        "Estava baixado na enfermaria.",
        signature(),
    )
    .await?;
    Ok(case)
}

/// Stores a finalized case of the accused carrying `sanction`.
fn finalized_case(app: &TestApp, case_number: i64, sanction: Sanction, days_ago: i64) -> Result<()> {
    let ended = app.clock.now() - Duration::days(days_ago);
    let mut patd = Patd::new(
        case_number,
        app.cast.accused.id(),
        "Deixou de cumprir ordem recebida".to_string(),
        ended - Duration::days(20),
    );
    patd.officer_id = Some(app.cast.officer.id());
    patd.applied_sanction = Some(sanction);
    patd.status = Status::Finalized;
    patd.terminated_at = Some(ended);
    patd.published_at = Some(ended);
    patd.updated_at = ended;
    app.store.insert_patd(
        &patd,
        &NewAuditEntry {
            case_number,
            ts: ended,
            actor_id: None,
            from_state: None,
            to_state: Status::Finalized,
            reason: "imported".to_string(),
        },
    )?;
    Ok(())
}

#[tokio::test]
async fn malformed_reply_is_retried_once() -> Result<()> {
    let app = TestApp::new().await?;
    let case = defended_case(&app).await?;

    app.llm.reply("Claro! O item aplicável é o 19.");
    app.llm.script_analysis(&[19], &[], &[], ("detention", 6));
    let outcome = workflow::run_analysis(&app.state, &app.cast.officer.actor, case).await?;

    assert_eq!(app.llm.calls(), 4);
    assert_eq!(app.llm.pending(), 0);
    assert_eq!(outcome.suggested_sanction, Sanction::new(SanctionType::Detention, 6)?);
    assert_eq!(app.patd(case).await?.status, Status::AwaitingSanctionApplication);
    Ok(())
}

#[tokio::test]
async fn second_failure_surfaces_without_writing() -> Result<()> {
    let app = TestApp::new().await?;
    let case = defended_case(&app).await?;
    let before = app.patd(case).await?;
    let entries = workflow::history(&app.state, case).await?.len();

    app.llm.reply("não sei");
    app.llm.fail("upstream timed out");
    let err = workflow::run_analysis(&app.state, &app.cast.officer.actor, case)
        .await
        .unwrap_err();
    assert!(matches!(err, PatdError::AiFailure(_)));
    assert_eq!(app.llm.calls(), 2);

    let after = app.patd(case).await?;
    assert_eq!(after, before);
    assert_eq!(workflow::history(&app.state, case).await?.len(), entries);
    Ok(())
}

#[tokio::test]
async fn rerunning_the_analysis_is_stable() -> Result<()> {
    let app = TestApp::new().await?;
    let officer = &app.cast.officer.actor;
    let case = defended_case(&app).await?;

    app.llm.script_analysis(&[19], &["a"], &["c"], ("detention", 8));
    let first = workflow::run_analysis(&app.state, officer, case).await?;
    app.llm.script_analysis(&[19], &["a"], &["c"], ("detention", 8));
    let second = workflow::run_analysis(&app.state, officer, case).await?;

    assert_eq!(first, second);
    assert_eq!(first.suggested_sanction, Sanction::new(SanctionType::Detention, 8)?);
    let trail = workflow::history(&app.state, case).await?;
    let last = trail.last().expect("rerun recorded");
    assert_eq!(last.from_state, Some(Status::AwaitingSanctionApplication));
    assert_eq!(last.to_state, Status::AwaitingSanctionApplication);

    // Identical prompts for identical inputs.
    let requests = app.llm.requests();
    assert_eq!(requests[..3], requests[3..]);
    assert!(requests[0].prompt.contains(MISSED_ESCORT));
    Ok(())
}

#[tokio::test]
async fn calculator_overrides_the_model() -> Result<()> {
    let app = TestApp::new().await?;
    let case = defended_case(&app).await?;

    app.llm.script_analysis(&[19], &["b"], &[], ("arrest", 10));
    let outcome = workflow::run_analysis(&app.state, &app.cast.officer.actor, case).await?;

    assert_eq!(outcome.suggested_sanction, Sanction::new(SanctionType::Detention, 6)?);
    assert!(outcome.circumstances.aggravators.is_empty());
    assert!(outcome.rationale.contains("base"));
    Ok(())
}

#[tokio::test]
async fn several_items_add_the_multiple_transgressions_aggravator() -> Result<()> {
    let app = TestApp::new().await?;
    let case = defended_case(&app).await?;

    app.llm.script_analysis(&[11, 19], &[], &[], ("detention", 8));
    let outcome = workflow::run_analysis(&app.state, &app.cast.officer.actor, case).await?;

    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.circumstances.aggravators, vec!['c']);
    assert_eq!(outcome.suggested_sanction, Sanction::new(SanctionType::Detention, 8)?);
    Ok(())
}

#[tokio::test]
async fn recent_restrictive_sanctions_count_as_reincidence() -> Result<()> {
    let app = TestApp::starting_at(common::monday_morning(), 101).await?;
    finalized_case(&app, 40, Sanction::new(SanctionType::Detention, 4)?, 120)?;
    finalized_case(&app, 57, Sanction::new(SanctionType::Detention, 2)?, 200)?;
    finalized_case(&app, 12, Sanction::new(SanctionType::Arrest, 6)?, 400)?;
    finalized_case(&app, 41, Sanction::reprimand(), 30)?;

    let case = defended_case(&app).await?;
    assert_eq!(case, 101);

    app.llm.script_analysis(&[19], &[], &[], ("detention", 6));
    let outcome = workflow::run_analysis(&app.state, &app.cast.officer.actor, case).await?;

    assert_eq!(outcome.circumstances.aggravators, vec!['b']);
    assert_eq!(outcome.suggested_sanction, Sanction::new(SanctionType::Detention, 10)?);
    assert!(outcome.rationale.contains("agravante b (+4)"));
    assert!(!outcome.behavior_delta.is_empty());

    let requests = app.llm.requests();
    let assess_prompt = &requests[1].prompt;
    assert!(assess_prompt.contains("2 detenção(ões)"));
    assert!(assess_prompt.contains("1 repreensão(ões)"));
    Ok(())
}

#[tokio::test]
async fn unknown_catalog_item_is_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let case = defended_case(&app).await?;

    app.llm.reply(r#"{"items":[{"number":150}]}"#);
    app.llm.reply(r#"{"items":[]}"#);
    let err = workflow::run_analysis(&app.state, &app.cast.officer.actor, case)
        .await
        .unwrap_err();
    assert!(matches!(err, PatdError::AiFailure(_)));
    assert!(app.patd(case).await?.items.is_empty());
    Ok(())
}
