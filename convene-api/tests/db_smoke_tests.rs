//! Smoke tests against a live PostgreSQL (enable with `--features db-tests`).

#![cfg(feature = "db-tests")]

use convene_api::{ApiResult, DbClient, DbConfig};
use convene_core::PageRequest;
use convene_storage::{AgentFilter, AgentUpdate, MeetingFilter, Store};
use convene_test_utils::fixtures::{agent_at, meeting_for, minutes_after_epoch};
use uuid::Uuid;

async fn test_db() -> ApiResult<DbClient> {
    let db = DbClient::from_config(&DbConfig::from_env())?;
    db.migrate().await?;
    Ok(db)
}

#[tokio::test]
async fn test_smoke_agent_and_meeting_lifecycle() -> ApiResult<()> {
    let db = test_db().await?;
    let owner = format!("smoke_{}", Uuid::now_v7());

    let agent = db
        .agent_insert(&agent_at(&owner, "100% Tutor_", minutes_after_epoch(0)))
        .await?;
    let meeting = db
        .meeting_insert(&meeting_for(&agent, "Kickoff", minutes_after_epoch(1)))
        .await?;

    let detail = db.agent_get(agent.id, &owner).await?.expect("agent exists");
    assert_eq!(detail.meeting_count, 1);
    assert!(db.agent_get(agent.id, "someone-else").await?.is_none());

    // Wildcards in search text match literally.
    let literal = AgentFilter::new(owner.as_str(), Some("0% tutor_".to_string()));
    assert_eq!(db.agent_count(&literal).await?, 1);
    let wildcard = AgentFilter::new(owner.as_str(), Some("%".to_string()));
    assert_eq!(db.agent_count(&wildcard).await?, 1);
    let no_match = AgentFilter::new(owner.as_str(), Some("x_x".to_string()));
    assert_eq!(db.agent_count(&no_match).await?, 0);

    let meetings = db
        .meeting_list(
            &MeetingFilter::new(owner.as_str(), None, Some(agent.id)),
            PageRequest::new(1, 10).window(),
        )
        .await?;
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].meeting.id, meeting.id);
    assert_eq!(meetings[0].agent.name, "100% Tutor_");

    let update = AgentUpdate {
        name: Some("Coach".to_string()),
        instructions: None,
    };
    let updated = db
        .agent_update(agent.id, &owner, &update, chrono::Utc::now())
        .await?
        .expect("agent updated");
    assert_eq!(updated.name, "Coach");
    assert_eq!(updated.instructions, agent.instructions);

    let removed = db.agent_delete(agent.id, &owner).await?.expect("agent removed");
    assert_eq!(removed.id, agent.id);
    assert!(db.meeting_get(meeting.id, &owner).await?.is_none());

    Ok(())
}
