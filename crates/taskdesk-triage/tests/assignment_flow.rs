//! End-to-end assignment flows against the in-memory gateway.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use taskdesk_core::config::AppConfig;
use taskdesk_core::extract::TicketCode;
use taskdesk_core::gateway::Collection;
use taskdesk_core::gateway::memory::MemoryGateway;
use taskdesk_core::model::Ticket;
use taskdesk_triage::engine::{
    AssignmentEngine, Decider, EngineError, Outcome, Proposal, SelectionError,
};

/// Answers queued up front; records what it was shown.
#[derive(Default)]
struct Script {
    confirm: VecDeque<bool>,
    picks: VecDeque<&'static str>,
    ticket_picks: VecDeque<&'static str>,
    shown: Vec<Vec<(String, u32)>>,
}

impl Script {
    fn accept() -> Self {
        Self {
            confirm: VecDeque::from([true]),
            ..Self::default()
        }
    }

    fn decline_then(pick: &'static str) -> Self {
        Self {
            confirm: VecDeque::from([false]),
            picks: VecDeque::from([pick]),
            ..Self::default()
        }
    }
}

impl Decider for Script {
    fn pick_ticket(&mut self, _code: &TicketCode, _matches: &[Ticket]) -> io::Result<String> {
        Ok(self.ticket_picks.pop_front().unwrap_or_default().to_string())
    }

    fn confirm(&mut self, proposal: &Proposal<'_>) -> io::Result<bool> {
        self.shown.push(
            proposal
                .candidates
                .iter()
                .map(|c| (c.name.clone(), c.open_tickets))
                .collect(),
        );
        Ok(self.confirm.pop_front().unwrap_or(false))
    }

    fn pick_candidate(&mut self, _proposal: &Proposal<'_>) -> io::Result<String> {
        Ok(self.picks.pop_front().unwrap_or_default().to_string())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0)
        .single()
        .expect("instant")
}

fn code(raw: &str) -> TicketCode {
    TicketCode::parse(raw).expect("code")
}

fn stages() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "In Progress", "fold": false}),
        json!({"id": 2, "name": "Done", "fold": true}),
    ]
}

fn users() -> Vec<Value> {
    vec![
        json!({"id": 5, "name": "Bob", "login": "bob", "email": "bob@example.com"}),
        json!({"id": 6, "name": "Cara", "login": "cara", "email": "cara@example.com"}),
        json!({"id": 7, "name": "Dev", "login": "dev", "email": false}),
    ]
}

/// Ticket 100 (TSK-AL-1) is unassigned in Alpha; Bob holds two open Alpha
/// tickets, Cara one.
fn tickets() -> Vec<Value> {
    vec![
        json!({"id": 100, "name": "New bug", "code": "TSK-AL-1", "project_id": [42, "Alpha"], "user_id": false, "stage_id": [1, "In Progress"], "write_date": "2026-10-15 08:00:00"}),
        json!({"id": 101, "code": "TSK-AL-2", "project_id": [42, "Alpha"], "user_id": [5, "Bob"], "stage_id": [1, "In Progress"], "write_date": "2026-10-14 08:00:00"}),
        json!({"id": 102, "code": "TSK-AL-3", "project_id": [42, "Alpha"], "user_id": [5, "Bob"], "stage_id": [1, "In Progress"], "write_date": "2026-01-01 08:00:00"}),
        json!({"id": 103, "code": "TSK-AL-4", "project_id": [42, "Alpha"], "user_id": [6, "Cara"], "stage_id": [1, "In Progress"], "write_date": "2026-01-01 08:00:00"}),
        json!({"id": 104, "code": "TSK-AL-5", "project_id": [42, "Alpha"], "user_id": [7, "Dev"], "stage_id": [2, "Done"], "write_date": "2026-10-15 08:00:00"}),
        json!({"id": 200, "name": "Orphan", "code": "TSK-OR-1", "project_id": false, "user_id": false, "stage_id": [1, "In Progress"]}),
    ]
}

fn gateway() -> MemoryGateway {
    MemoryGateway::new(1)
        .with_records(Collection::Stage, stages())
        .with_records(Collection::User, users())
        .with_records(Collection::Ticket, tickets())
}

fn config() -> AppConfig {
    AppConfig {
        open_stage_names: vec!["In Progress".to_string()],
        ..AppConfig::default()
    }
}

#[test]
fn accepting_the_top_candidate_writes_the_assignee() {
    let gw = gateway();
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let mut script = Script::accept();

    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut script)
        .expect("process");

    assert_eq!(
        outcome,
        Outcome::Assigned {
            ticket_id: 100,
            assignee: "Bob".to_string()
        }
    );
    assert_eq!(
        script.shown,
        vec![vec![("Bob".to_string(), 2), ("Cara".to_string(), 1)]]
    );
    let writes = gw.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].ids, vec![100]);
    assert_eq!(writes[0].values, json!({"user_id": 5}));
}

#[test]
fn dry_run_reports_without_writing() {
    let gw = gateway();
    let engine = AssignmentEngine::from_config(&gw, &config(), true);
    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::accept())
        .expect("process");

    assert_eq!(
        outcome,
        Outcome::DryRun {
            ticket_id: 100,
            assignee: "Bob".to_string()
        }
    );
    assert!(gw.writes().is_empty());
}

#[test]
fn override_picks_the_numbered_candidate() {
    let gw = gateway();
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::decline_then("2"))
        .expect("process");

    assert_eq!(
        outcome,
        Outcome::Assigned {
            ticket_id: 100,
            assignee: "Cara".to_string()
        }
    );
    assert_eq!(gw.writes()[0].values, json!({"user_id": 6}));
}

#[test]
fn out_of_range_pick_is_invalid_and_writes_nothing() {
    let gw = gateway();
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::decline_then("9"))
        .expect("process");

    assert_eq!(
        outcome,
        Outcome::InvalidSelection {
            reason: SelectionError::OutOfRange { index: 9, len: 2 }
        }
    );
    assert!(gw.writes().is_empty());
}

#[test]
fn blank_pick_skips() {
    let gw = gateway();
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::decline_then(""))
        .expect("process");
    assert_eq!(outcome, Outcome::Skipped);
    assert!(gw.writes().is_empty());
}

#[test]
fn unknown_code_is_not_found() {
    let gw = gateway();
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let outcome = engine
        .process(&code("TSK-NO-9"), now(), &mut Script::accept())
        .expect("process");
    assert_eq!(outcome, Outcome::NotFound);
}

#[test]
fn ticket_without_project_is_skipped() {
    let gw = gateway();
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let mut script = Script::accept();
    let outcome = engine
        .process(&code("TSK-OR-1"), now(), &mut script)
        .expect("process");
    assert_eq!(outcome, Outcome::NoProject { ticket_id: 200 });
    assert!(script.shown.is_empty());
}

#[test]
fn no_open_stages_skips_without_writing() {
    let gw = MemoryGateway::new(1)
        .with_records(
            Collection::Stage,
            vec![json!({"id": 2, "name": "Done", "fold": true})],
        )
        .with_records(Collection::User, users())
        .with_records(Collection::Ticket, tickets());
    let engine = AssignmentEngine::from_config(&gw, &AppConfig::default(), false);
    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::accept())
        .expect("process");
    assert_eq!(outcome, Outcome::NoOpenStages);
    assert!(gw.writes().is_empty());
}

#[test]
fn preferred_developer_without_workload_is_offered() {
    let gw = gateway();
    let mut config = config();
    config.preferred_developers = BTreeMap::from([(
        "Alpha".to_string(),
        vec!["dev".to_string(), "cara@example.com".to_string()],
    )]);
    let engine = AssignmentEngine::from_config(&gw, &config, true);
    let mut script = Script::accept();

    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut script)
        .expect("process");

    assert_eq!(
        script.shown,
        vec![vec![("Cara".to_string(), 1), ("Dev".to_string(), 0)]]
    );
    assert_eq!(
        outcome,
        Outcome::DryRun {
            ticket_id: 100,
            assignee: "Cara".to_string()
        }
    );
}

#[test]
fn no_candidates_when_project_has_no_workload_or_preference() {
    let gw = MemoryGateway::new(1)
        .with_records(Collection::Stage, stages())
        .with_records(Collection::User, users())
        .with_records(
            Collection::Ticket,
            vec![json!({"id": 300, "code": "TSK-EM-1", "project_id": [9, "Empty"], "user_id": false, "stage_id": [1, "In Progress"]})],
        );
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let outcome = engine
        .process(&code("TSK-EM-1"), now(), &mut Script::accept())
        .expect("process");
    assert_eq!(outcome, Outcome::NoCandidates { unresolved: vec![] });
}

#[test]
fn refused_write_is_reported() {
    let gw = gateway();
    gw.reject_writes();
    let engine = AssignmentEngine::from_config(&gw, &config(), false);
    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::accept())
        .expect("process");
    assert_eq!(
        outcome,
        Outcome::WriteFailed {
            ticket_id: 100,
            assignee: "Bob".to_string()
        }
    );
}

#[test]
fn duplicate_codes_ask_which_ticket() {
    let mut records = tickets();
    records.push(json!({"id": 150, "name": "Twin", "code": "TSK-AL-1", "project_id": false, "user_id": false}));
    let gw = MemoryGateway::new(1)
        .with_records(Collection::Stage, stages())
        .with_records(Collection::User, users())
        .with_records(Collection::Ticket, records);
    let engine = AssignmentEngine::from_config(&gw, &config(), true);

    let mut second = Script {
        ticket_picks: VecDeque::from(["2"]),
        ..Script::accept()
    };
    assert_eq!(
        engine
            .process(&code("TSK-AL-1"), now(), &mut second)
            .expect("process"),
        Outcome::NoProject { ticket_id: 150 }
    );

    let mut bogus = Script {
        ticket_picks: VecDeque::from(["x"]),
        ..Script::accept()
    };
    assert_eq!(
        engine
            .process(&code("TSK-AL-1"), now(), &mut bogus)
            .expect("process"),
        Outcome::InvalidTicketSelection {
            input: "x".to_string()
        }
    );
}

#[test]
fn gateway_fault_fails_only_the_current_ticket() {
    let gw = gateway();
    gw.fail_on(Collection::User);
    let engine = AssignmentEngine::from_config(&gw, &config(), false);

    let err = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::accept())
        .expect_err("user read fails");
    assert!(matches!(err, EngineError::Gateway(_)));

    // The next ticket is still processed normally.
    let outcome = engine
        .process(&code("TSK-OR-1"), now(), &mut Script::accept())
        .expect("process");
    assert_eq!(outcome, Outcome::NoProject { ticket_id: 200 });
}

#[test]
fn oversized_recency_window_still_processes_the_ticket() {
    let gw = gateway();
    let config = AppConfig {
        recent_days: u32::MAX,
        ..config()
    };
    let engine = AssignmentEngine::from_config(&gw, &config, true);
    let outcome = engine
        .process(&code("TSK-AL-1"), now(), &mut Script::accept())
        .expect("process");
    assert_eq!(
        outcome,
        Outcome::DryRun {
            ticket_id: 100,
            assignee: "Bob".to_string()
        }
    );
}
