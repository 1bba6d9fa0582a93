//! Full sessions: config, discovery, enumeration, runs

use ktf::testing::ScriptedTransport;
use ktf::{Discovery, Error, KtfConfig, KtfRunner, ProtocolVersion};
use tempfile::TempDir;

use crate::agent::{discovered_runner, run_reply, AgentModel, Context};

fn model() -> AgentModel {
    AgentModel {
        handles: vec![(
            3,
            vec![
                Context {
                    name: "net",
                    type_id: 1,
                    status: 2,
                },
                Context {
                    name: "loopback",
                    type_id: 1,
                    status: 2,
                },
            ],
        )],
        sets: vec![
            ("basic", vec![(0, "simple"), (0, "another")]),
            ("ctx", vec![(3, "send")]),
            ("idle", vec![]),
        ],
    }
}

#[test]
fn run_every_exposed_test() {
    let agent = ScriptedTransport::new();
    let (mut runner, reports) = discovered_runner(&agent, &model());

    let plan: Vec<(String, String)> = runner
        .exposed_tests()
        .flat_map(|s| {
            s.test_names
                .iter()
                .map(move |t| (s.name.to_string(), t.clone()))
        })
        .collect();
    assert_eq!(
        plan,
        vec![
            ("basic".to_string(), "simple".to_string()),
            ("basic".to_string(), "another".to_string()),
            ("ctx".to_string(), "send_net".to_string()),
            ("ctx".to_string(), "send_loopback".to_string()),
        ]
    );

    for _ in &plan {
        agent.push_reply(run_reply(&[(1, "", 0, ""), (2, "", 0, "")]));
    }
    let mut asserts = 0;
    for (set, test) in &plan {
        let summary = runner.run_test(set, test).unwrap();
        assert!(summary.passed());
        asserts += summary.asserts;
    }
    assert_eq!(asserts, 12);
    assert_eq!(reports.lock().len(), 8);
    assert_eq!(agent.pending_replies(), 0);
}

#[test]
fn failing_check_reaches_the_sink() {
    let agent = ScriptedTransport::new();
    let (mut runner, reports) = discovered_runner(&agent, &model());
    agent.push_reply(run_reply(&[(0, "net_test.c", 42, "expected 0, got 1")]));

    let summary = runner.run_test("ctx", "send_net").unwrap();
    assert_eq!(summary.failures, 1);
    let reports = reports.lock();
    assert_eq!(reports[0].file, "net_test.c");
    assert_eq!(reports[0].line, 42);
    assert_eq!(reports[0].report, "expected 0, got 1");
}

#[test]
fn config_file_pins_protocol_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(ktf::CONFIG_FILE_NAME);
    std::fs::write(&path, "family = \"ktf\"\nprotocol_version = \"0.3\"\n").unwrap();
    let config = KtfConfig::from_file(&path).unwrap();
    assert_eq!(config.latest_version(), ProtocolVersion::new(0, 3, 0, 0));

    let agent = ScriptedTransport::new();
    let mut runner = KtfRunner::with_transport(Box::new(agent.clone()), &config).unwrap();
    agent.push_reply(model().discovery_reply());
    assert!(matches!(
        runner.query_testsets().unwrap(),
        Discovery::Skipped { .. }
    ));
    assert!(runner.set_names().is_empty());
}

#[test]
fn unknown_family_is_fatal() {
    let agent = ScriptedTransport::new();
    let config = KtfConfig {
        family: "missing".to_string(),
        ..KtfConfig::default()
    };
    let err = KtfRunner::with_transport(Box::new(agent), &config).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, Error::Setup { .. }));
}

#[test]
fn coverage_toggle() {
    let agent = ScriptedTransport::new();
    let (mut runner, _) = discovered_runner(&agent, &model());
    agent.push_reply(Vec::new());
    runner.set_coverage("ktf_net", 0, true).unwrap();
    agent.push_nack(-2);
    let err = runner.set_coverage("ktf_net", 0, false).unwrap_err();
    assert!(matches!(err, Error::Nack { status: -2 }));
}
