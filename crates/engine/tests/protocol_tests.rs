//! Protocol round trips against a scripted agent
//!
//! These tests drive the orchestrator and the runner through
//! `ScriptedTransport` and verify:
//! - discovery populates the registry, skips on incompatible versions and
//!   leaves the registry untouched on malformed replies
//! - run replies are flushed to the sink record by record
//! - context configuration resolves, narrows and reports failures
//! - hybrid tests run their user body and the kernel half

use std::sync::Arc;

use ktf_core::{ConfigStatus, Error, HandleId, ProtocolVersion};
use ktf_engine::{CheckReport, Discovery, KtfConfig, KtfRunner, Orchestrator, RunSummary};
use ktf_registry::{Registry, WrapperBinding};
use ktf_session::testing::ScriptedTransport;
use ktf_session::ControlSession;
use ktf_wire::{
    parse_message, AttrTag, CommandType, MessageBuilder, KTF_CMD_RESP, KTF_GENL_VERSION,
    KTF_POLICY,
};
use parking_lot::Mutex;

// ============================================================================
// Helpers
// ============================================================================

type Reports = Arc<Mutex<Vec<CheckReport>>>;

fn reply(cmd: CommandType, fill: impl FnOnce(&mut MessageBuilder)) -> Vec<u8> {
    let mut b = MessageBuilder::new(KTF_CMD_RESP, KTF_GENL_VERSION);
    b.put_u32(AttrTag::Type, cmd as u32);
    fill(&mut b);
    b.finish().unwrap()
}

/// Discovery reply: handle 1 has contexts ctxA and ctxB (both configurable
/// with type 7), set "S" declares "plain" and "login" (handle 1), set
/// "empty" declares nothing.
fn discovery_reply(version: Option<ProtocolVersion>) -> Vec<u8> {
    reply(CommandType::Query, |b| {
        if let Some(v) = version {
            b.put_u64(AttrTag::Version, v.raw());
        }
        b.put_nested(AttrTag::HandleList, |h| {
            h.put_u32(AttrTag::HandleId, 1);
            h.put_nested(AttrTag::List, |l| {
                l.put_string(AttrTag::Str, "ctxA")
                    .put_u32(AttrTag::Num, 7)
                    .put_u32(AttrTag::Stat, 2)
                    .put_string(AttrTag::Str, "ctxB")
                    .put_u32(AttrTag::Num, 7)
                    .put_u32(AttrTag::Stat, 0);
            });
        })
        .put_u32(AttrTag::Num, 2)
        .put_nested(AttrTag::List, |l| {
            l.put_string(AttrTag::Str, "S");
            l.put_nested(AttrTag::Test, |t| {
                t.put_string(AttrTag::Str, "plain")
                    .put_u32(AttrTag::HandleId, 1)
                    .put_string(AttrTag::Str, "login");
            });
            l.put_string(AttrTag::Str, "empty");
        });
    })
}

fn run_reply(fill: impl FnOnce(&mut MessageBuilder)) -> Vec<u8> {
    reply(CommandType::Run, fill)
}

fn orchestrator(agent: &ScriptedTransport) -> (Orchestrator, Reports) {
    let session = ControlSession::connect(Box::new(agent.clone()), "ktf").unwrap();
    let mut orch = Orchestrator::new(session);
    let reports: Reports = Arc::default();
    let sink = Arc::clone(&reports);
    orch.set_sink(move |c: &CheckReport| sink.lock().push(c.clone()));
    (orch, reports)
}

fn discovered(agent: &ScriptedTransport) -> (Orchestrator, Registry<()>, Reports) {
    let (mut orch, reports) = orchestrator(agent);
    let mut registry = Registry::new();
    agent.push_reply(discovery_reply(Some(ProtocolVersion::LATEST)));
    orch.discover(&mut registry).unwrap();
    (orch, registry, reports)
}

fn runner(agent: &ScriptedTransport) -> (KtfRunner, Reports) {
    let mut runner =
        KtfRunner::with_transport(Box::new(agent.clone()), &KtfConfig::default()).unwrap();
    let reports: Reports = Arc::default();
    let sink = Arc::clone(&reports);
    runner.set_sink(move |c: &CheckReport| sink.lock().push(c.clone()));
    agent.push_reply(discovery_reply(None));
    runner.query_testsets().unwrap();
    (runner, reports)
}

// ============================================================================
// Discovery
// ============================================================================

mod discovery {
    use super::*;

    #[test]
    fn test_discovery_populates_registry() {
        let agent = ScriptedTransport::new();
        let (mut orch, _) = orchestrator(&agent);
        let mut registry: Registry<()> = Registry::new();
        agent.push_reply(discovery_reply(Some(ProtocolVersion::LATEST)));

        let outcome = orch.discover(&mut registry).unwrap();
        assert_eq!(
            outcome,
            Discovery::Applied {
                remote: ProtocolVersion::LATEST,
                declared: 2,
                sets: 2
            }
        );
        assert_eq!(registry.set_names(), vec!["S", "empty"]);

        let set = registry.set("S").unwrap();
        assert_eq!(
            set.test_names(),
            [
                "plain".to_string(),
                "login_ctxA".to_string(),
                "login_ctxB".to_string()
            ]
        );
        assert!(registry.set("empty").unwrap().test_names().is_empty());

        let ctxa = registry.find_contexts("ctxA");
        assert_eq!(ctxa.len(), 1);
        assert_eq!(ctxa[0].handle(), HandleId(1));
        assert_eq!(ctxa[0].type_id(), 7);
        assert_eq!(ctxa[0].status(), ConfigStatus::Unconfigured);
        assert_eq!(registry.find_contexts("ctxB")[0].status(), ConfigStatus::Ready);
    }

    #[test]
    fn test_discovery_request_carries_version() {
        let agent = ScriptedTransport::new();
        let _ = discovered(&agent);
        let sent = agent.sent();
        assert_eq!(sent.len(), 1);
        let msg = parse_message(&sent[0], &KTF_POLICY).unwrap();
        assert_eq!(msg.get(AttrTag::Type).unwrap().u32().unwrap(), CommandType::Query as u32);
        assert_eq!(
            msg.get(AttrTag::Version).unwrap().u64().unwrap(),
            ProtocolVersion::LATEST.raw()
        );
    }

    #[test]
    fn test_incompatible_major_is_skipped() {
        let agent = ScriptedTransport::new();
        let (mut orch, _) = orchestrator(&agent);
        let mut registry: Registry<()> = Registry::new();
        let remote = ProtocolVersion::new(9, 0, 0, 0);
        agent.push_reply(discovery_reply(Some(remote)));

        let outcome = orch.discover(&mut registry).unwrap();
        assert_eq!(
            outcome,
            Discovery::Skipped {
                local: ProtocolVersion::LATEST,
                remote
            }
        );
        assert!(registry.sets().is_empty());
        assert!(!registry.has_context_groups());
    }

    #[test]
    fn test_missing_version_assumes_implicit() {
        let agent = ScriptedTransport::new();
        let session = ControlSession::connect(Box::new(agent.clone()), "ktf").unwrap();
        let mut orch = Orchestrator::new(session).with_version(ProtocolVersion::new(0, 1, 3, 1));
        let mut registry: Registry<()> = Registry::new();
        agent.push_reply(discovery_reply(None));

        match orch.discover(&mut registry).unwrap() {
            Discovery::Applied { remote, .. } => assert_eq!(remote, ProtocolVersion::IMPLICIT),
            other => panic!("expected applied discovery, got {:?}", other),
        }
        assert_eq!(registry.sets().len(), 2);
    }

    #[test]
    fn test_missing_version_with_newer_minor_is_skipped() {
        let agent = ScriptedTransport::new();
        let (mut orch, _) = orchestrator(&agent);
        let mut registry: Registry<()> = Registry::new();
        agent.push_reply(discovery_reply(None));

        let outcome = orch.discover(&mut registry).unwrap();
        assert!(matches!(outcome, Discovery::Skipped { .. }));
    }

    #[test]
    fn test_missing_count_leaves_registry_untouched() {
        let agent = ScriptedTransport::new();
        let (mut orch, _) = orchestrator(&agent);
        let mut registry: Registry<()> = Registry::new();
        agent.push_reply(reply(CommandType::Query, |b| {
            b.put_u64(AttrTag::Version, ProtocolVersion::LATEST.raw())
                .put_nested(AttrTag::HandleList, |h| {
                    h.put_u32(AttrTag::HandleId, 1);
                    h.put_nested(AttrTag::List, |l| {
                        l.put_string(AttrTag::Str, "ctx");
                    });
                });
        }));

        let err = orch.discover(&mut registry).unwrap_err();
        assert!(err.is_protocol());
        assert!(!registry.has_context_groups());

        // The session stays usable
        agent.push_reply(discovery_reply(Some(ProtocolVersion::LATEST)));
        assert!(orch.discover(&mut registry).is_ok());
    }

    #[test]
    fn test_nack_reads_no_body() {
        let agent = ScriptedTransport::new();
        let (mut orch, _) = orchestrator(&agent);
        let mut registry: Registry<()> = Registry::new();
        agent.push_nack_with_body(-22, discovery_reply(None));

        let err = orch.discover(&mut registry).unwrap_err();
        assert!(matches!(err, Error::Nack { status: -22 }));
        assert_eq!(agent.bodies_read(), 0);
    }
}

// ============================================================================
// Running tests
// ============================================================================

mod run {
    use super::*;

    #[test]
    fn test_previous_check_flushed_then_last() {
        let agent = ScriptedTransport::new();
        let (mut orch, _registry, reports) = discovered(&agent);
        agent.push_reply(run_reply(|b| {
            b.put_nested(AttrTag::List, |l| {
                l.put_u32(AttrTag::Stat, 3)
                    .put_u32(AttrTag::Stat, 0)
                    .put_string(AttrTag::File, "f")
                    .put_u32(AttrTag::Num, 7)
                    .put_string(AttrTag::Str, "bad");
            });
        }));

        let summary = orch.run_kernel_test("S", "plain", "", None).unwrap();
        let reports = reports.lock();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].status, 3);
        assert_eq!(
            reports[1],
            CheckReport {
                status: 0,
                file: "f".into(),
                line: 7,
                report: "bad".into()
            }
        );
        assert_eq!(
            summary,
            RunSummary {
                checks: 2,
                asserts: 4,
                failures: 1,
                exec_status: 0
            }
        );
    }

    #[test]
    fn test_empty_list_reports_no_location() {
        let agent = ScriptedTransport::new();
        let (mut orch, _registry, reports) = discovered(&agent);
        agent.push_reply(run_reply(|b| {
            b.put_nested(AttrTag::List, |_| {});
        }));

        orch.run_kernel_test("S", "plain", "", None).unwrap();
        assert_eq!(*reports.lock(), vec![CheckReport::initial()]);
    }

    #[test]
    fn test_no_list_no_callbacks() {
        let agent = ScriptedTransport::new();
        let (mut orch, _registry, reports) = discovered(&agent);
        agent.push_reply(run_reply(|b| {
            b.put_u32(AttrTag::Stat, 5);
        }));

        let summary = orch.run_kernel_test("S", "plain", "", None).unwrap();
        assert!(reports.lock().is_empty());
        assert_eq!(summary.exec_status, 5);
        assert!(!summary.passed());
    }

    #[test]
    fn test_run_request_carries_context_and_data() {
        let agent = ScriptedTransport::new();
        let (mut orch, _registry, _) = discovered(&agent);
        agent.push_reply(run_reply(|_| {}));

        orch.run_kernel_test("S", "login", "ctxA", Some(&[1, 2])).unwrap();
        let sent = agent.sent();
        let msg = parse_message(sent.last().unwrap(), &KTF_POLICY).unwrap();
        assert_eq!(msg.get(AttrTag::SetName).unwrap().string(), "S");
        assert_eq!(msg.get(AttrTag::TestName).unwrap().string(), "login");
        assert_eq!(msg.get(AttrTag::Str).unwrap().string(), "ctxA");
        assert_eq!(msg.get(AttrTag::Data).unwrap().bytes(), &[1, 2]);
    }

    #[test]
    fn test_malformed_check_list_reports_nothing() {
        let agent = ScriptedTransport::new();
        let (mut orch, _registry, reports) = discovered(&agent);
        agent.push_reply(run_reply(|b| {
            b.put_nested(AttrTag::List, |l| {
                l.put_u32(AttrTag::Stat, 1).put_u32(AttrTag::HandleId, 3);
            });
        }));

        assert!(orch.run_kernel_test("S", "plain", "", None).is_err());
        assert!(reports.lock().is_empty());
    }
}

// ============================================================================
// Context configuration
// ============================================================================

mod configure {
    use super::*;

    /// Registry where "shared" belongs to handles 1 and 2
    fn shared_contexts(agent: &ScriptedTransport) -> (Orchestrator, Registry<()>) {
        let (orch, _) = orchestrator(agent);
        let mut registry = Registry::new();
        registry.add_configurable_context("shared", 7, HandleId(1), ConfigStatus::Unconfigured);
        registry.add_cset(HandleId(1), vec!["shared".into()]);
        registry.add_configurable_context("shared", 7, HandleId(2), ConfigStatus::Unconfigured);
        registry.add_cset(HandleId(2), vec!["shared".into()]);
        registry.register_kernel_test("S", "one", HandleId(1));
        registry.register_kernel_test("S", "two", HandleId(2));
        (orch, registry)
    }

    #[test]
    fn test_configure_unique_context() {
        let agent = ScriptedTransport::new();
        let (mut orch, mut registry, _) = discovered(&agent);
        agent.push_ack(0);

        orch.configure_context(&mut registry, "ctxA", 7, b"cfg").unwrap();
        assert_eq!(registry.find_contexts("ctxA")[0].status(), ConfigStatus::Ready);

        let sent = agent.sent();
        let msg = parse_message(sent.last().unwrap(), &KTF_POLICY).unwrap();
        assert_eq!(
            msg.get(AttrTag::Type).unwrap().u32().unwrap(),
            CommandType::ContextConfig as u32
        );
        assert_eq!(msg.get(AttrTag::Str).unwrap().string(), "ctxA");
        assert_eq!(msg.get(AttrTag::HandleId).unwrap().u32().unwrap(), 1);
        assert_eq!(msg.get(AttrTag::Data).unwrap().bytes(), b"cfg");
        // Configuration replies are ack-only
        assert_eq!(agent.bodies_read(), 1);
    }

    #[test]
    fn test_configure_unknown_context() {
        let agent = ScriptedTransport::new();
        let (mut orch, mut registry, _) = discovered(&agent);
        let err = orch.configure_context(&mut registry, "nope", 7, b"").unwrap_err();
        assert!(matches!(err, Error::ContextNotFound { .. }));
        assert_eq!(agent.sent().len(), 1);
    }

    #[test]
    fn test_configure_type_mismatch() {
        let agent = ScriptedTransport::new();
        let (mut orch, mut registry, _) = discovered(&agent);
        let err = orch.configure_context(&mut registry, "ctxA", 8, b"").unwrap_err();
        assert!(matches!(
            err,
            Error::ContextTypeMismatch {
                expected: 8,
                actual: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_configure_rejected() {
        let agent = ScriptedTransport::new();
        let (mut orch, mut registry, _) = discovered(&agent);
        agent.push_nack(-22);

        let err = orch.configure_context(&mut registry, "ctxA", 7, b"").unwrap_err();
        assert!(matches!(err, Error::ConfigureRejected { status: -22, .. }));
        assert_eq!(registry.find_contexts("ctxA")[0].status(), ConfigStatus::Error(-22));
    }

    #[test]
    fn test_ambiguous_context_needs_handle() {
        let agent = ScriptedTransport::new();
        let (mut orch, mut registry) = shared_contexts(&agent);

        let err = orch.configure_context(&mut registry, "shared", 7, b"").unwrap_err();
        assert!(matches!(err, Error::AmbiguousContext { matches: 2, .. }));

        agent.push_ack(0);
        orch.configure_context_for_test(&mut registry, "S", "two_shared", 7, b"x")
            .unwrap();
        let contexts = registry.find_contexts("shared");
        assert_eq!(contexts[0].status(), ConfigStatus::Unconfigured);
        assert_eq!(contexts[1].status(), ConfigStatus::Ready);

        let sent = agent.sent();
        let msg = parse_message(sent.last().unwrap(), &KTF_POLICY).unwrap();
        assert_eq!(msg.get(AttrTag::HandleId).unwrap().u32().unwrap(), 2);
    }

    #[test]
    fn test_configure_for_test_errors() {
        let agent = ScriptedTransport::new();
        let (mut orch, mut registry, _) = discovered(&agent);

        let err = orch
            .configure_context_for_test(&mut registry, "S", "missing", 7, b"")
            .unwrap_err();
        assert!(matches!(err, Error::TestNotFound { .. }));

        let err = orch
            .configure_context_for_test(&mut registry, "S", "plain", 7, b"")
            .unwrap_err();
        assert!(matches!(err, Error::NoContext { .. }));

        // Resolved directly, so there is no context suffix to configure
        let err = orch
            .configure_context_for_test(&mut registry, "S", "login", 7, b"")
            .unwrap_err();
        assert!(matches!(err, Error::UnconfigurableContext { .. }));
    }

    #[test]
    fn test_coverage_drains_reply() {
        let agent = ScriptedTransport::new();
        let (mut orch, _registry, _) = discovered(&agent);
        agent.push_reply(vec![0; 8]);

        orch.set_coverage("mymod", 1, true).unwrap();
        let sent = agent.sent();
        let msg = parse_message(sent.last().unwrap(), &KTF_POLICY).unwrap();
        assert_eq!(
            msg.get(AttrTag::Type).unwrap().u32().unwrap(),
            CommandType::CoverageEnable as u32
        );
        assert_eq!(msg.get(AttrTag::Module).unwrap().string(), "mymod");
        assert_eq!(agent.bodies_read(), 2);
    }
}

// ============================================================================
// Runner and hybrid tests
// ============================================================================

mod runner {
    use super::*;

    fn runner_with_version(agent: &ScriptedTransport) -> (KtfRunner, Reports) {
        let config = KtfConfig {
            protocol_version: Some(ProtocolVersion::new(0, 1, 2, 0)),
            ..KtfConfig::default()
        };
        let mut runner = KtfRunner::with_transport(Box::new(agent.clone()), &config).unwrap();
        let reports: Reports = Arc::default();
        let sink = Arc::clone(&reports);
        runner.set_sink(move |c: &CheckReport| sink.lock().push(c.clone()));
        agent.push_reply(discovery_reply(None));
        assert!(matches!(runner.query_testsets().unwrap(), Discovery::Applied { .. }));
        (runner, reports)
    }

    #[test]
    fn test_runner_connect_failure() {
        let agent = ScriptedTransport::new();
        agent.refuse_connect();
        let err = KtfRunner::with_transport(Box::new(agent), &KtfConfig::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_runner_skips_on_default_version() {
        let agent = ScriptedTransport::new();
        let (runner, _) = runner(&agent);
        assert!(runner.set_names().is_empty());
    }

    #[test]
    fn test_run_test_resolves_context() {
        let agent = ScriptedTransport::new();
        let (mut runner, reports) = runner_with_version(&agent);
        agent.push_reply(run_reply(|b| {
            b.put_nested(AttrTag::List, |l| {
                l.put_u32(AttrTag::Stat, 2);
            });
        }));

        let summary = runner.run_test("S", "login_ctxB").unwrap();
        assert_eq!(summary.asserts, 2);
        assert_eq!(reports.lock().len(), 1);

        let sent = agent.sent();
        let msg = parse_message(sent.last().unwrap(), &KTF_POLICY).unwrap();
        assert_eq!(msg.get(AttrTag::TestName).unwrap().string(), "login");
        assert_eq!(msg.get(AttrTag::Str).unwrap().string(), "ctxB");
    }

    #[test]
    fn test_run_unknown_test() {
        let agent = ScriptedTransport::new();
        let (mut runner, _) = runner_with_version(&agent);
        let err = runner.run_test("S", "nope").unwrap_err();
        assert!(matches!(err, Error::TestNotFound { .. }));
    }

    #[test]
    fn test_priv_data_sent_with_run() {
        let agent = ScriptedTransport::new();
        let (mut runner, _) = runner_with_version(&agent);
        runner.priv_data("S", "plain", 4).unwrap().copy_from_slice(&[4, 3, 2, 1]);
        agent.push_reply(run_reply(|_| {}));

        runner.run_test("S", "plain").unwrap();
        let sent = agent.sent();
        let msg = parse_message(sent.last().unwrap(), &KTF_POLICY).unwrap();
        assert_eq!(msg.get(AttrTag::Data).unwrap().bytes(), &[4, 3, 2, 1]);
    }

    #[test]
    fn test_hybrid_body_configures_then_runs_kernel() {
        let agent = ScriptedTransport::new();
        let (mut runner, _) = runner_with_version(&agent);
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let log = Arc::clone(&seen);

        let binding = runner.add_wrapper("S", "login", move |ctx| {
            log.lock().push(format!("{}.{}:{}", ctx.set(), ctx.name(), ctx.context()));
            ctx.priv_data(2)?.copy_from_slice(&[7, 7]);
            ctx.configure_context(7, b"cfg")?;
            ctx.run_kernel()?;
            Ok(())
        });
        assert_eq!(binding, WrapperBinding::Bound);

        agent.push_ack(0);
        agent.push_reply(run_reply(|b| {
            b.put_nested(AttrTag::List, |l| {
                l.put_u32(AttrTag::Stat, 0);
            });
        }));

        let summary = runner.run_test("S", "login_ctxA").unwrap();
        assert_eq!(summary.failures, 1);
        assert_eq!(*seen.lock(), vec!["S.login:ctxA".to_string()]);
        assert_eq!(
            runner.registry().find_contexts("ctxA")[0].status(),
            ConfigStatus::Ready
        );

        let sent = agent.sent();
        let run = parse_message(sent.last().unwrap(), &KTF_POLICY).unwrap();
        assert_eq!(run.get(AttrTag::Data).unwrap().bytes(), &[7, 7]);
    }

    #[test]
    fn test_wrapper_before_discovery_is_bound() {
        let agent = ScriptedTransport::new();
        let config = KtfConfig {
            protocol_version: Some(ProtocolVersion::new(0, 1, 0, 0)),
            ..KtfConfig::default()
        };
        let mut runner = KtfRunner::with_transport(Box::new(agent.clone()), &config).unwrap();
        let binding = runner.add_wrapper("S", "plain", |_| Ok(()));
        assert_eq!(binding, WrapperBinding::Pending);
        let binding = runner.add_wrapper("orphan", "combined", |_| Ok(()));
        assert_eq!(binding, WrapperBinding::Pending);

        agent.push_reply(discovery_reply(None));
        runner.query_testsets().unwrap();

        let (test, _) = runner.find_test("S", "plain").unwrap();
        assert!(test.user_test().is_some());
        assert!(!runner.registry().set("S").unwrap().has_pending_wrapper("plain"));

        let names: Vec<&str> = runner.exposed_tests().map(|s| s.name).collect();
        assert_eq!(names, vec!["S", "empty"]);

        // The body runs instead of a kernel round trip
        let before = agent.sent().len();
        let summary = runner.run_test("S", "plain").unwrap();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(agent.sent().len(), before);
    }
}

// ============================================================================
// Check record properties
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    type Record = (u32, String, u32, String);

    fn records() -> impl Strategy<Value = Vec<Record>> {
        prop::collection::vec(
            (0u32..5, "[a-z_./]{1,12}", any::<u32>(), "[a-z ]{1,24}"),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn one_report_per_status(records in records()) {
            let agent = ScriptedTransport::new();
            let (mut orch, _registry, reports) = discovered(&agent);
            agent.push_reply(run_reply(|b| {
                b.put_nested(AttrTag::List, |l| {
                    for (status, file, line, report) in &records {
                        l.put_u32(AttrTag::Stat, *status)
                            .put_string(AttrTag::File, file)
                            .put_u32(AttrTag::Num, *line)
                            .put_string(AttrTag::Str, report);
                    }
                });
            }));

            let summary = orch.run_kernel_test("S", "plain", "", None).unwrap();
            let reports = reports.lock();

            if records.is_empty() {
                prop_assert_eq!(&*reports, &vec![CheckReport::initial()]);
            } else {
                prop_assert_eq!(reports.len(), records.len());
                for (seen, (status, file, line, report)) in reports.iter().zip(&records) {
                    prop_assert_eq!(seen.status, i64::from(*status));
                    prop_assert_eq!(&seen.file, file);
                    prop_assert_eq!(seen.line, *line);
                    prop_assert_eq!(&seen.report, report);
                }
            }

            let failures = records.iter().filter(|r| r.0 == 0).count() as u64;
            let asserts: u64 = records.iter().map(|r| u64::from(r.0.max(1))).sum();
            prop_assert_eq!(summary.checks, reports.len());
            prop_assert_eq!(summary.failures, failures);
            prop_assert_eq!(summary.asserts, asserts);
            prop_assert_eq!(summary.passed(), failures == 0);
        }
    }
}
