//! Hybrid tests through the facade

use std::sync::Arc;

use ktf::testing::ScriptedTransport;
use ktf::{ConfigStatus, Error, WrapperBinding};
use parking_lot::Mutex;

use crate::agent::{discovered_runner, run_reply, AgentModel, Context};

fn model() -> AgentModel {
    AgentModel {
        handles: vec![(
            5,
            vec![Context {
                name: "dev",
                type_id: 9,
                status: 2,
            }],
        )],
        sets: vec![("hybrid", vec![(5, "login"), (0, "plain")])],
    }
}

#[test]
fn body_configures_and_runs_kernel_half() {
    let agent = ScriptedTransport::new();
    let (mut runner, _) = discovered_runner(&agent, &model());
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);

    let binding = runner.add_wrapper("hybrid", "login", move |ctx| {
        *counter.lock() += 1;
        ctx.configure_context(9, &42u32.to_ne_bytes())?;
        let summary = ctx.run_kernel()?;
        assert_eq!(summary.asserts, 1);
        Ok(())
    });
    assert_eq!(binding, WrapperBinding::Bound);

    agent.push_ack(0);
    agent.push_reply(run_reply(&[(1, "", 0, "")]));
    let summary = runner.run_test("hybrid", "login_dev").unwrap();

    assert!(summary.passed());
    assert_eq!(*calls.lock(), 1);
    assert_eq!(
        runner.registry().find_contexts("dev")[0].status(),
        ConfigStatus::Ready
    );
}

#[test]
fn body_error_propagates() {
    let agent = ScriptedTransport::new();
    let (mut runner, _) = discovered_runner(&agent, &model());
    runner.add_wrapper("hybrid", "plain", |ctx| {
        // "plain" has no handle, so there is nothing to configure
        ctx.configure_context(9, b"")
    });

    let err = runner.run_test("hybrid", "plain").unwrap_err();
    assert!(matches!(err, Error::NoContext { .. }));
}

#[test]
fn orphaned_wrapper_set_hidden() {
    let agent = ScriptedTransport::new();
    let (mut runner, _) = discovered_runner(&agent, &model());
    assert_eq!(
        runner.add_wrapper("user_only", "combined", |_| Ok(())),
        WrapperBinding::Pending
    );
    let names: Vec<&str> = runner.exposed_tests().map(|s| s.name).collect();
    assert_eq!(names, vec!["hybrid"]);
    assert_eq!(runner.set_names(), vec!["hybrid", "user_only"]);
}
