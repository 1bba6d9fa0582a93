//! Reply builders for a scripted kernel agent

#![allow(dead_code)]

use std::sync::Arc;

use ktf::testing::ScriptedTransport;
use ktf::wire::{AttrTag, CommandType, MessageBuilder, KTF_CMD_RESP, KTF_GENL_VERSION};
use ktf::{CheckReport, KtfConfig, KtfRunner, ProtocolVersion};
use parking_lot::Mutex;

/// A context as the agent declares it
pub struct Context {
    pub name: &'static str,
    pub type_id: u32,
    pub status: u32,
}

/// What the agent exposes
#[derive(Default)]
pub struct AgentModel {
    /// (handle, contexts)
    pub handles: Vec<(u32, Vec<Context>)>,
    /// (set, [(handle, test)])
    pub sets: Vec<(&'static str, Vec<(u32, &'static str)>)>,
}

impl AgentModel {
    pub fn discovery_reply(&self) -> Vec<u8> {
        let mut b = MessageBuilder::new(KTF_CMD_RESP, KTF_GENL_VERSION);
        b.put_u32(AttrTag::Type, CommandType::Query as u32)
            .put_u64(AttrTag::Version, ProtocolVersion::LATEST.raw());
        if !self.handles.is_empty() {
            b.put_nested(AttrTag::HandleList, |h| {
                for (handle, contexts) in &self.handles {
                    h.put_u32(AttrTag::HandleId, *handle);
                    h.put_nested(AttrTag::List, |l| {
                        for ctx in contexts {
                            l.put_string(AttrTag::Str, ctx.name)
                                .put_u32(AttrTag::Num, ctx.type_id)
                                .put_u32(AttrTag::Stat, ctx.status);
                        }
                    });
                }
            });
        }
        b.put_u32(AttrTag::Num, self.sets.len() as u32);
        b.put_nested(AttrTag::List, |l| {
            for (set, tests) in &self.sets {
                l.put_string(AttrTag::Str, set);
                if !tests.is_empty() {
                    l.put_nested(AttrTag::Test, |t| {
                        for (handle, test) in tests {
                            if *handle != 0 {
                                t.put_u32(AttrTag::HandleId, *handle);
                            }
                            t.put_string(AttrTag::Str, test);
                        }
                    });
                }
            }
        });
        b.finish().unwrap()
    }
}

/// Run reply listing (status, file, line, report) records
pub fn run_reply(records: &[(u32, &str, u32, &str)]) -> Vec<u8> {
    let mut b = MessageBuilder::new(KTF_CMD_RESP, KTF_GENL_VERSION);
    b.put_u32(AttrTag::Type, CommandType::Run as u32)
        .put_u32(AttrTag::Stat, 0)
        .put_nested(AttrTag::List, |l| {
            for (status, file, line, report) in records {
                l.put_u32(AttrTag::Stat, *status);
                if !file.is_empty() {
                    l.put_string(AttrTag::File, file)
                        .put_u32(AttrTag::Num, *line)
                        .put_string(AttrTag::Str, report);
                }
            }
        });
    b.finish().unwrap()
}

pub type Reports = Arc<Mutex<Vec<CheckReport>>>;

/// Runner connected to `agent` that has discovered `model`
pub fn discovered_runner(agent: &ScriptedTransport, model: &AgentModel) -> (KtfRunner, Reports) {
    let mut runner =
        KtfRunner::with_transport(Box::new(agent.clone()), &KtfConfig::default()).unwrap();
    let reports: Reports = Arc::default();
    let sink = Arc::clone(&reports);
    runner.set_sink(move |c: &CheckReport| sink.lock().push(c.clone()));
    agent.push_reply(model.discovery_reply());
    runner.query_testsets().unwrap();
    (runner, reports)
}
