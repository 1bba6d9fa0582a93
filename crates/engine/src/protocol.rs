//! Request encoding and reply decoding
//!
//! Replies are decoded into plain values before anything acts on them, so a
//! malformed reply never leaves the registry or the result sink half-updated.

use ktf_core::{ConfigStatus, Error, HandleId, ProtocolVersion, Result, TypeId};
use ktf_wire::{
    parse_message, Attr, AttrTag, CommandType, MessageBuilder, ParsedMessage, KTF_CMD_REQ,
    KTF_GENL_VERSION, KTF_POLICY,
};
use tracing::{debug, error, info};

// =============================================================================
// Requests
// =============================================================================

fn request(cmd: CommandType, version: ProtocolVersion) -> MessageBuilder {
    let mut b = MessageBuilder::new(KTF_CMD_REQ, KTF_GENL_VERSION);
    b.put_u32(AttrTag::Type, cmd as u32)
        .put_u64(AttrTag::Version, version.raw());
    b
}

pub(crate) fn query_request(version: ProtocolVersion) -> Result<Vec<u8>> {
    request(CommandType::Query, version).finish()
}

pub(crate) fn run_request(
    version: ProtocolVersion,
    set: &str,
    test: &str,
    context: &str,
    priv_data: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut b = request(CommandType::Run, version);
    b.put_string(AttrTag::SetName, set)
        .put_string(AttrTag::TestName, test);
    if !context.is_empty() {
        b.put_string(AttrTag::Str, context);
    }
    if let Some(data) = priv_data {
        b.put_bytes(AttrTag::Data, data);
    }
    b.finish()
}

pub(crate) fn configure_request(
    version: ProtocolVersion,
    context: &str,
    handle: HandleId,
    type_id: TypeId,
    data: &[u8],
) -> Result<Vec<u8>> {
    let mut b = request(CommandType::ContextConfig, version);
    b.put_string(AttrTag::Str, context)
        .put_u32(AttrTag::HandleId, handle.0)
        .put_u32(AttrTag::Num, type_id)
        .put_bytes(AttrTag::Data, data);
    b.finish()
}

pub(crate) fn coverage_request(
    version: ProtocolVersion,
    module: &str,
    options: u32,
    enabled: bool,
) -> Result<Vec<u8>> {
    let cmd = if enabled {
        CommandType::CoverageEnable
    } else {
        CommandType::CoverageDisable
    };
    let mut b = MessageBuilder::new(KTF_CMD_REQ, KTF_GENL_VERSION);
    b.put_u32(AttrTag::Type, cmd as u32)
        .put_u32(AttrTag::CoverageOpts, options)
        .put_u64(AttrTag::Version, version.raw())
        .put_string(AttrTag::Module, module);
    b.finish()
}

// =============================================================================
// Replies
// =============================================================================

/// Parse a reply and check that it answers `expected`
fn parse_reply(buf: &[u8], expected: CommandType) -> Result<ParsedMessage<'_>> {
    let msg = parse_message(buf, &KTF_POLICY)?;
    let raw = msg
        .get(AttrTag::Type)
        .ok_or_else(|| Error::protocol("received kernel response without a type"))?
        .u32()?;
    if CommandType::from_u32(raw) != Some(expected) {
        debug!(target: "ktf::protocol", reply_type = raw, expected = ?expected, "Unexpected reply type");
        return Err(Error::protocol(format!(
            "expected {:?} reply, got type {}",
            expected, raw
        )));
    }
    Ok(msg)
}

fn unexpected(what: &str, attr: &Attr<'_>) -> Error {
    Error::protocol(format!("{}: unexpected attribute type {}", what, attr.tag()))
}

/// A context declared in a discovery reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContextDecl {
    pub name: String,
    pub type_id: TypeId,
    pub status: ConfigStatus,
}

/// Contexts of one handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HandleGroup {
    pub handle: HandleId,
    /// Every context name listed for the handle, configurable or not
    pub names: Vec<String>,
    pub contexts: Vec<ContextDecl>,
}

/// One set and its test declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SetDecl {
    pub name: String,
    pub tests: Vec<(HandleId, String)>,
}

/// Discovery reply content
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiscoveryReply {
    pub remote: ProtocolVersion,
    pub groups: Vec<HandleGroup>,
    pub declared: u32,
    pub sets: Vec<SetDecl>,
}

/// Outcome of decoding a discovery reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecodedDiscovery {
    Reply(DiscoveryReply),
    Incompatible { remote: ProtocolVersion },
}

pub(crate) fn decode_discovery(buf: &[u8], latest: ProtocolVersion) -> Result<DecodedDiscovery> {
    let msg = parse_reply(buf, CommandType::Query)?;

    let remote = match msg.get(AttrTag::Version) {
        Some(attr) => ProtocolVersion::from_raw(attr.u64()?),
        None => ProtocolVersion::IMPLICIT,
    };
    if remote != latest {
        if remote.is_compatible_with(&latest) {
            info!(target: "ktf::protocol", user = %latest, kernel = %remote,
                "Note: KTF version difference - user lib {}, kernel has {}", latest, remote);
        } else {
            error!(target: "ktf::protocol", user = %latest, kernel = %remote,
                "Error: KTF version difference - user lib {}, kernel has {}", latest, remote);
            return Ok(DecodedDiscovery::Incompatible { remote });
        }
    }

    let groups = match msg.get(AttrTag::HandleList) {
        Some(list) => decode_handle_list(&list)?,
        None => Vec::new(),
    };

    let declared = msg
        .get(AttrTag::Num)
        .ok_or_else(|| Error::protocol("no test set count in kernel response"))?
        .u32()?;
    debug!(target: "ktf::protocol", declared, "Kernel offers test sets");

    let sets = match msg.get(AttrTag::List) {
        Some(list) => decode_set_list(&list)?,
        None => Vec::new(),
    };

    Ok(DecodedDiscovery::Reply(DiscoveryReply {
        remote,
        groups,
        declared,
        sets,
    }))
}

fn decode_handle_list(list: &Attr<'_>) -> Result<Vec<HandleGroup>> {
    let mut groups = Vec::new();
    let mut handle = HandleId::NONE;
    for attr in list.nested() {
        let attr = attr?;
        match AttrTag::from_u16(attr.tag()) {
            Some(AttrTag::HandleId) => handle = HandleId(attr.u32()?),
            Some(AttrTag::List) => {
                let mut group = HandleGroup {
                    handle,
                    names: Vec::new(),
                    contexts: Vec::new(),
                };
                let mut name = String::new();
                let mut type_id = 0;
                for inner in attr.nested() {
                    let inner = inner?;
                    match AttrTag::from_u16(inner.tag()) {
                        Some(AttrTag::Str) => {
                            name = inner.string();
                            group.names.push(name.clone());
                        }
                        Some(AttrTag::Num) => type_id = inner.u32()?,
                        Some(AttrTag::Stat) => group.contexts.push(ContextDecl {
                            name: name.clone(),
                            type_id,
                            status: ConfigStatus::from_raw(inner.u32()? as i32),
                        }),
                        _ => {}
                    }
                }
                groups.push(group);
                handle = HandleId::NONE;
            }
            _ => return Err(unexpected("handle list", &attr)),
        }
    }
    Ok(groups)
}

fn decode_set_list(list: &Attr<'_>) -> Result<Vec<SetDecl>> {
    let mut sets: Vec<SetDecl> = Vec::new();
    for attr in list.nested() {
        let attr = attr?;
        match AttrTag::from_u16(attr.tag()) {
            Some(AttrTag::Str) => sets.push(SetDecl {
                name: attr.string(),
                tests: Vec::new(),
            }),
            Some(AttrTag::Test) => {
                let set = sets
                    .last_mut()
                    .ok_or_else(|| Error::protocol("test declaration before any set name"))?;
                decode_tests(&attr, &mut set.tests)?;
            }
            _ => return Err(unexpected("set list", &attr)),
        }
    }
    Ok(sets)
}

fn decode_tests(decl: &Attr<'_>, tests: &mut Vec<(HandleId, String)>) -> Result<()> {
    let mut handle = HandleId::NONE;
    for attr in decl.nested() {
        let attr = attr?;
        match AttrTag::from_u16(attr.tag()) {
            Some(AttrTag::HandleId) => handle = HandleId(attr.u32()?),
            Some(AttrTag::Str) => {
                tests.push((handle, attr.string()));
                handle = HandleId::NONE;
            }
            _ => return Err(unexpected("test declaration", &attr)),
        }
    }
    Ok(())
}

/// One element of a run reply's check list
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CheckRecord {
    Status(u32),
    File(String),
    Line(u32),
    Report(String),
}

/// Run reply content
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunReply {
    pub exec_status: u32,
    /// `None` when the reply carries no check list
    pub records: Option<Vec<CheckRecord>>,
}

pub(crate) fn decode_run(buf: &[u8]) -> Result<RunReply> {
    let msg = parse_reply(buf, CommandType::Run)?;

    let exec_status = match msg.get(AttrTag::Stat) {
        Some(attr) => attr.u32()?,
        None => 0,
    };

    let records = match msg.get(AttrTag::List) {
        Some(list) => {
            let mut records = Vec::new();
            for attr in list.nested() {
                let attr = attr?;
                let record = match AttrTag::from_u16(attr.tag()) {
                    Some(AttrTag::Stat) => CheckRecord::Status(attr.u32()?),
                    Some(AttrTag::File) => CheckRecord::File(attr.string()),
                    Some(AttrTag::Num) => CheckRecord::Line(attr.u32()?),
                    Some(AttrTag::Str) => CheckRecord::Report(attr.string()),
                    _ => return Err(unexpected("check list", &attr)),
                };
                records.push(record);
            }
            Some(records)
        }
        None => None,
    };

    Ok(RunReply {
        exec_status,
        records,
    })
}
