//! Attribute tags, value kinds and the validation policy

use std::fmt;

/// Size of an attribute header (length + type)
pub const NLA_HDRLEN: usize = 4;
/// Attribute alignment
pub const NLA_ALIGNTO: usize = 4;
/// Set in the type field of nested attributes
pub const NLA_F_NESTED: u16 = 1 << 15;
/// Set in the type field of network-byte-order attributes
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
/// Mask selecting the tag from the type field
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// Size of the family header preceding the attributes
pub const GENL_HDRLEN: usize = 4;

/// Family command for requests sent to the agent
pub const KTF_CMD_REQ: u8 = 1;
/// Family command for replies from the agent
pub const KTF_CMD_RESP: u8 = 2;
/// Family header version
pub const KTF_GENL_VERSION: u8 = 1;

/// Top-level and nested attribute tags understood by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AttrTag {
    /// Command type (u32, see [`CommandType`])
    Type = 1,
    /// Protocol version (u64)
    Version = 2,
    /// Set name
    SetName = 3,
    /// Test name
    TestName = 4,
    /// Count, type tag or line number depending on context (u32)
    Num = 5,
    /// Generic string payload (context name, report text, set name)
    Str = 6,
    /// Source file name
    File = 7,
    /// Status (u32)
    Stat = 8,
    /// Nested list
    List = 9,
    /// Nested test declaration
    Test = 10,
    /// Handle id (u32)
    HandleId = 11,
    /// Nested handle-to-context list
    HandleList = 12,
    /// Opaque data blob
    Data = 13,
    /// Kernel module name
    Module = 14,
    /// Coverage option bitmask (u32)
    CoverageOpts = 15,
}

impl AttrTag {
    /// Highest tag value
    pub const MAX: u16 = 15;

    /// Map a raw tag back to the enum
    pub fn from_u16(raw: u16) -> Option<Self> {
        let tag = match raw {
            1 => AttrTag::Type,
            2 => AttrTag::Version,
            3 => AttrTag::SetName,
            4 => AttrTag::TestName,
            5 => AttrTag::Num,
            6 => AttrTag::Str,
            7 => AttrTag::File,
            8 => AttrTag::Stat,
            9 => AttrTag::List,
            10 => AttrTag::Test,
            11 => AttrTag::HandleId,
            12 => AttrTag::HandleList,
            13 => AttrTag::Data,
            14 => AttrTag::Module,
            15 => AttrTag::CoverageOpts,
            _ => return None,
        };
        Some(tag)
    }
}

impl From<AttrTag> for u16 {
    fn from(tag: AttrTag) -> u16 {
        tag as u16
    }
}

/// Value kind carried by an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// NUL-terminated string
    String,
    /// Opaque bytes
    Binary,
    /// Nested attribute group
    Nested,
}

impl AttrKind {
    /// Human-readable kind name
    pub fn name(&self) -> &'static str {
        match self {
            AttrKind::U16 => "u16",
            AttrKind::U32 => "u32",
            AttrKind::U64 => "u64",
            AttrKind::String => "string",
            AttrKind::Binary => "binary",
            AttrKind::Nested => "nested",
        }
    }

    /// Exact payload size for fixed-width kinds
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            AttrKind::U16 => Some(2),
            AttrKind::U32 => Some(4),
            AttrKind::U64 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected kind per top-level tag, indexed by tag value
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    kinds: &'static [Option<AttrKind>],
}

impl Policy {
    /// Build a policy from a tag-indexed table (index 0 is unused)
    pub const fn new(kinds: &'static [Option<AttrKind>]) -> Self {
        Policy { kinds }
    }

    /// Expected kind for `tag`, `None` if the tag is outside the policy
    pub fn kind(&self, tag: u16) -> Option<AttrKind> {
        self.kinds.get(tag as usize).copied().flatten()
    }

    /// Highest tag covered by the policy
    pub fn max_tag(&self) -> u16 {
        self.kinds.len().saturating_sub(1) as u16
    }
}

/// Policy for messages exchanged with the KTF agent
pub static KTF_POLICY: Policy = Policy::new(&[
    None,                     // unspec
    Some(AttrKind::U32),      // Type
    Some(AttrKind::U64),      // Version
    Some(AttrKind::String),   // SetName
    Some(AttrKind::String),   // TestName
    Some(AttrKind::U32),      // Num
    Some(AttrKind::String),   // Str
    Some(AttrKind::String),   // File
    Some(AttrKind::U32),      // Stat
    Some(AttrKind::Nested),   // List
    Some(AttrKind::Nested),   // Test
    Some(AttrKind::U32),      // HandleId
    Some(AttrKind::Nested),   // HandleList
    Some(AttrKind::Binary),   // Data
    Some(AttrKind::String),   // Module
    Some(AttrKind::U32),      // CoverageOpts
]);

/// Request kinds carried in the [`AttrTag::Type`] attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandType {
    /// Discover test sets, tests and contexts
    Query = 1,
    /// Run one test
    Run = 2,
    /// Enable coverage for a module
    CoverageEnable = 3,
    /// Disable coverage for a module
    CoverageDisable = 4,
    /// Configure a context
    ContextConfig = 5,
}

impl CommandType {
    /// Map a raw command type back to the enum
    pub fn from_u32(raw: u32) -> Option<Self> {
        let cmd = match raw {
            1 => CommandType::Query,
            2 => CommandType::Run,
            3 => CommandType::CoverageEnable,
            4 => CommandType::CoverageDisable,
            5 => CommandType::ContextConfig,
            _ => return None,
        };
        Some(cmd)
    }
}
