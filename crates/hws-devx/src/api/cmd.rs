//! Hardware object control commands.
//!
//! [`DevxCmd`] is the command submission seam: create an object from an
//! attribute struct, modify a flow table, grant cross-instance access and
//! destroy an object. The typed helpers on the trait wrap the raw object
//! numbers into the matching [`DevxObjectId`](crate::types::DevxObjectId).

use crate::error::{DevxError, DevxResult};
use crate::types::{
    AliasOid, DevxObjType, FlowTableOid, FwFtType, RawObjectId, RtcOid, SteRangeOid, StcOid,
};

/// How entries are written into a lookup resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RtcUpdateIndexMode {
    #[default]
    ByHash,
    ByOffset,
}

/// How a lookup resource indexes its rows on packet lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RtcAccessIndexMode {
    #[default]
    ByHash,
    Linear,
}

/// Attributes for creating a lookup resource (RTC).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RtcCreateAttr {
    pub pd: u32,
    pub ste_base: RawObjectId,
    pub ste_offset: u32,
    pub log_size: u8,
    pub log_depth: u8,
    pub table_type: Option<FwFtType>,
    pub update_index_mode: RtcUpdateIndexMode,
    pub access_index_mode: RtcAccessIndexMode,
    pub match_definer_0: u32,
    pub num_hash_definer: u8,
    pub fw_gen_wqe: bool,
    pub is_frst_jumbo: bool,
    pub is_scnd_range: bool,
    pub is_compare: bool,
    pub miss_ft_id: Option<FlowTableOid>,
    pub stc_base: RawObjectId,
    pub reparse_mode: u8,
}

/// Attributes for creating a range of steering entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteRangeCreateAttr {
    pub table_type: FwFtType,
    pub log_size: u8,
}

/// Attributes for a jump-to-entry-table action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StcCreateAttr {
    pub table_type: FwFtType,
    pub ste_base: RawObjectId,
    pub ste_offset: u32,
    pub log_size: u8,
    pub match_definer_id: u32,
}

/// Attributes for creating an alias to an object of another instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasCreateAttr {
    pub obj_type: DevxObjType,
    pub obj_id: RawObjectId,
    pub vhca_id: u16,
    pub access_key: Vec<u8>,
}

/// Attributes for granting another instance access to an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowAccessAttr {
    pub obj_type: DevxObjType,
    pub obj_id: RawObjectId,
    pub access_key: Vec<u8>,
}

/// Object creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjCreateAttr {
    Rtc(RtcCreateAttr),
    SteRange(SteRangeCreateAttr),
    Stc(StcCreateAttr),
    Alias(AliasCreateAttr),
}

impl ObjCreateAttr {
    /// Returns the object class this request creates.
    pub fn obj_type(&self) -> DevxObjType {
        match self {
            ObjCreateAttr::Rtc(_) => DevxObjType::Rtc,
            ObjCreateAttr::SteRange(_) => DevxObjType::SteRange,
            ObjCreateAttr::Stc(_) => DevxObjType::Stc,
            ObjCreateAttr::Alias(_) => DevxObjType::Alias,
        }
    }
}

/// Hardware command submission.
pub trait DevxCmd: Send + Sync {
    /// Creates an object and returns its raw number.
    fn create_obj(&self, attr: &ObjCreateAttr) -> DevxResult<RawObjectId>;

    /// Grants another hardware instance access to an owned object.
    fn allow_other_vhca_access(&self, attr: &AllowAccessAttr) -> DevxResult<()>;

    /// Destroys an object.
    fn destroy_obj(&self, obj_type: DevxObjType, obj: RawObjectId) -> DevxResult<()>;

    /// Creates a lookup resource.
    fn create_rtc(&self, attr: RtcCreateAttr) -> DevxResult<RtcOid> {
        let raw = self.create_obj(&ObjCreateAttr::Rtc(attr))?;
        RtcOid::from_raw(raw).ok_or_else(|| DevxError::invalid_parameter("null RTC id"))
    }

    /// Creates a steering entry range.
    fn create_ste_range(&self, attr: SteRangeCreateAttr) -> DevxResult<SteRangeOid> {
        let raw = self.create_obj(&ObjCreateAttr::SteRange(attr))?;
        SteRangeOid::from_raw(raw).ok_or_else(|| DevxError::invalid_parameter("null STE id"))
    }

    /// Creates a jump-to-entry-table action.
    fn create_stc(&self, attr: StcCreateAttr) -> DevxResult<StcOid> {
        let raw = self.create_obj(&ObjCreateAttr::Stc(attr))?;
        StcOid::from_raw(raw).ok_or_else(|| DevxError::invalid_parameter("null STC id"))
    }

    /// Creates an alias object.
    fn create_alias(&self, attr: AliasCreateAttr) -> DevxResult<AliasOid> {
        let raw = self.create_obj(&ObjCreateAttr::Alias(attr))?;
        AliasOid::from_raw(raw).ok_or_else(|| DevxError::invalid_parameter("null alias id"))
    }

    fn destroy_rtc(&self, rtc: RtcOid) -> DevxResult<()> {
        self.destroy_obj(DevxObjType::Rtc, rtc.as_raw())
    }

    fn destroy_ste_range(&self, ste: SteRangeOid) -> DevxResult<()> {
        self.destroy_obj(DevxObjType::SteRange, ste.as_raw())
    }

    fn destroy_stc(&self, stc: StcOid) -> DevxResult<()> {
        self.destroy_obj(DevxObjType::Stc, stc.as_raw())
    }

    fn destroy_alias(&self, alias: AliasOid) -> DevxResult<()> {
        self.destroy_obj(DevxObjType::Alias, alias.as_raw())
    }
}
