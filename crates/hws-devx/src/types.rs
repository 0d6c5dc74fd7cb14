//! Type-safe hardware object ID wrappers.
//!
//! Every object created through the command layer is identified by a raw
//! 32-bit object number. The wrappers here keep flow tables, lookup
//! resources (RTCs), entry ranges and aliases from being mixed up when a
//! cross-reference is written.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Raw hardware object number as returned by the command layer.
pub type RawObjectId = u32;

/// Marker trait for hardware object kinds.
pub trait DevxObjectKind: Send + Sync + 'static {
    /// Returns the object type name for debugging.
    fn type_name() -> &'static str;
}

/// A type-safe hardware object ID.
///
/// # Examples
///
/// ```
/// use hws_devx::{FlowTableOid, RtcOid};
///
/// let ft = FlowTableOid::from_raw(0x10).unwrap();
/// let rtc = RtcOid::from_raw(0x20).unwrap();
///
/// // fn takes_rtc(r: RtcOid) {}
/// // takes_rtc(ft);  // Error: expected RtcOid, found FlowTableOid
/// assert_eq!(ft.as_raw(), 0x10);
/// assert_eq!(rtc.as_raw(), 0x20);
/// ```
#[derive(Clone, Copy)]
pub struct DevxObjectId<T: DevxObjectKind> {
    raw: RawObjectId,
    _marker: PhantomData<T>,
}

impl<T: DevxObjectKind> DevxObjectId<T> {
    /// Creates an object ID from a raw value.
    ///
    /// Returns `None` for 0, which the hardware never hands out.
    pub fn from_raw(raw: RawObjectId) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self {
                raw,
                _marker: PhantomData,
            })
        }
    }

    /// Returns the raw object number.
    pub const fn as_raw(&self) -> RawObjectId {
        self.raw
    }
}

impl<T: DevxObjectKind> fmt::Debug for DevxObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:08x})", T::type_name(), self.raw)
    }
}

impl<T: DevxObjectKind> fmt::Display for DevxObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.raw)
    }
}

impl<T: DevxObjectKind> PartialEq for DevxObjectId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: DevxObjectKind> Eq for DevxObjectId<T> {}

impl<T: DevxObjectKind> Hash for DevxObjectId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

// ============================================================================
// Object Kind Markers
// ============================================================================

macro_rules! define_object_kind {
    ($name:ident, $type_name:literal, $oid_alias:ident) => {
        #[doc = concat!("Marker type for ", $type_name, " objects.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl DevxObjectKind for $name {
            fn type_name() -> &'static str {
                $type_name
            }
        }

        #[doc = concat!("Object ID of a ", $type_name, ".")]
        pub type $oid_alias = DevxObjectId<$name>;
    };
}

define_object_kind!(FlowTableKind, "FlowTable", FlowTableOid);
define_object_kind!(RtcKind, "Rtc", RtcOid);
define_object_kind!(SteRangeKind, "SteRange", SteRangeOid);
define_object_kind!(StcKind, "Stc", StcOid);
define_object_kind!(AliasKind, "Alias", AliasOid);

// ============================================================================
// Steering Handles
// ============================================================================

/// Handle of a table registered in a steering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tbl#{}", self.0)
    }
}

/// Handle of a matcher registered in a steering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatcherId(pub u64);

impl fmt::Display for MatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matcher#{}", self.0)
    }
}

/// Hardware object classes the command layer can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevxObjType {
    /// Lookup resource (routing table context).
    Rtc,
    /// Contiguous range of steering entries backing a pool.
    SteRange,
    /// Steering context action.
    Stc,
    /// Alias to an object owned by another hardware instance.
    Alias,
}

impl fmt::Display for DevxObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DevxObjType::Rtc => "RTC",
            DevxObjType::SteRange => "STE_RANGE",
            DevxObjType::Stc => "STC",
            DevxObjType::Alias => "ALIAS",
        };
        write!(f, "{}", s)
    }
}

/// Classification domain of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableType {
    NicRx,
    NicTx,
    /// Switch domain with separate RX and TX resources.
    Fdb,
    /// Switch domain, RX side only.
    FdbRx,
    /// Switch domain, TX side only.
    FdbTx,
    /// Switch domain with one resource serving both directions.
    FdbUnified,
}

impl TableType {
    /// Returns true for any switch (FDB) domain.
    pub fn is_fdb_any(&self) -> bool {
        matches!(
            self,
            TableType::Fdb | TableType::FdbRx | TableType::FdbTx | TableType::FdbUnified
        )
    }

    /// Returns true when the domain keeps a separate mirror resource.
    pub fn fdb_no_unified(&self) -> bool {
        matches!(self, TableType::Fdb | TableType::FdbRx | TableType::FdbTx)
    }

    /// Firmware flow table type used for the primary or the mirror resource.
    pub fn fw_ft_type(&self, is_mirror: bool) -> FwFtType {
        match self {
            TableType::NicRx => FwFtType::NicRx,
            TableType::NicTx => FwFtType::NicTx,
            _ if is_mirror => FwFtType::FdbTx,
            _ => FwFtType::FdbRx,
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableType::NicRx => "NIC_RX",
            TableType::NicTx => "NIC_TX",
            TableType::Fdb => "FDB",
            TableType::FdbRx => "FDB_RX",
            TableType::FdbTx => "FDB_TX",
            TableType::FdbUnified => "FDB_UNIFIED",
        };
        write!(f, "{}", s)
    }
}

/// Firmware flow table type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FwFtType {
    NicRx,
    NicTx,
    FdbRx,
    FdbTx,
}
