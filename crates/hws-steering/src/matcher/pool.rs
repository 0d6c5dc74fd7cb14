//! Steering entry pools backing lookup resources.

use log::{debug, error};

use hws_devx::{RawObjectId, SteRangeCreateAttr, SteRangeOid, TableType};

use super::types::FlowSource;
use crate::context::Env;
use crate::error::{HwsError, HwsResult};

/// Which side of a switch-domain pool carries the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PoolOpt {
    /// Both sides full size.
    None,
    /// Only the original (RX) side is used.
    Orig,
    /// Only the mirror (TX) side is used.
    Mirror,
}

impl PoolOpt {
    pub fn for_matcher(flow_src: FlowSource, table_type: TableType) -> Self {
        match flow_src {
            // Vport traffic only hits the mirror side, wire traffic the original.
            FlowSource::Vport => PoolOpt::Mirror,
            FlowSource::Wire => PoolOpt::Orig,
            FlowSource::Any => match table_type {
                TableType::FdbRx => PoolOpt::Orig,
                TableType::FdbTx => PoolOpt::Mirror,
                _ => PoolOpt::None,
            },
        }
    }
}

/// Entry ranges for one matcher resource.
///
/// The whole pool is handed out as a single chunk at offset 0.
#[derive(Debug)]
pub(crate) struct StePool {
    ste: SteRangeOid,
    mirror: Option<SteRangeOid>,
    log_sz: u8,
}

impl StePool {
    pub fn create(env: &Env, table_type: TableType, log_sz: u8, opt: PoolOpt) -> HwsResult<Self> {
        let cmd = env.cmd();

        if !table_type.fdb_no_unified() {
            let ste = cmd
                .create_ste_range(SteRangeCreateAttr {
                    table_type: table_type.fw_ft_type(false),
                    log_size: log_sz,
                })
                .map_err(|e| {
                    error!("HwsPool: Failed to allocate STE range of log size {}: {}", log_sz, e);
                    HwsError::allocation("STE range", e)
                })?;
            debug!("HwsPool: Allocated {} log size {}", ste, log_sz);
            return Ok(Self {
                ste,
                mirror: None,
                log_sz,
            });
        }

        let orig_log = if opt == PoolOpt::Mirror { 0 } else { log_sz };
        let mirror_log = if opt == PoolOpt::Orig { 0 } else { log_sz };

        let ste = cmd
            .create_ste_range(SteRangeCreateAttr {
                table_type: table_type.fw_ft_type(false),
                log_size: orig_log,
            })
            .map_err(|e| {
                error!("HwsPool: Failed to allocate STE range of log size {}: {}", orig_log, e);
                HwsError::allocation("STE range", e)
            })?;

        let mirror = match cmd.create_ste_range(SteRangeCreateAttr {
            table_type: table_type.fw_ft_type(true),
            log_size: mirror_log,
        }) {
            Ok(mirror) => mirror,
            Err(e) => {
                error!("HwsPool: Failed to allocate mirror STE range of log size {}: {}", mirror_log, e);
                if let Err(e) = cmd.destroy_ste_range(ste) {
                    error!("HwsPool: Failed to release {}: {}", ste, e);
                }
                return Err(HwsError::allocation("mirror STE range", e));
            }
        };

        debug!(
            "HwsPool: Allocated {} ({}) and mirror {} ({})",
            ste, orig_log, mirror, mirror_log
        );
        Ok(Self {
            ste,
            mirror: Some(mirror),
            log_sz,
        })
    }

    /// Object number of the range backing the primary or mirror resource.
    pub fn base(&self, is_mirror: bool) -> RawObjectId {
        match (is_mirror, self.mirror) {
            (true, Some(mirror)) => mirror.as_raw(),
            _ => self.ste.as_raw(),
        }
    }

    pub fn log_sz(&self) -> u8 {
        self.log_sz
    }

    pub fn destroy(self, env: &Env) {
        let cmd = env.cmd();
        if let Some(mirror) = self.mirror {
            if let Err(e) = cmd.destroy_ste_range(mirror) {
                error!("HwsPool: Failed to release {}: {}", mirror, e);
            }
        }
        if let Err(e) = cmd.destroy_ste_range(self.ste) {
            error!("HwsPool: Failed to release {}: {}", self.ste, e);
        }
    }
}
