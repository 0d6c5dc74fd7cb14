//! Steering context: the public entry point.
//!
//! A [`Context`] owns the registry of tables and matchers of one device and
//! serialises every structural change behind a single control lock.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error};

use hws_devx::{
    ActionTemplate, DeviceCaps, DevxCmd, FlowTableOps, MatchTemplate, MatcherId, RuleAttr,
    RuleHandle, RuleMover, TableId, TemplateCompiler,
};

use crate::config::SteeringConfig;
use crate::error::{HwsError, HwsResult};
use crate::matcher::{
    lifecycle, resize, MatcherAttr, MatcherInfo, ResizeRecordInfo, SteeringStats,
};
use crate::registry::Registry;
use crate::table::{self, TableAttr, TableInfo};

/// Collaborators a context drives.
#[derive(Clone)]
pub struct Backend {
    pub cmd: Arc<dyn DevxCmd>,
    pub ft: Arc<dyn FlowTableOps>,
    pub templates: Arc<dyn TemplateCompiler>,
    pub rules: Arc<dyn RuleMover>,
}

impl Backend {
    /// Uses one object for every collaborator.
    pub fn from_device<D>(device: Arc<D>) -> Self
    where
        D: DevxCmd + FlowTableOps + TemplateCompiler + RuleMover + 'static,
    {
        Self {
            cmd: device.clone(),
            ft: device.clone(),
            templates: device.clone(),
            rules: device,
        }
    }
}

/// Immutable environment shared by all operations of a context.
pub(crate) struct Env {
    pub backend: Backend,
    pub caps: DeviceCaps,
    pub config: SteeringConfig,
}

impl Env {
    pub fn cmd(&self) -> &dyn DevxCmd {
        self.backend.cmd.as_ref()
    }

    pub fn ft(&self) -> &dyn FlowTableOps {
        self.backend.ft.as_ref()
    }

    pub fn templates(&self) -> &dyn TemplateCompiler {
        self.backend.templates.as_ref()
    }

    pub fn rules(&self) -> &dyn RuleMover {
        self.backend.rules.as_ref()
    }
}

/// Hardware steering context of one device.
pub struct Context {
    env: Env,
    registry: Mutex<Registry>,
}

impl Context {
    pub fn new(backend: Backend, caps: DeviceCaps, config: SteeringConfig) -> Self {
        debug!(
            "HwsContext: Created (shared {}, depth max {})",
            config.shared, caps.rtc_log_depth_max
        );
        Self {
            env: Env {
                backend,
                caps,
                config,
            },
            registry: Mutex::new(Registry::new()),
        }
    }

    pub fn caps(&self) -> &DeviceCaps {
        &self.env.caps
    }

    pub fn config(&self) -> &SteeringConfig {
        &self.env.config
    }

    fn lock(&self) -> HwsResult<MutexGuard<'_, Registry>> {
        self.registry.lock().map_err(|_| {
            error!("HwsContext: Control lock poisoned");
            HwsError::internal("control lock poisoned")
        })
    }

    pub fn create_table(&self, attr: &TableAttr) -> HwsResult<TableId> {
        let mut reg = self.lock()?;
        table::create_table(&self.env, &mut reg, attr)
    }

    /// Fails while the table has matchers or other tables miss into it.
    pub fn destroy_table(&self, id: TableId) -> HwsResult<()> {
        let mut reg = self.lock()?;
        table::destroy_table(&self.env, &mut reg, id)
    }

    /// Sets the table traffic of `src` continues to when nothing matched.
    pub fn set_table_miss(&self, src: TableId, dst: Option<TableId>) -> HwsResult<()> {
        let mut reg = self.lock()?;
        table::set_table_miss(&self.env, &mut reg, src, dst)
    }

    /// Creates a matcher and splices it into its table by priority.
    pub fn create_matcher(
        &self,
        tbl: TableId,
        mt: &[MatchTemplate],
        at: &[ActionTemplate],
        attr: &MatcherAttr,
    ) -> HwsResult<MatcherId> {
        let mut reg = self.lock()?;
        lifecycle::create_matcher(&self.env, &mut reg, tbl, mt, at, attr)
    }

    /// Destroys a matcher, its collision matcher and every resource it owns.
    ///
    /// A [`HwsError::FatalSplice`] means the table's chain could not be
    /// repaired; the matcher is gone regardless.
    pub fn destroy_matcher(&self, id: MatcherId) -> HwsResult<()> {
        let mut reg = self.lock()?;
        lifecycle::destroy_matcher(&self.env, &mut reg, id)
    }

    pub fn attach_action_template(&self, id: MatcherId, at: &ActionTemplate) -> HwsResult<()> {
        let mut reg = self.lock()?;
        lifecycle::attach_action_template(&self.env, &mut reg, id, at)
    }

    /// Pairs `src` with a larger `dst` so rules can migrate.
    pub fn pair_for_resize(&self, src: MatcherId, dst: MatcherId) -> HwsResult<()> {
        let mut reg = self.lock()?;
        resize::pair_for_resize(&mut reg, src, dst)
    }

    /// Moves one rule of `src` to its resize destination.
    ///
    /// The control lock is held only while the pairing is read.
    pub fn move_rule_for_resize(
        &self,
        src: MatcherId,
        rule: &RuleHandle,
        attr: &RuleAttr,
    ) -> HwsResult<()> {
        let dst = {
            let reg = self.lock()?;
            resize::rule_move_target(&reg, src, rule)?
        };

        self.env.rules().move_rule(rule, dst, attr).map_err(|e| {
            error!("HwsResize: Failed to move rule {} to {}: {}", rule.id, dst, e);
            HwsError::Device {
                operation: format!("move of rule {}", rule.id),
                source: e,
            }
        })
    }

    pub fn matcher_info(&self, id: MatcherId) -> HwsResult<MatcherInfo> {
        Ok(self.lock()?.matcher(id)?.info())
    }

    pub fn table_info(&self, id: TableId) -> HwsResult<TableInfo> {
        Ok(self.lock()?.table(id)?.info())
    }

    /// Non-isolated matchers of a table in lookup order.
    pub fn table_chain(&self, id: TableId) -> HwsResult<Vec<MatcherId>> {
        Ok(self.lock()?.table(id)?.chain.clone())
    }

    pub fn isolated_matchers(&self, id: TableId) -> HwsResult<Vec<MatcherId>> {
        Ok(self.lock()?.table(id)?.isolated.clone())
    }

    pub fn is_updatable(&self, id: MatcherId) -> HwsResult<bool> {
        let reg = self.lock()?;
        lifecycle::is_updatable(&reg, id)
    }

    pub fn is_dependent(&self, id: MatcherId) -> HwsResult<bool> {
        let reg = self.lock()?;
        lifecycle::is_dependent(&reg, id)
    }

    /// Action resources queued on a resize destination.
    pub fn resize_records(&self, id: MatcherId) -> HwsResult<Vec<ResizeRecordInfo>> {
        Ok(self.lock()?.matcher(id)?.resize_records())
    }

    pub fn stats(&self) -> HwsResult<SteeringStats> {
        Ok(self.lock()?.stats.clone())
    }

    /// Registered matchers, collision matchers included.
    pub fn num_matchers(&self) -> HwsResult<usize> {
        Ok(self.lock()?.num_matchers())
    }
}
