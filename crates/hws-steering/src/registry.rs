//! Tables and matchers owned by a steering context.
//!
//! Lookups never create entries: a missing table or matcher is an error the
//! caller has to handle.

use std::collections::HashMap;

use hws_devx::{MatcherId, TableId};

use crate::error::{HwsError, HwsResult};
use crate::matcher::{Matcher, SteeringStats};
use crate::table::Table;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    tables: HashMap<TableId, Table>,
    matchers: HashMap<MatcherId, Matcher>,
    last_table: u32,
    last_matcher: u64,
    pub stats: SteeringStats,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_table_id(&mut self) -> TableId {
        self.last_table += 1;
        TableId(self.last_table)
    }

    pub fn next_matcher_id(&mut self) -> MatcherId {
        self.last_matcher += 1;
        MatcherId(self.last_matcher)
    }

    pub fn get_table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn get_matcher(&self, id: MatcherId) -> Option<&Matcher> {
        self.matchers.get(&id)
    }

    pub fn table(&self, id: TableId) -> HwsResult<&Table> {
        self.tables
            .get(&id)
            .ok_or_else(|| HwsError::not_found(id.to_string()))
    }

    pub fn table_mut(&mut self, id: TableId) -> HwsResult<&mut Table> {
        self.tables
            .get_mut(&id)
            .ok_or_else(|| HwsError::not_found(id.to_string()))
    }

    pub fn matcher(&self, id: MatcherId) -> HwsResult<&Matcher> {
        self.matchers
            .get(&id)
            .ok_or_else(|| HwsError::not_found(id.to_string()))
    }

    pub fn matcher_mut(&mut self, id: MatcherId) -> HwsResult<&mut Matcher> {
        self.matchers
            .get_mut(&id)
            .ok_or_else(|| HwsError::not_found(id.to_string()))
    }

    pub fn contains_matcher(&self, id: MatcherId) -> bool {
        self.matchers.contains_key(&id)
    }

    pub fn insert_table(&mut self, table: Table) {
        self.tables.insert(table.id, table);
    }

    pub fn remove_table(&mut self, id: TableId) -> Option<Table> {
        self.tables.remove(&id)
    }

    pub fn insert_matcher(&mut self, matcher: Matcher) {
        self.matchers.insert(matcher.id, matcher);
    }

    pub fn remove_matcher(&mut self, id: MatcherId) -> Option<Matcher> {
        self.matchers.remove(&id)
    }

    pub fn num_matchers(&self) -> usize {
        self.matchers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_ids_are_unique() {
        let mut reg = Registry::new();
        let a = reg.next_matcher_id();
        let b = reg.next_matcher_id();
        assert_ne!(a, b);
        assert_eq!(reg.next_table_id(), TableId(1));
    }

    #[test]
    fn test_missing_entries() {
        let mut reg = Registry::new();
        assert_eq!(reg.table(TableId(4)).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(reg.matcher_mut(MatcherId(9)).is_err());
        assert!(reg.get_matcher(MatcherId(9)).is_none());
        assert!(!reg.contains_matcher(MatcherId(9)));
        assert_eq!(reg.num_matchers(), 0);
    }
}
