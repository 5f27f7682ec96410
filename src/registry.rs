// Copyright 2025 Cornell University
// released under MIT License

use crate::errors::{Result, TraceError};
use crate::ir::{AutomatonId, AutomatonRecord, RecordId, VarToken};
use cranelift_entity::PrimaryMap;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::ops::Index;

/// Maps automaton ids to the records they currently denote.
///
/// Records are never dropped: reassigning an id creates a new record with the next
/// occurrence number and only moves the id's "current" pointer. Earlier operations keep
/// referring to the record that was current when they were parsed.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: PrimaryMap<RecordId, AutomatonRecord>,
    current: FxHashMap<AutomatonId, RecordId>,
    occurrences: FxHashMap<AutomatonId, u32>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new record for `id` and makes it the current one.
    pub fn assign(
        &mut self,
        id: AutomatonId,
        name: String,
        size: usize,
        free_vars: BTreeSet<VarToken>,
        is_initial: bool,
    ) -> RecordId {
        let occurrence = self.occurrences.entry(id.clone()).or_insert(0);
        let record = AutomatonRecord {
            id: id.clone(),
            occurrence: *occurrence,
            name,
            size,
            free_vars,
            is_initial,
        };
        *occurrence += 1;
        let rid = self.records.push(record);
        self.current.insert(id, rid);
        rid
    }

    /// Record currently denoted by `id`.
    pub fn lookup(&self, id: &AutomatonId) -> Result<RecordId> {
        self.current
            .get(id)
            .copied()
            .ok_or_else(|| TraceError::UnknownAutomatonId(id.clone()))
    }

    pub fn get(&self, id: &AutomatonId) -> Result<&AutomatonRecord> {
        let rid = self.lookup(id)?;
        Ok(&self.records[rid])
    }

    /// Copies the record behind `from` onto `new_id`. The copy owns its own variable set
    /// and is never an initial automaton.
    pub fn alias(&mut self, new_id: AutomatonId, from: &AutomatonId, size: usize) -> Result<RecordId> {
        let source = self.get(from)?;
        let name = source.name.clone();
        let free_vars = source.free_vars.clone();
        Ok(self.assign(new_id, name, size, free_vars, false))
    }

    /// Applies `renames` to the record behind `id`, last listed rename first.
    ///
    /// The display name gets a literal substitution for every rename. The variable set only
    /// changes when it contains the old token, so a rename of a variable that is no longer
    /// free (e.g. projected away) leaves the set untouched.
    pub fn rename_variables(
        &mut self,
        id: &AutomatonId,
        renames: &[(VarToken, VarToken)],
    ) -> Result<RecordId> {
        let rid = self.lookup(id)?;
        let record = &mut self.records[rid];
        for (old, new) in renames.iter().rev() {
            record.name = record.name.replace(old.as_str(), new);
            if record.free_vars.remove(old) {
                record.free_vars.insert(new.clone());
            }
        }
        Ok(rid)
    }

    pub fn record(&self, rid: RecordId) -> &AutomatonRecord {
        &self.records[rid]
    }

    /// All records in creation order.
    pub fn records(&self) -> impl Iterator<Item = (RecordId, &AutomatonRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Index<RecordId> for Registry {
    type Output = AutomatonRecord;

    fn index(&self, index: RecordId) -> &Self::Output {
        &self.records[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(tokens: &[&str]) -> BTreeSet<VarToken> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn lookup_returns_most_recent_assignment() {
        let mut reg = Registry::new();
        let id = AutomatonId::new("0x10");
        let first = reg.assign(id.clone(), "True".to_string(), 1, vars(&[]), true);
        let second = reg.assign(id.clone(), "False".to_string(), 2, vars(&[]), true);

        assert_ne!(first, second);
        assert_eq!(reg.lookup(&id), Ok(second));
        assert_eq!(reg.get(&id).unwrap().name, "False");
        assert_eq!(reg[first].occurrence, 0);
        assert_eq!(reg[second].occurrence, 1);
        assert_eq!(reg[first].name, "True");
    }

    #[test]
    fn missing_id_is_reported() {
        let reg = Registry::new();
        let id = AutomatonId::new("0xdead");
        assert_eq!(reg.lookup(&id), Err(TraceError::UnknownAutomatonId(id)));
    }

    #[test]
    fn renaming_a_copy_leaves_the_source_alone() {
        let mut reg = Registry::new();
        let src = AutomatonId::new("0x1");
        let dst = AutomatonId::new("0x2");
        let src_rid = reg.assign(src.clone(), "In(#1,#2)".to_string(), 4, vars(&["#1", "#2"]), true);
        let dst_rid = reg.alias(dst.clone(), &src, 4).unwrap();
        assert!(!reg[dst_rid].is_initial);

        reg.rename_variables(&dst, &[("#1".to_string(), "#7".to_string())])
            .unwrap();

        assert_eq!(reg[src_rid].free_vars, vars(&["#1", "#2"]));
        assert_eq!(reg[src_rid].name, "In(#1,#2)");
        assert_eq!(reg[dst_rid].free_vars, vars(&["#7", "#2"]));
        assert_eq!(reg[dst_rid].name, "In(#7,#2)");
    }

    #[test]
    fn renames_apply_last_listed_first() {
        let mut reg = Registry::new();
        let id = AutomatonId::new("0x1");
        let rid = reg.assign(id.clone(), "Sub2(#1,#2)".to_string(), 3, vars(&["#1", "#2"]), true);

        // listed: #1->#2, then #2->#3; the later one must not see the earlier result
        reg.rename_variables(
            &id,
            &[
                ("#1".to_string(), "#2".to_string()),
                ("#2".to_string(), "#3".to_string()),
            ],
        )
        .unwrap();

        assert_eq!(reg[rid].name, "Sub2(#2,#3)");
        assert_eq!(reg[rid].free_vars, vars(&["#2", "#3"]));
    }

    #[test]
    fn rename_of_bound_variable_only_touches_name() {
        let mut reg = Registry::new();
        let id = AutomatonId::new("0x1");
        let rid = reg.assign(id.clone(), "proj #4(Eq1(#4,#1))".to_string(), 3, vars(&["#1"]), false);

        reg.rename_variables(&id, &[("#4".to_string(), "#9".to_string())])
            .unwrap();

        assert_eq!(reg[rid].name, "proj #9(Eq1(#9,#1))");
        assert_eq!(reg[rid].free_vars, vars(&["#1"]));
    }
}
