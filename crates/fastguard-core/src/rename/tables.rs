//! Program-wide mangled-name tables.
//!
//! Properties (and exported top-level names) and file names are renamed
//! consistently across every file of a compilation, so their assignments live
//! in one table per category keyed by original name alone.

use crate::namegen::{NameGenerator, NameStrategy};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
pub struct MangledTable {
    /// Original -> mangled, assigned in this compilation.
    entries: BTreeMap<String, String>,
    /// Mangled -> original, from history.
    occupied: HashMap<String, String>,
    /// Mangled -> original, handed out during this pass.
    newly_occupied: HashMap<String, String>,
    /// Original -> mangled from the applied name cache.
    history: BTreeMap<String, String>,
    generator: NameGenerator,
    strategy: NameStrategy,
}

impl MangledTable {
    #[must_use]
    pub fn new(strategy: NameStrategy) -> Self {
        Self {
            entries: BTreeMap::new(),
            occupied: HashMap::new(),
            newly_occupied: HashMap::new(),
            history: BTreeMap::new(),
            generator: NameGenerator::new(strategy.clone()),
            strategy,
        }
    }

    /// Seed from a previous build's cache.
    pub fn seed_history(&mut self, history: BTreeMap<String, String>) {
        for (original, mangled) in &history {
            self.occupied
                .entry(mangled.clone())
                .or_insert_with(|| original.clone());
        }
        self.history = history;
    }

    #[must_use]
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    #[must_use]
    pub fn history(&self) -> &BTreeMap<String, String> {
        &self.history
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Whether `name` is already some other original's mangled name, in
    /// history or in this pass.
    #[must_use]
    pub fn is_taken_by_other(&self, name: &str, original: &str) -> bool {
        [&self.newly_occupied, &self.occupied]
            .iter()
            .any(|owners| owners.get(name).is_some_and(|o| o != original))
    }

    /// Mangled name for `original`: the existing assignment, else the
    /// historical one if still free, else the next free generated name.
    /// `blocked` rejects names that must not be produced.
    pub fn assign(&mut self, original: &str, blocked: &dyn Fn(&str) -> bool) -> String {
        if let Some(existing) = self.entries.get(original) {
            return existing.clone();
        }

        let from_history = self
            .history
            .get(original)
            .filter(|h| !self.is_taken_by_other(h, original) && !blocked(h))
            .cloned();

        let mangled = match from_history {
            Some(name) => name,
            None => loop {
                let candidate = self.generator.next_name();
                if !self.occupied.contains_key(&candidate)
                    && !self.newly_occupied.contains_key(&candidate)
                    && !blocked(&candidate)
                {
                    break candidate;
                }
            },
        };

        self.entries.insert(original.to_string(), mangled.clone());
        self.newly_occupied.insert(mangled.clone(), original.to_string());
        mangled
    }

    /// History entries for names not touched in this run, overlaid with this
    /// run's assignments.
    #[must_use]
    pub fn merged_for_save(&self) -> BTreeMap<String, String> {
        let mut out = self.history.clone();
        for (original, mangled) in &self.entries {
            out.insert(original.clone(), mangled.clone());
        }
        out
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.occupied.clear();
        self.newly_occupied.clear();
        self.history.clear();
        self.generator = NameGenerator::new(self.strategy.clone());
    }
}
