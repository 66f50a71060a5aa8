//! Symbol -> state registry.
//!
//! Fully populated before the first tick, so ticks never insert and no lock is
//! needed. Tasks work on clones; only completed tasks write their state back.

use std::collections::HashMap;
use surge_watch_core::MonitorConfig;
use surge_watch_signals::SymbolState;

/// Owns one [`SymbolState`] per configured symbol.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    order: Vec<String>,
    states: HashMap<String, SymbolState>,
}

impl SymbolRegistry {
    /// Creates empty state for every configured symbol. Duplicates are dropped.
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        let mut order = Vec::with_capacity(config.symbols.len());
        let mut states = HashMap::with_capacity(config.symbols.len());
        for symbol in &config.symbols {
            if states.contains_key(symbol) {
                continue;
            }
            states.insert(
                symbol.clone(),
                SymbolState::new(symbol.clone(), config.history_capacity, config.cooldown()),
            );
            order.push(symbol.clone());
        }
        Self { order, states }
    }

    /// Symbols in configuration order.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&SymbolState> {
        self.states.get(symbol)
    }

    /// Writes back a state produced by a completed task.
    ///
    /// Returns false for a symbol that was never registered.
    pub fn replace(&mut self, state: SymbolState) -> bool {
        match self.states.get_mut(state.symbol()) {
            Some(slot) => {
                *slot = state;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
