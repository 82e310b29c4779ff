//! Process-wide interning of lowered programs.
//!
//! Keyed by the expression IR: two expressions whose trees are equal run
//! one program, whatever template they came from. The cache is owned by
//! the template loader and shared by every thread loading templates.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use stirrup_ir::Node;

use crate::expression::Executable;
use crate::lower::lower;

pub struct ExpressionCache {
    programs: DashMap<Node, Arc<Executable>, FxBuildHasher>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        ExpressionCache {
            programs: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Number of distinct programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// The program for `node`, lowering it on first use.
    ///
    /// Concurrent callers with equal nodes all receive the same program.
    /// Lowering happens outside the map lock; if two threads race, the
    /// first insert wins and the loser's program is dropped.
    pub(crate) fn get_or_lower(&self, node: &Node) -> Result<Arc<Executable>, regex::Error> {
        let cached = self.programs.get(node).map(|entry| Arc::clone(entry.value()));
        if let Some(executable) = cached {
            tracing::trace!("expression cache hit");
            return Ok(executable);
        }
        let executable = Arc::new(Executable {
            program: lower(node)?,
        });
        let entry = self.programs.entry(node.clone()).or_insert(executable);
        Ok(Arc::clone(entry.value()))
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new()
    }
}
