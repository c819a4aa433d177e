//! Mutation Script Model
//!
//! A structural mutation is planned as a `MutationScript`: an ordered list of
//! bulk statements over the `nodes` table, each a (predicate, piecewise
//! column-assignment) pair. The planning layer (`operations::moves`) builds
//! scripts as pure values; the store renders each statement to one SQL
//! template and applies the whole script inside a single transaction.
//!
//! Keeping the plan as data keeps the algorithms testable without a
//! database and keeps the store adapter thin.

use crate::models::Node;

/// Tree id referenced by a statement.
///
/// `Allocated` stands for a fresh id claimed inside the transaction that
/// applies the script (max aggregate + 1). At most one fresh id is resolved
/// per script; every `Allocated` reference within a script names the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeId {
    /// A tree id already present in the forest
    Existing(i64),
    /// A fresh id, resolved by the store when the script runs
    Allocated,
}

/// One bulk statement over the nodes table.
///
/// Variants map one-to-one onto fixed SQL templates in the store. All
/// interval arithmetic in a statement reads pre-update row state; a
/// statement never depends on another statement's in-flight writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Gap management: add `delta` to every `lft` and `rgt` strictly greater
    /// than `after` within `tree_id`. Positive `delta` opens room for an
    /// incoming subtree; negative `delta` reclaims a vacated gap.
    ShiftInterval { tree_id: i64, after: i64, delta: i64 },

    /// Inter-tree transplant: move every row with `lft` in `[lft, rgt]` of
    /// `tree_id` into `new_tree_id`, applying `level -= level_change` and
    /// shifting both edges down by `left_right_change`, while rows after the
    /// vacated interval close ranks by the subtree's width. The row matched
    /// by `node_id` gets `parent_id = new_parent_id` (`None` promotes it to
    /// a root).
    TransplantSubtree {
        tree_id: i64,
        lft: i64,
        rgt: i64,
        level_change: i64,
        left_right_change: i64,
        new_tree_id: TreeId,
        node_id: String,
        new_parent_id: Option<String>,
    },

    /// Move an entire root tree under a parent in another tree. Every row of
    /// `tree_id` shifts by the same deltas; there is no source gap to close
    /// because the whole tree leaves.
    GraftRootTree {
        tree_id: i64,
        lft: i64,
        rgt: i64,
        level_change: i64,
        left_right_change: i64,
        new_tree_id: i64,
        node_id: String,
        new_parent_id: String,
    },

    /// Intra-tree relocation: rows inside the moved interval `[lft, rgt]`
    /// shift by `left_right_change` and adjust `level`; the rest of the band
    /// `[band_lower, band_upper]` shifts by `gap` (the subtree width, with
    /// sign opposite to the move direction).
    MoveWithinTree {
        tree_id: i64,
        lft: i64,
        rgt: i64,
        level_change: i64,
        left_right_change: i64,
        band_lower: i64,
        band_upper: i64,
        gap: i64,
        node_id: String,
        new_parent_id: String,
    },

    /// Open a whole tree-id slot: every tree with id above `above` moves up
    /// by one.
    ShiftTreeIds { above: i64 },

    /// Relabel every row of one tree with a new tree id.
    RelabelTree { tree_id: i64, new_tree_id: TreeId },

    /// Insert a freshly placed row. The node carries its placement except
    /// for `tree_id`, which is taken from the statement so a new root can
    /// claim a fresh id inside the transaction.
    InsertLeaf { node: Node, tree_id: TreeId },

    /// Delete every row of `tree_id` whose `lft` falls in `[lft, rgt]`.
    DeleteInterval { tree_id: i64, lft: i64, rgt: i64 },
}

/// An ordered list of statements applied atomically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutationScript {
    pub statements: Vec<Statement>,
}

impl MutationScript {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Whether any statement references a fresh tree id.
    pub fn allocates_tree_id(&self) -> bool {
        self.statements.iter().any(|stmt| {
            matches!(
                stmt,
                Statement::TransplantSubtree {
                    new_tree_id: TreeId::Allocated,
                    ..
                } | Statement::RelabelTree {
                    new_tree_id: TreeId::Allocated,
                    ..
                } | Statement::InsertLeaf {
                    tree_id: TreeId::Allocated,
                    ..
                }
            )
        })
    }
}

/// What a script application reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Fresh tree id claimed for the script, if any statement asked for one
    pub allocated_tree_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_tree_id_detection() {
        let script = MutationScript::new(vec![Statement::ShiftInterval {
            tree_id: 1,
            after: 4,
            delta: 2,
        }]);
        assert!(!script.allocates_tree_id());

        let script = MutationScript::new(vec![
            Statement::ShiftTreeIds { above: 2 },
            Statement::RelabelTree {
                tree_id: 4,
                new_tree_id: TreeId::Allocated,
            },
        ]);
        assert!(script.allocates_tree_id());
    }
}
