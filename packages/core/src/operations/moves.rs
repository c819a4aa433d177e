//! Structural Mutation Planning
//!
//! The five relocation algorithms for nested-set forests, expressed as pure
//! functions from node/target snapshots to [`MovePlan`]s. A plan bundles the
//! [`MutationScript`] the store must apply atomically with the
//! [`NodePatch`] describing how the moved node's own placement fields change.
//!
//! Planning never touches the store: every validation error is raised here,
//! before a single bulk update exists, so a rejected move is guaranteed to
//! leave the forest untouched.
//!
//! # The five algorithms
//!
//! 1. **Promote-to-root** ([`promote_to_root`]) - detach a subtree into a
//!    brand new tree.
//! 2. **Root-sibling insertion** ([`sibling_of_root`]) - reposition a whole
//!    tree among the other root trees by relabeling tree-id blocks. Root
//!    nodes of different trees are not linked by `lft`/`rgt` contiguity, so
//!    this path mutates tree ids, not intervals.
//! 3. **Cross-tree relocation of a root** ([`move_root_to_tree`]) - a whole
//!    tree becomes a subtree of another tree.
//! 4. **Cross-tree relocation of a child** ([`move_child_to_new_tree`]) - a
//!    subtree leaves its tree for another one.
//! 5. **Intra-tree relocation** ([`move_within_tree`]) - a subtree shifts to
//!    a new position inside its own tree; everything between the old and new
//!    position moves by exactly the subtree's width in the other direction.
//!
//! Insertion ([`insert_under`], [`insert_as_root`]) and subtree deletion
//! ([`delete_subtree`]) reuse the same gap-management primitive.

use crate::db::script::{MutationScript, Statement, TreeId};
use crate::models::Node;
use crate::operations::error::TreeError;
use crate::operations::position::Position;

/// New placement for the node a plan moves or inserts.
///
/// Applied to the caller's in-memory copy once the script has committed, so
/// the copy matches post-mutation store state without a re-read.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePatch {
    pub lft: i64,
    pub rgt: i64,
    pub level: i64,
    pub tree_id: TreeId,
    pub parent_id: Option<String>,
}

impl NodePatch {
    /// Write this patch into `node`, resolving an allocated tree id from the
    /// script outcome. The node is untouched if resolution fails.
    pub fn apply(self, node: &mut Node, allocated_tree_id: Option<i64>) -> Result<(), TreeError> {
        let tree_id = match self.tree_id {
            TreeId::Existing(tree_id) => tree_id,
            TreeId::Allocated => allocated_tree_id.ok_or_else(|| {
                TreeError::internal("script outcome is missing the allocated tree id")
            })?,
        };
        node.lft = self.lft;
        node.rgt = self.rgt;
        node.level = self.level;
        node.parent_id = self.parent_id;
        node.tree_id = tree_id;
        Ok(())
    }
}

/// A mutation script plus the in-memory update it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct MovePlan {
    pub script: MutationScript,
    pub patch: NodePatch,
}

/// Geometry shared by the two cross-tree relocations: where to open space in
/// the target tree, how the subtree's level changes, by how much its edges
/// shift, and who the new parent is.
///
/// Returns `(space_target, level_change, left_right_change, parent_id)`.
/// For sibling positions the new parent is the target's parent, which is
/// `None` when the target is a root; the callers reject that case (the
/// dispatcher routes root-sibling moves elsewhere).
pub fn inter_tree_move_values(
    node: &Node,
    target: &Node,
    position: Position,
) -> (i64, i64, i64, Option<String>) {
    let (space_target, level_change, parent_id) = match position {
        Position::LastChild => (
            target.rgt - 1,
            node.level - target.level - 1,
            Some(target.id.clone()),
        ),
        Position::FirstChild => (
            target.lft,
            node.level - target.level - 1,
            Some(target.id.clone()),
        ),
        Position::Left => (
            target.lft - 1,
            node.level - target.level,
            target.parent_id.clone(),
        ),
        Position::Right => (
            target.rgt,
            node.level - target.level,
            target.parent_id.clone(),
        ),
    };
    let left_right_change = node.lft - space_target - 1;
    (space_target, level_change, left_right_change, parent_id)
}

/// Detach `node`'s subtree from its tree, making it the root of a new one.
///
/// `new_tree_id` is normally [`TreeId::Allocated`]; root-sibling insertion
/// passes the tree-id slot it has just vacated instead.
pub fn promote_to_root(node: &Node, new_tree_id: TreeId) -> MovePlan {
    let left_right_change = node.lft - 1;

    let script = MutationScript::new(vec![Statement::TransplantSubtree {
        tree_id: node.tree_id,
        lft: node.lft,
        rgt: node.rgt,
        level_change: node.level,
        left_right_change,
        new_tree_id,
        node_id: node.id.clone(),
        new_parent_id: None,
    }]);

    MovePlan {
        script,
        patch: NodePatch {
            lft: node.lft - left_right_change,
            rgt: node.rgt - left_right_change,
            level: 0,
            tree_id: new_tree_id,
            parent_id: None,
        },
    }
}

/// Reposition `node` as a tree immediately left or right of `target`, which
/// must be a root.
///
/// Opens a whole tree-id slot by incrementing every tree above the insertion
/// point, then either promotes a child node into the vacated slot or, for a
/// node that is already a root, relabels its tree. If the slot shift moved
/// the node's own tree, the follow-up statements address the shifted id.
pub fn sibling_of_root(
    node: &Node,
    target: &Node,
    position: Position,
) -> Result<MovePlan, TreeError> {
    if node.id == target.id {
        return Err(TreeError::invalid_move(
            "A node may not be made a sibling of itself.",
        ));
    }

    let (space_target, new_tree_id) = match position {
        Position::Left => (target.tree_id - 1, target.tree_id),
        Position::Right => (target.tree_id, target.tree_id + 1),
        other => return Err(TreeError::invalid_position(other.as_str())),
    };

    // The slot shift below also moves the node's own tree when it sits above
    // the insertion point; later statements must use the shifted id.
    let node_tree_id = if node.tree_id > space_target {
        node.tree_id + 1
    } else {
        node.tree_id
    };

    let mut statements = vec![Statement::ShiftTreeIds {
        above: space_target,
    }];

    if node.is_child() {
        let mut shifted = node.clone();
        shifted.tree_id = node_tree_id;
        let promotion = promote_to_root(&shifted, TreeId::Existing(new_tree_id));
        statements.extend(promotion.script.statements);
        Ok(MovePlan {
            script: MutationScript::new(statements),
            patch: promotion.patch,
        })
    } else {
        // Already a root: relative structure is unchanged, only the tree id
        // moves.
        statements.push(Statement::RelabelTree {
            tree_id: node_tree_id,
            new_tree_id: TreeId::Existing(new_tree_id),
        });
        Ok(MovePlan {
            script: MutationScript::new(statements),
            patch: NodePatch {
                lft: node.lft,
                rgt: node.rgt,
                level: node.level,
                tree_id: TreeId::Existing(new_tree_id),
                parent_id: None,
            },
        })
    }
}

/// Move `root`'s entire tree to become a subtree of `target`'s tree.
///
/// The whole tree relocates, so there is no source gap to close; the target
/// tree still needs space opened first.
pub fn move_root_to_tree(
    root: &Node,
    target: &Node,
    position: Position,
) -> Result<MovePlan, TreeError> {
    if root.id == target.id {
        return Err(TreeError::invalid_move(
            "A node may not be made a child of itself.",
        ));
    }
    if root.tree_id == target.tree_id {
        return Err(TreeError::invalid_move(
            "A node may not be made a child of any of its descendants.",
        ));
    }

    let (space_target, level_change, left_right_change, parent_id) =
        inter_tree_move_values(root, target, position);
    let parent_id = parent_id
        .ok_or_else(|| TreeError::internal("sibling move requires a target with a parent"))?;
    let width = root.width();

    let script = MutationScript::new(vec![
        Statement::ShiftInterval {
            tree_id: target.tree_id,
            after: space_target,
            delta: width,
        },
        Statement::GraftRootTree {
            tree_id: root.tree_id,
            lft: root.lft,
            rgt: root.rgt,
            level_change,
            left_right_change,
            new_tree_id: target.tree_id,
            node_id: root.id.clone(),
            new_parent_id: parent_id.clone(),
        },
    ]);

    Ok(MovePlan {
        script,
        patch: NodePatch {
            lft: root.lft - left_right_change,
            rgt: root.rgt - left_right_change,
            level: root.level - level_change,
            tree_id: TreeId::Existing(target.tree_id),
            parent_id: Some(parent_id),
        },
    })
}

/// Move a child `node`'s subtree out of its tree into `target`'s tree.
///
/// Space is opened in the destination, then a single transplant statement
/// rewrites the subtree's rows and closes the vacated gap in the source.
pub fn move_child_to_new_tree(
    node: &Node,
    target: &Node,
    position: Position,
) -> Result<MovePlan, TreeError> {
    let (space_target, level_change, left_right_change, parent_id) =
        inter_tree_move_values(node, target, position);
    let parent_id = parent_id
        .ok_or_else(|| TreeError::internal("sibling move requires a target with a parent"))?;
    let width = node.width();

    let script = MutationScript::new(vec![
        Statement::ShiftInterval {
            tree_id: target.tree_id,
            after: space_target,
            delta: width,
        },
        Statement::TransplantSubtree {
            tree_id: node.tree_id,
            lft: node.lft,
            rgt: node.rgt,
            level_change,
            left_right_change,
            new_tree_id: TreeId::Existing(target.tree_id),
            node_id: node.id.clone(),
            new_parent_id: Some(parent_id.clone()),
        },
    ]);

    Ok(MovePlan {
        script,
        patch: NodePatch {
            lft: node.lft - left_right_change,
            rgt: node.rgt - left_right_change,
            level: node.level - level_change,
            tree_id: TreeId::Existing(target.tree_id),
            parent_id: Some(parent_id),
        },
    })
}

/// Move a child `node`'s subtree to a new position inside its own tree.
///
/// The new interval is chosen from the target's near or far edge depending
/// on whether the target currently sits before or after the node, so the old
/// and new intervals never overlap mid-flight. Rows inside the moved subtree
/// shift by `new_lft - lft`; the rest of the affected band shifts by the
/// subtree's width in the opposite direction.
pub fn move_within_tree(
    node: &Node,
    target: &Node,
    position: Position,
) -> Result<MovePlan, TreeError> {
    let lft = node.lft;
    let rgt = node.rgt;
    let width = rgt - lft + 1;

    let (new_lft, new_rgt, level_change, parent_id) = match position {
        Position::LastChild | Position::FirstChild => {
            if node.id == target.id {
                return Err(TreeError::invalid_move(
                    "A node may not be made a child of itself.",
                ));
            }
            if lft < target.lft && target.lft < rgt {
                return Err(TreeError::invalid_move(
                    "A node may not be made a child of any of its descendants.",
                ));
            }
            let (new_lft, new_rgt) = if position == Position::LastChild {
                if target.rgt > rgt {
                    (target.rgt - width, target.rgt - 1)
                } else {
                    (target.rgt, target.rgt + width - 1)
                }
            } else if target.lft > lft {
                (target.lft - width + 1, target.lft)
            } else {
                (target.lft + 1, target.lft + width)
            };
            (
                new_lft,
                new_rgt,
                node.level - target.level - 1,
                target.id.clone(),
            )
        }
        Position::Left | Position::Right => {
            if node.id == target.id {
                return Err(TreeError::invalid_move(
                    "A node may not be made a sibling of itself.",
                ));
            }
            if lft < target.lft && target.lft < rgt {
                return Err(TreeError::invalid_move(
                    "A node may not be made a sibling of any of its descendants.",
                ));
            }
            let (new_lft, new_rgt) = if position == Position::Left {
                if target.lft > lft {
                    (target.lft - width, target.lft - 1)
                } else {
                    (target.lft, target.lft + width - 1)
                }
            } else if target.rgt > rgt {
                (target.rgt - width + 1, target.rgt)
            } else {
                (target.rgt + 1, target.rgt + width)
            };
            let parent_id = target.parent_id.clone().ok_or_else(|| {
                TreeError::internal("sibling move requires a target with a parent")
            })?;
            (new_lft, new_rgt, node.level - target.level, parent_id)
        }
    };

    let band_lower = lft.min(new_lft);
    let band_upper = rgt.max(new_rgt);
    let left_right_change = new_lft - lft;
    // The band between the old and new position moves against the subtree.
    let gap = if left_right_change > 0 { -width } else { width };

    let script = MutationScript::new(vec![Statement::MoveWithinTree {
        tree_id: node.tree_id,
        lft,
        rgt,
        level_change,
        left_right_change,
        band_lower,
        band_upper,
        gap,
        node_id: node.id.clone(),
        new_parent_id: parent_id.clone(),
    }]);

    Ok(MovePlan {
        script,
        patch: NodePatch {
            lft: new_lft,
            rgt: new_rgt,
            level: node.level - level_change,
            tree_id: TreeId::Existing(node.tree_id),
            parent_id: Some(parent_id),
        },
    })
}

/// Plan the insertion of `node` as the last child of `parent`.
///
/// Opens a two-wide gap just inside the parent's right edge and drops the
/// new leaf into it.
pub fn insert_under(parent: &Node, node: &Node) -> MovePlan {
    let space_after = parent.rgt - 1;

    let mut placed = node.clone();
    placed.parent_id = Some(parent.id.clone());
    placed.tree_id = parent.tree_id;
    placed.lft = parent.rgt;
    placed.rgt = parent.rgt + 1;
    placed.level = parent.level + 1;

    let patch = NodePatch {
        lft: placed.lft,
        rgt: placed.rgt,
        level: placed.level,
        tree_id: TreeId::Existing(parent.tree_id),
        parent_id: Some(parent.id.clone()),
    };

    MovePlan {
        script: MutationScript::new(vec![
            Statement::ShiftInterval {
                tree_id: parent.tree_id,
                after: space_after,
                delta: 2,
            },
            Statement::InsertLeaf {
                node: placed,
                tree_id: TreeId::Existing(parent.tree_id),
            },
        ]),
        patch,
    }
}

/// Plan the insertion of `node` as the root of a brand new tree.
pub fn insert_as_root(node: &Node) -> MovePlan {
    let mut placed = node.clone();
    placed.parent_id = None;
    placed.lft = 1;
    placed.rgt = 2;
    placed.level = 0;

    MovePlan {
        script: MutationScript::new(vec![Statement::InsertLeaf {
            node: placed,
            tree_id: TreeId::Allocated,
        }]),
        patch: NodePatch {
            lft: 1,
            rgt: 2,
            level: 0,
            tree_id: TreeId::Allocated,
            parent_id: None,
        },
    }
}

/// Plan the removal of `node`'s entire subtree, closing the gap it leaves.
pub fn delete_subtree(node: &Node) -> MutationScript {
    MutationScript::new(vec![
        Statement::DeleteInterval {
            tree_id: node.tree_id,
            lft: node.lft,
            rgt: node.rgt,
        },
        Statement::ShiftInterval {
            tree_id: node.tree_id,
            after: node.rgt,
            delta: -node.width(),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, tree_id: i64, lft: i64, rgt: i64, level: i64, parent: Option<&str>) -> Node {
        let mut node =
            Node::new_with_id(id.to_string(), "text".to_string(), id.to_string(), json!({}));
        node.tree_id = tree_id;
        node.lft = lft;
        node.rgt = rgt;
        node.level = level;
        node.parent_id = parent.map(str::to_string);
        node
    }

    // Fixture: R(1,10,0) > [A(2,5,1) > C(3,4,2)], [B(6,9,1) > D(7,8,2)]
    fn fixture() -> (Node, Node, Node, Node, Node) {
        let r = node("R", 1, 1, 10, 0, None);
        let a = node("A", 1, 2, 5, 1, Some("R"));
        let c = node("C", 1, 3, 4, 2, Some("A"));
        let b = node("B", 1, 6, 9, 1, Some("R"));
        let d = node("D", 1, 7, 8, 2, Some("B"));
        (r, a, c, b, d)
    }

    // =====================================================================
    // inter_tree_move_values
    // =====================================================================

    #[test]
    fn test_inter_tree_values_child_positions() {
        let mover = node("m", 1, 4, 7, 2, Some("p"));
        let target = node("t", 2, 3, 8, 1, Some("q"));

        let (space, level_change, lrc, parent) =
            inter_tree_move_values(&mover, &target, Position::LastChild);
        assert_eq!(space, 7); // target.rgt - 1
        assert_eq!(level_change, 0); // 2 - 1 - 1
        assert_eq!(lrc, 4 - 7 - 1);
        assert_eq!(parent.as_deref(), Some("t"));

        let (space, level_change, lrc, parent) =
            inter_tree_move_values(&mover, &target, Position::FirstChild);
        assert_eq!(space, 3); // target.lft
        assert_eq!(level_change, 0);
        assert_eq!(lrc, 0);
        assert_eq!(parent.as_deref(), Some("t"));
    }

    #[test]
    fn test_inter_tree_values_sibling_positions() {
        let mover = node("m", 1, 4, 7, 2, Some("p"));
        let target = node("t", 2, 3, 8, 1, Some("q"));

        let (space, level_change, _, parent) =
            inter_tree_move_values(&mover, &target, Position::Left);
        assert_eq!(space, 2); // target.lft - 1
        assert_eq!(level_change, 1); // 2 - 1
        assert_eq!(parent.as_deref(), Some("q"));

        let (space, level_change, _, parent) =
            inter_tree_move_values(&mover, &target, Position::Right);
        assert_eq!(space, 8); // target.rgt
        assert_eq!(level_change, 1);
        assert_eq!(parent.as_deref(), Some("q"));
    }

    // =====================================================================
    // move_within_tree: the eight interval cases
    // =====================================================================

    #[test]
    fn test_within_tree_last_child_target_after() {
        let (_, a, _, b, _) = fixture();
        // Move A(2,5) to be last child of B(6,9): target.rgt > node.rgt
        let plan = move_within_tree(&a, &b, Position::LastChild).unwrap();
        assert_eq!(plan.patch.lft, 9 - 4); // target.rgt - width
        assert_eq!(plan.patch.rgt, 9 - 1);
        assert_eq!(plan.patch.level, 2);
        assert_eq!(plan.patch.parent_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_within_tree_last_child_target_before() {
        let (_, a, _, b, _) = fixture();
        // Move B(6,9) to be last child of A(2,5): target.rgt < node.rgt
        let plan = move_within_tree(&b, &a, Position::LastChild).unwrap();
        assert_eq!(plan.patch.lft, 5); // target.rgt
        assert_eq!(plan.patch.rgt, 5 + 4 - 1);
        assert_eq!(plan.patch.level, 2);
    }

    #[test]
    fn test_within_tree_first_child_target_after() {
        let (_, a, _, b, _) = fixture();
        // Move A(2,5) to be first child of B(6,9): target.lft > node.lft
        let plan = move_within_tree(&a, &b, Position::FirstChild).unwrap();
        assert_eq!(plan.patch.lft, 6 - 4 + 1);
        assert_eq!(plan.patch.rgt, 6);
    }

    #[test]
    fn test_within_tree_first_child_target_before() {
        let (_, a, _, b, _) = fixture();
        // Move B(6,9) to be first child of A(2,5): target.lft < node.lft
        let plan = move_within_tree(&b, &a, Position::FirstChild).unwrap();
        assert_eq!(plan.patch.lft, 3); // target.lft + 1
        assert_eq!(plan.patch.rgt, 2 + 4);
        assert_eq!(plan.patch.level, 2);
        assert_eq!(plan.patch.parent_id.as_deref(), Some("A"));

        // The single statement shifts the moved interval down by 3 and the
        // displaced band up by the width.
        match &plan.script.statements[..] {
            [Statement::MoveWithinTree {
                tree_id,
                lft,
                rgt,
                level_change,
                left_right_change,
                band_lower,
                band_upper,
                gap,
                node_id,
                new_parent_id,
            }] => {
                assert_eq!(*tree_id, 1);
                assert_eq!((*lft, *rgt), (6, 9));
                assert_eq!(*level_change, -1);
                assert_eq!(*left_right_change, -3);
                assert_eq!((*band_lower, *band_upper), (3, 9));
                assert_eq!(*gap, 4);
                assert_eq!(node_id, "B");
                assert_eq!(new_parent_id, "A");
            }
            other => panic!("unexpected script shape: {:?}", other),
        }
    }

    #[test]
    fn test_within_tree_left_sibling_both_directions() {
        let (_, a, _, b, _) = fixture();
        // B(6,9) left of A(2,5): target.lft < node.lft
        let plan = move_within_tree(&b, &a, Position::Left).unwrap();
        assert_eq!(plan.patch.lft, 2);
        assert_eq!(plan.patch.rgt, 2 + 4 - 1);
        assert_eq!(plan.patch.level, 1);
        assert_eq!(plan.patch.parent_id.as_deref(), Some("R"));

        // A(2,5) left of B(6,9): target.lft > node.lft
        let plan = move_within_tree(&a, &b, Position::Left).unwrap();
        assert_eq!(plan.patch.lft, 6 - 4);
        assert_eq!(plan.patch.rgt, 6 - 1);
    }

    #[test]
    fn test_within_tree_right_sibling_both_directions() {
        let (_, a, _, b, _) = fixture();
        // A(2,5) right of B(6,9): target.rgt > node.rgt
        let plan = move_within_tree(&a, &b, Position::Right).unwrap();
        assert_eq!(plan.patch.lft, 9 - 4 + 1);
        assert_eq!(plan.patch.rgt, 9);

        // B(6,9) right of A(2,5): target.rgt < node.rgt
        let plan = move_within_tree(&b, &a, Position::Right).unwrap();
        assert_eq!(plan.patch.lft, 5 + 1);
        assert_eq!(plan.patch.rgt, 5 + 4);
    }

    #[test]
    fn test_within_tree_rejects_self_move() {
        let (_, a, _, _, _) = fixture();
        let err = move_within_tree(&a, &a, Position::LastChild).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A node may not be made a child of itself."
        );

        let err = move_within_tree(&a, &a, Position::Left).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A node may not be made a sibling of itself."
        );
    }

    #[test]
    fn test_within_tree_rejects_descendant_target() {
        let (_, a, c, _, _) = fixture();
        let err = move_within_tree(&a, &c, Position::LastChild).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A node may not be made a child of any of its descendants."
        );

        let err = move_within_tree(&a, &c, Position::Right).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A node may not be made a sibling of any of its descendants."
        );
    }

    // =====================================================================
    // promote_to_root
    // =====================================================================

    #[test]
    fn test_promote_to_root_plan() {
        let (_, _, _, b, _) = fixture();
        let plan = promote_to_root(&b, TreeId::Allocated);

        assert_eq!(
            plan.script.statements,
            vec![Statement::TransplantSubtree {
                tree_id: 1,
                lft: 6,
                rgt: 9,
                level_change: 1,
                left_right_change: 5,
                new_tree_id: TreeId::Allocated,
                node_id: "B".to_string(),
                new_parent_id: None,
            }]
        );
        assert_eq!(plan.patch.lft, 1);
        assert_eq!(plan.patch.rgt, 4);
        assert_eq!(plan.patch.level, 0);
        assert_eq!(plan.patch.tree_id, TreeId::Allocated);
        assert_eq!(plan.patch.parent_id, None);
    }

    #[test]
    fn test_patch_apply_resolves_allocated_tree_id() {
        let (_, _, _, mut b, _) = fixture();
        let plan = promote_to_root(&b, TreeId::Allocated);

        plan.patch.clone().apply(&mut b, Some(7)).unwrap();
        assert_eq!(b.tree_id, 7);
        assert_eq!((b.lft, b.rgt, b.level), (1, 4, 0));
        assert!(b.parent_id.is_none());

        let err = plan.patch.apply(&mut b, None).unwrap_err();
        assert!(matches!(err, TreeError::Internal(_)));
    }

    // =====================================================================
    // sibling_of_root
    // =====================================================================

    #[test]
    fn test_root_sibling_left_of_lower_tree() {
        // Trees 1..=3; move root of tree 3 left of tree 1's root.
        let mover = node("x", 3, 1, 4, 0, None);
        let target = node("r1", 1, 1, 6, 0, None);

        let plan = sibling_of_root(&mover, &target, Position::Left).unwrap();
        // space_target = 0: every tree shifts up, including the mover's.
        assert_eq!(
            plan.script.statements,
            vec![
                Statement::ShiftTreeIds { above: 0 },
                Statement::RelabelTree {
                    tree_id: 4,
                    new_tree_id: TreeId::Existing(1),
                },
            ]
        );
        assert_eq!(plan.patch.tree_id, TreeId::Existing(1));
        assert_eq!((plan.patch.lft, plan.patch.rgt), (1, 4));
    }

    #[test]
    fn test_root_sibling_right_keeps_unshifted_source() {
        // Move root of tree 1 right of tree 2's root: the slot shift only
        // touches trees above 2, so the mover's id is unchanged.
        let mover = node("x", 1, 1, 4, 0, None);
        let target = node("r2", 2, 1, 6, 0, None);

        let plan = sibling_of_root(&mover, &target, Position::Right).unwrap();
        assert_eq!(
            plan.script.statements,
            vec![
                Statement::ShiftTreeIds { above: 2 },
                Statement::RelabelTree {
                    tree_id: 1,
                    new_tree_id: TreeId::Existing(3),
                },
            ]
        );
    }

    #[test]
    fn test_root_sibling_promotes_child_into_vacated_slot() {
        // A child of tree 2 becomes a tree to the left of tree 1's root.
        let mover = node("m", 2, 3, 6, 1, Some("r2"));
        let target = node("r1", 1, 1, 8, 0, None);

        let plan = sibling_of_root(&mover, &target, Position::Left).unwrap();
        match &plan.script.statements[..] {
            [Statement::ShiftTreeIds { above: 0 }, Statement::TransplantSubtree {
                tree_id,
                new_tree_id,
                new_parent_id,
                ..
            }] => {
                // The mover's tree was shifted from 2 to 3 first.
                assert_eq!(*tree_id, 3);
                assert_eq!(*new_tree_id, TreeId::Existing(1));
                assert_eq!(*new_parent_id, None);
            }
            other => panic!("unexpected script shape: {:?}", other),
        }
        assert_eq!((plan.patch.lft, plan.patch.rgt, plan.patch.level), (1, 4, 0));
    }

    #[test]
    fn test_root_sibling_rejects_self_move() {
        let target = node("r1", 1, 1, 6, 0, None);
        let err = sibling_of_root(&target, &target, Position::Left).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A node may not be made a sibling of itself."
        );
    }

    // =====================================================================
    // move_root_to_tree / move_child_to_new_tree
    // =====================================================================

    #[test]
    fn test_root_to_tree_plan() {
        let mover = node("x", 2, 1, 4, 0, None);
        let (r, ..) = fixture();

        let plan = move_root_to_tree(&mover, &r, Position::LastChild).unwrap();
        assert_eq!(
            plan.script.statements,
            vec![
                Statement::ShiftInterval {
                    tree_id: 1,
                    after: 9,
                    delta: 4,
                },
                Statement::GraftRootTree {
                    tree_id: 2,
                    lft: 1,
                    rgt: 4,
                    level_change: -1,
                    left_right_change: 1 - 9 - 1,
                    new_tree_id: 1,
                    node_id: "x".to_string(),
                    new_parent_id: "R".to_string(),
                },
            ]
        );
        // Lands just inside R's old right edge.
        assert_eq!((plan.patch.lft, plan.patch.rgt), (10, 13));
        assert_eq!(plan.patch.level, 1);
    }

    #[test]
    fn test_root_to_tree_rejects_own_tree() {
        let (r, a, ..) = fixture();

        let err = move_root_to_tree(&r, &a, Position::LastChild).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A node may not be made a child of any of its descendants."
        );

        let err = move_root_to_tree(&r, &r, Position::LastChild).unwrap_err();
        assert_eq!(err.to_string(), "A node may not be made a child of itself.");
    }

    #[test]
    fn test_child_to_new_tree_plan() {
        let (_, a, ..) = fixture();
        let target = node("t", 2, 2, 5, 1, Some("r2"));

        let plan = move_child_to_new_tree(&a, &target, Position::FirstChild).unwrap();
        assert_eq!(
            plan.script.statements,
            vec![
                Statement::ShiftInterval {
                    tree_id: 2,
                    after: 2,
                    delta: 4,
                },
                Statement::TransplantSubtree {
                    tree_id: 1,
                    lft: 2,
                    rgt: 5,
                    level_change: -1,
                    left_right_change: 2 - 2 - 1,
                    new_tree_id: TreeId::Existing(2),
                    node_id: "A".to_string(),
                    new_parent_id: Some("t".to_string()),
                },
            ]
        );
        assert_eq!((plan.patch.lft, plan.patch.rgt), (3, 6));
        assert_eq!(plan.patch.level, 2);
        assert_eq!(plan.patch.tree_id, TreeId::Existing(2));
    }

    // =====================================================================
    // insertion / deletion plans
    // =====================================================================

    #[test]
    fn test_insert_under_plan() {
        let (_, a, ..) = fixture();
        let fresh = node("n", 0, 0, 0, 0, None);

        let plan = insert_under(&a, &fresh);
        match &plan.script.statements[..] {
            [Statement::ShiftInterval {
                tree_id: 1,
                after: 4,
                delta: 2,
            }, Statement::InsertLeaf { node, tree_id }] => {
                assert_eq!((node.lft, node.rgt, node.level), (5, 6, 2));
                assert_eq!(node.parent_id.as_deref(), Some("A"));
                assert_eq!(*tree_id, TreeId::Existing(1));
            }
            other => panic!("unexpected script shape: {:?}", other),
        }
        assert_eq!((plan.patch.lft, plan.patch.rgt, plan.patch.level), (5, 6, 2));
    }

    #[test]
    fn test_insert_as_root_plan() {
        let fresh = node("n", 0, 0, 0, 0, None);
        let plan = insert_as_root(&fresh);

        assert!(plan.script.allocates_tree_id());
        assert_eq!((plan.patch.lft, plan.patch.rgt, plan.patch.level), (1, 2, 0));
        assert_eq!(plan.patch.tree_id, TreeId::Allocated);
    }

    #[test]
    fn test_delete_subtree_plan() {
        let (_, _, _, b, _) = fixture();
        let script = delete_subtree(&b);

        assert_eq!(
            script.statements,
            vec![
                Statement::DeleteInterval {
                    tree_id: 1,
                    lft: 6,
                    rgt: 9,
                },
                Statement::ShiftInterval {
                    tree_id: 1,
                    after: 9,
                    delta: -4,
                },
            ]
        );
    }
}
