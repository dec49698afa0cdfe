use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::warn;

use crate::model::record::TaskRecord;
use crate::model::task::{TaskId, TaskNode};

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Assemble flat backend records into a forest of root tasks.
///
/// Roots and every subtask list keep the order of the input. A record whose
/// parent reference is missing, points at itself, or would close a cycle is
/// promoted to a root (its `parent_id` is cleared) so every record stays
/// reachable from the returned roots. Duplicate ids keep the first record.
pub fn build_tree(records: Vec<TaskRecord>) -> Vec<TaskNode> {
    let mut nodes: IndexMap<TaskId, TaskNode> = IndexMap::with_capacity(records.len());
    for record in records {
        if nodes.contains_key(&record.id) {
            warn!(task = %record.id, "duplicate task id in backend response, keeping first");
            continue;
        }
        let node = TaskNode::from_record(record);
        nodes.insert(node.id.clone(), node);
    }

    let mut parents: IndexMap<TaskId, Option<TaskId>> = nodes
        .iter()
        .map(|(id, node)| {
            let parent = node
                .parent_id
                .as_ref()
                .filter(|p| *p != id && nodes.contains_key(*p))
                .cloned();
            if parent.is_none() && node.parent_id.is_some() {
                warn!(task = %id, parent = ?node.parent_id, "unresolved parent, treating as root");
            }
            (id.clone(), parent)
        })
        .collect();

    break_cycles(&mut parents);

    let mut children: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut roots = Vec::new();
    for (id, parent) in &parents {
        match parent {
            Some(p) => children.entry(p.clone()).or_default().push(id.clone()),
            None => roots.push(id.clone()),
        }
    }

    roots
        .iter()
        .filter_map(|id| assemble(id, None, &mut nodes, &children))
        .collect()
}

/// Demote the first member (in input order) of every parent cycle to a root.
fn break_cycles(parents: &mut IndexMap<TaskId, Option<TaskId>>) {
    for i in 0..parents.len() {
        let Some((start, _)) = parents.get_index(i) else {
            continue;
        };
        let start = start.clone();
        let mut seen = HashSet::new();
        let mut cursor = parents.get(&start).cloned().flatten();
        while let Some(id) = cursor {
            if id == start {
                warn!(task = %start, "parent cycle detected, treating as root");
                parents.insert(start.clone(), None);
                break;
            }
            if !seen.insert(id.clone()) {
                break;
            }
            cursor = parents.get(&id).cloned().flatten();
        }
    }
}

fn assemble(
    id: &TaskId,
    parent: Option<&TaskId>,
    nodes: &mut IndexMap<TaskId, TaskNode>,
    children: &HashMap<TaskId, Vec<TaskId>>,
) -> Option<TaskNode> {
    let mut node = nodes.swap_remove(id)?;
    node.parent_id = parent.cloned();
    if let Some(kids) = children.get(id) {
        node.subtasks = kids
            .iter()
            .filter_map(|kid| assemble(kid, Some(id), nodes, children))
            .collect();
    }
    Some(node)
}

// ---------------------------------------------------------------------------
// Flatten
// ---------------------------------------------------------------------------

/// Depth-first (pre-order) list of every node with its subtasks stripped.
/// Each `parent_id` reflects the node's position in the tree.
pub fn flatten(tree: &[TaskNode]) -> Vec<TaskNode> {
    let mut out = Vec::new();
    flatten_into(tree, None, &mut out);
    out
}

fn flatten_into(tasks: &[TaskNode], parent: Option<&TaskId>, out: &mut Vec<TaskNode>) {
    for task in tasks {
        let mut flat = task.clone();
        flat.subtasks = Vec::new();
        flat.parent_id = parent.cloned();
        out.push(flat);
        flatten_into(&task.subtasks, Some(&task.id), out);
    }
}

/// `(id, parent)` pairs in depth-first order
pub fn links(tree: &[TaskNode]) -> Vec<(TaskId, Option<TaskId>)> {
    flatten(tree)
        .into_iter()
        .map(|node| (node.id, node.parent_id))
        .collect()
}

/// Total number of nodes in the forest
pub fn count(tree: &[TaskNode]) -> usize {
    tree.iter().map(|t| 1 + count(&t.subtasks)).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
