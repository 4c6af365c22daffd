use serde::Serialize;
use std::collections::HashMap;

/// An item that can be arranged into a discussion thread.
pub trait Threaded {
    fn id(&self) -> i64;
    fn parent_id(&self) -> Option<i64>;
}

/// An item together with its direct replies.
#[derive(Debug, Serialize)]
pub struct Node<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<Node<T>>,
}

/// Arranges a flat list of items into a forest.
///
/// An item is attached to its parent if the parent is present in `items` and the link
/// wouldn't form a cycle with the links accepted before it. Every other item becomes a root,
/// including replies whose parent is missing. Roots and siblings keep the relative order
/// they had in `items`. If an id occurs more than once, the first occurrence owns it.
pub fn build<T: Threaded>(items: Vec<T>) -> Vec<Node<T>> {
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        index.entry(item.id()).or_insert(position);
    }

    let mut parents: Vec<Option<usize>> = vec![None; items.len()];
    for (position, item) in items.iter().enumerate() {
        let owns_id = index.get(&item.id()) == Some(&position);
        let parent = item.parent_id().and_then(|parent_id| index.get(&parent_id).copied());
        if let Some(parent) = parent
            && owns_id
            && !is_ancestor_or_self(&parents, position, parent)
        {
            parents[position] = Some(parent);
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots = Vec::new();
    for (position, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(position),
            None => roots.push(position),
        }
    }

    // Parents always precede their descendants in preorder, so assembling nodes in reverse
    // preorder guarantees every child is finished before its parent needs it.
    let mut preorder = Vec::with_capacity(items.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(position) = stack.pop() {
        preorder.push(position);
        stack.extend(children[position].iter().rev());
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut nodes: Vec<Option<Node<T>>> = std::iter::repeat_with(|| None).take(slots.len()).collect();
    for &position in preorder.iter().rev() {
        let Some(item) = slots[position].take() else {
            continue;
        };
        let child_nodes = children[position]
            .iter()
            .filter_map(|&child| nodes[child].take())
            .collect();
        nodes[position] = Some(Node {
            item,
            children: child_nodes,
        });
    }
    roots.into_iter().filter_map(|root| nodes[root].take()).collect()
}

/// Returns true if `position` is `start` or one of the accepted ancestors of `start`.
/// Accepted links never form a cycle, so the walk always terminates.
fn is_ancestor_or_self(parents: &[Option<usize>], position: usize, start: usize) -> bool {
    let mut current = Some(start);
    while let Some(ancestor) = current {
        if ancestor == position {
            return true;
        }
        current = parents[ancestor];
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Item {
        id: i64,
        parent_id: Option<i64>,
    }

    impl Threaded for Item {
        fn id(&self) -> i64 {
            self.id
        }

        fn parent_id(&self) -> Option<i64> {
            self.parent_id
        }
    }

    fn items(pairs: &[(i64, Option<i64>)]) -> Vec<Item> {
        pairs.iter().map(|&(id, parent_id)| Item { id, parent_id }).collect()
    }

    fn subtree_size(node: &Node<Item>) -> usize {
        let mut count = 0;
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Renders a forest as a compact string like "1[2[3],4] 5".
    fn render(nodes: &[Node<Item>]) -> String {
        nodes
            .iter()
            .map(|node| {
                if node.children.is_empty() {
                    node.item.id.to_string()
                } else {
                    let children: Vec<String> = node
                        .children
                        .iter()
                        .map(|child| render(std::slice::from_ref(child)))
                        .collect();
                    format!("{}[{}]", node.item.id, children.join(","))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn orphans_become_roots() {
        let forest = build(items(&[(1, None), (2, Some(1)), (3, Some(99))]));
        assert_eq!(render(&forest), "1[2] 3");
    }

    #[test]
    fn empty() {
        let forest = build(Vec::<Item>::new());
        assert!(forest.is_empty());
    }

    #[test]
    fn preserves_order() {
        // Newest first, as comments are fetched
        let forest = build(items(&[(6, Some(1)), (5, None), (4, Some(1)), (3, Some(2)), (2, Some(1)), (1, None)]));
        assert_eq!(render(&forest), "5 1[6,4,2[3]]");
    }

    #[test]
    fn parent_after_child() {
        let forest = build(items(&[(3, Some(2)), (2, Some(1)), (1, None)]));
        assert_eq!(render(&forest), "1[2[3]]");
        assert_eq!(subtree_size(&forest[0]), 3);
    }

    #[test]
    fn rejects_cycles() {
        let forest = build(items(&[(7, Some(7))]));
        assert_eq!(render(&forest), "7");

        let forest = build(items(&[(1, Some(2)), (2, Some(1))]));
        assert_eq!(render(&forest), "2[1]");

        let forest = build(items(&[(1, Some(3)), (2, Some(1)), (3, Some(2)), (4, Some(3))]));
        assert_eq!(render(&forest), "3[1[2],4]");
        assert_eq!(forest.iter().map(subtree_size).sum::<usize>(), 4);
    }

    #[test]
    fn duplicate_ids() {
        let forest = build(items(&[(1, None), (2, Some(1)), (2, Some(1))]));
        assert_eq!(render(&forest), "1[2] 2");
    }

    #[test]
    fn deep_chain() {
        const DEPTH: i64 = 500;
        let chain: Vec<_> = (1..=DEPTH).map(|id| (id, (id > 1).then_some(id - 1))).collect();
        let forest = build(items(&chain));
        assert_eq!(forest.len(), 1);
        assert_eq!(subtree_size(&forest[0]), DEPTH as usize);
    }

    #[test]
    fn serializes_children() {
        #[derive(Serialize)]
        struct Named {
            id: i64,
        }
        let node = Node {
            item: Named { id: 1 },
            children: vec![Node {
                item: Named { id: 2 },
                children: Vec::new(),
            }],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 1, "children": [{ "id": 2, "children": [] }] }));
    }
}
