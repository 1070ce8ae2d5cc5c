//! Strongly-connected-components algorithm (Tarjan's), iterative.
//!
//! Shared by the elaborator's call-graph analysis (§4.2, grouping mutually
//! recursive bindings into `LetRec`) and the linker's import-graph cycle
//! detection (§4.9). An explicit work stack stands in for the call stack a
//! recursive formulation would use, so a long chain of mutually calling
//! top-level bindings cannot overflow the host stack.

use rustc_hash::FxHashMap;
use std::hash::Hash;

struct NodeState {
    index: usize,
    low_link: usize,
    on_stack: bool,
}

/// One frame of the simulated call stack: the node being visited, its
/// precomputed successor list, and how far into that list we've gotten.
struct Frame<N> {
    node: N,
    successors: Vec<N>,
    next_successor: usize,
}

/// Returns the strongly connected components of the graph described by
/// `successors`, in reverse topological order (a component's dependencies
/// appear before it).
pub fn tarjan_scc<N, F, I>(nodes: &[N], mut successors: F) -> Vec<Vec<N>>
where
    N: Eq + Hash + Clone,
    F: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let mut state: FxHashMap<N, NodeState> = FxHashMap::default();
    let mut on_stack_order: Vec<N> = Vec::new();
    let mut next_index = 0usize;
    let mut sccs: Vec<Vec<N>> = Vec::new();

    for start in nodes {
        if state.contains_key(start) {
            continue;
        }
        let mut call_stack: Vec<Frame<N>> = vec![Frame {
            node: start.clone(),
            successors: successors(start).into_iter().collect(),
            next_successor: 0,
        }];
        state.insert(
            start.clone(),
            NodeState { index: next_index, low_link: next_index, on_stack: true },
        );
        next_index += 1;
        on_stack_order.push(start.clone());

        while let Some(frame) = call_stack.last_mut() {
            if frame.next_successor < frame.successors.len() {
                let w = frame.successors[frame.next_successor].clone();
                frame.next_successor += 1;

                if !state.contains_key(&w) {
                    state.insert(
                        w.clone(),
                        NodeState { index: next_index, low_link: next_index, on_stack: true },
                    );
                    next_index += 1;
                    on_stack_order.push(w.clone());
                    call_stack.push(Frame {
                        successors: successors(&w).into_iter().collect(),
                        node: w,
                        next_successor: 0,
                    });
                } else if state[&w].on_stack {
                    let w_index = state[&w].index;
                    let v = &frame.node;
                    let v_low = state[v].low_link.min(w_index);
                    state.get_mut(v).unwrap().low_link = v_low;
                }
            } else {
                // All successors explored; pop this frame and fold its
                // low-link into the caller's before deciding if it roots an SCC.
                let frame = call_stack.pop().unwrap();
                let v = frame.node;
                let v_state_index = state[&v].index;
                let v_low = state[&v].low_link;

                if let Some(caller) = call_stack.last() {
                    let caller_node = caller.node.clone();
                    let folded = state[&caller_node].low_link.min(v_low);
                    state.get_mut(&caller_node).unwrap().low_link = folded;
                }

                if v_low == v_state_index {
                    let mut component = Vec::new();
                    loop {
                        let w = on_stack_order.pop().expect("SCC stack underflow");
                        state.get_mut(&w).unwrap().on_stack = false;
                        let is_root = w == v;
                        component.push(w);
                        if is_root {
                            break;
                        }
                    }
                    sccs.push(component);
                }
            }
        }
    }

    sccs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap as Map;

    fn sccs_of(edges: &[(i32, i32)], nodes: &[i32]) -> Vec<Vec<i32>> {
        let mut adj: Map<i32, Vec<i32>> = Map::default();
        for &(a, b) in edges {
            adj.entry(a).or_default().push(b);
        }
        tarjan_scc(nodes, |n| adj.get(n).cloned().unwrap_or_default())
    }

    #[test]
    fn singleton_non_recursive_nodes_are_their_own_component() {
        let sccs = sccs_of(&[(1, 2)], &[1, 2]);
        assert_eq!(sccs.len(), 2);
        assert!(sccs.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn self_recursion_is_a_singleton_scc_containing_itself() {
        let sccs = sccs_of(&[(1, 1)], &[1]);
        assert_eq!(sccs, vec![vec![1]]);
    }

    #[test]
    fn mutual_recursion_collapses_into_one_component() {
        let sccs = sccs_of(&[(1, 2), (2, 1)], &[1, 2]);
        assert_eq!(sccs.len(), 1);
        let mut comp = sccs[0].clone();
        comp.sort();
        assert_eq!(comp, vec![1, 2]);
    }

    #[test]
    fn three_way_cycle_plus_independent_node() {
        let sccs = sccs_of(&[(1, 2), (2, 3), (3, 1)], &[1, 2, 3, 4]);
        assert_eq!(sccs.len(), 2);
        let sizes: Vec<_> = {
            let mut s: Vec<_> = sccs.iter().map(|c| c.len()).collect();
            s.sort();
            s
        };
        assert_eq!(sizes, vec![1, 3]);
    }
}
