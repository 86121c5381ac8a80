//! Natural-loop detection and loop-tree construction.
//!
//! # Loop Structure
//!
//! A natural loop is keyed by its **header**, the target of one or more
//! back edges. The sources of those back edges are the loop's **latches**,
//! and the body is every block that can reach a latch without passing
//! through the header. Back edges to the same header share one loop.
//!
//! ```text
//!          |
//!          v
//!     [header] <------+   <- back edge target
//!          |          |
//!          v          |
//!     [body ...]      |
//!          |          |
//!          v          |
//!     [latch] --------+   <- back edge source
//! ```
//!
//! # Loop Tree
//!
//! Loops nest: a loop whose header lies inside another loop's body is inner
//! to it, and its parent is the smallest such enclosing loop. After the
//! tree is linked, each outer loop's block set is trimmed by its direct
//! inner loops' blocks, so the loops partition the blocks they cover. A
//! synthetic **root loop** with no header gathers every reachable block
//! that belongs to no natural loop and adopts all top-level loops.
//!
//! # Algorithm
//!
//! 1. Collect back edges with a three-color depth-first search from the
//!    entry (`next1` before `next2`): an edge into a node currently on the
//!    DFS stack is a back edge. Back edges are accepted unconditionally;
//!    irreducible regions follow the same mechanical definition.
//! 2. Grow each loop's body with a predecessor walk from the latch, seeded
//!    with latch and header so the walk never crosses the header.
//! 3. Link parents (smallest enclosing loop), trim bodies, synthesize the
//!    root.
//!
//! Unreachable blocks are not visited and end up in no loop, the root
//! included.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::analysis::RootedGraph;
use crate::ir::BlockId;

/// A single loop: a natural loop keyed by its header, or the synthetic
/// root loop (`header == None`).
///
/// After analysis the block set is trimmed: blocks owned by a nested inner
/// loop are not repeated in the outer loop, so the loops of a
/// [`LoopAnalysis`] partition the blocks they cover.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::analysis::LoopAnalysis;
///
/// let analysis = LoopAnalysis::of(&graph);
/// for lp in analysis.loops() {
///     match lp.header {
///         Some(header) => println!("loop at {header}: {} blocks", lp.size()),
///         None => println!("root loop: {} blocks", lp.size()),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Loop {
    /// The header block; `None` denotes the synthetic root loop.
    pub header: Option<BlockId>,
    /// Blocks owned by this loop (excluding blocks of nested inner loops).
    pub blocks: FxHashSet<BlockId>,
    /// Back edge sources targeting this loop's header.
    pub latches: Vec<BlockId>,
    /// Header of the immediately enclosing loop; `None` when the parent is
    /// the root loop (or this is the root loop itself).
    pub parent: Option<BlockId>,
    /// Headers of the immediately nested inner loops.
    pub children: Vec<BlockId>,
}

impl Loop {
    /// Creates a loop with the given header and an otherwise empty body.
    ///
    /// A `Some` header is inserted into the block set right away.
    #[must_use]
    pub fn new(header: Option<BlockId>) -> Self {
        let mut blocks = FxHashSet::default();
        if let Some(header) = header {
            blocks.insert(header);
        }
        Self {
            header,
            blocks,
            latches: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Returns `true` if this is the synthetic root loop.
    #[must_use]
    #[inline]
    pub const fn is_root(&self) -> bool {
        self.header.is_none()
    }

    /// Returns `true` if this loop's block set contains the given block.
    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.blocks.contains(&block)
    }

    /// Returns the number of blocks this loop owns.
    #[must_use]
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if this loop has no nested inner loops.
    #[must_use]
    pub fn is_innermost(&self) -> bool {
        self.children.is_empty()
    }
}

/// The loops of a graph: all natural loops plus the synthetic root loop,
/// linked into a tree.
///
/// Two analyses are equal iff they have the same number of loops, the same
/// set of natural-loop headers, matching root presence, and per header the
/// same block set, latch set and parent header; the root loops must agree
/// on blocks and inner-loop headers. Loop and latch ordering is not
/// significant.
#[derive(Debug, Clone)]
pub struct LoopAnalysis {
    /// All loops; the root (if any) is the last entry.
    loops: Vec<Loop>,
    /// Index of the root loop in `loops`.
    root: Option<usize>,
    /// All collected back edges `(latch, header)` in discovery order.
    back_edges: Vec<(BlockId, BlockId)>,
    /// Owning loop of each block after trimming; `None` for unreachable
    /// blocks (and for indices past the analyzed graph).
    innermost: Vec<Option<usize>>,
}

impl LoopAnalysis {
    /// Runs the loop analysis on a rooted graph.
    ///
    /// An empty graph yields an analysis with no loops at all, not even a
    /// root.
    #[must_use]
    pub fn of<G: RootedGraph>(graph: &G) -> Self {
        let node_count = graph.node_count();
        if node_count == 0 {
            return Self {
                loops: Vec::new(),
                root: None,
                back_edges: Vec::new(),
                innermost: Vec::new(),
            };
        }

        let (back_edges, reachable) = collect_back_edges(graph);

        // One loop per header; back edges to the same header accumulate latches.
        let mut loops: Vec<Loop> = Vec::new();
        let mut header_to_idx: FxHashMap<BlockId, usize> = FxHashMap::default();
        for &(latch, header) in &back_edges {
            let idx = *header_to_idx.entry(header).or_insert_with(|| {
                loops.push(Loop::new(Some(header)));
                loops.len() - 1
            });
            loops[idx].latches.push(latch);
            loops[idx].blocks.insert(latch);

            // Predecessor walk from the latch; seeding the visited set with
            // the header keeps the walk from crossing it (a self-latching
            // header needs no walk at all). Unreachable predecessors stay
            // out of every loop body.
            let mut stack = if latch == header { Vec::new() } else { vec![latch] };
            let mut visited: FxHashSet<BlockId> = FxHashSet::default();
            visited.insert(latch);
            visited.insert(header);
            while let Some(current) = stack.pop() {
                for pred in graph.predecessors(current) {
                    if reachable[pred.index()] && visited.insert(pred) {
                        stack.push(pred);
                        loops[idx].blocks.insert(pred);
                    }
                }
            }
        }

        // Parent = enclosing candidate with the smallest block set.
        let count = loops.len();
        let mut parent_idx: Vec<Option<usize>> = vec![None; count];
        for i in 0..count {
            let Some(header) = loops[i].header else {
                continue;
            };
            for j in 0..count {
                if i == j || !loops[j].blocks.contains(&header) {
                    continue;
                }
                match parent_idx[i] {
                    Some(best) if loops[best].blocks.len() <= loops[j].blocks.len() => {}
                    _ => parent_idx[i] = Some(j),
                }
            }
        }
        for i in 0..count {
            if let Some(p) = parent_idx[i] {
                let parent_header = loops[p].header;
                let child_header = loops[i].header;
                loops[i].parent = parent_header;
                if let Some(header) = child_header {
                    loops[p].children.push(header);
                }
            }
        }

        // Trim against a pre-trim snapshot so the result partitions the
        // union regardless of loop order.
        let snapshot: Vec<FxHashSet<BlockId>> =
            loops.iter().map(|lp| lp.blocks.clone()).collect();
        for i in 0..count {
            for j in 0..count {
                if parent_idx[j] == Some(i) {
                    loops[i].blocks.retain(|block| !snapshot[j].contains(block));
                }
            }
        }

        // Root loop: every reachable block outside all natural loops.
        let mut root_loop = Loop::new(None);
        let in_any: FxHashSet<BlockId> =
            loops.iter().flat_map(|lp| lp.blocks.iter().copied()).collect();
        for index in 0..node_count {
            let block = BlockId::new(index);
            if reachable[index] && !in_any.contains(&block) {
                root_loop.blocks.insert(block);
            }
        }
        for (i, lp) in loops.iter().enumerate() {
            if parent_idx[i].is_none() {
                if let Some(header) = lp.header {
                    root_loop.children.push(header);
                }
            }
        }
        loops.push(root_loop);
        let root = Some(loops.len() - 1);

        let mut innermost = vec![None; node_count];
        for (idx, lp) in loops.iter().enumerate() {
            for block in &lp.blocks {
                innermost[block.index()] = Some(idx);
            }
        }

        Self {
            loops,
            root,
            back_edges,
            innermost,
        }
    }

    /// Builds an analysis from hand-assembled loops.
    ///
    /// This is the constructor tests use to state expected results; only
    /// the fields the equality in [`PartialEq`] inspects need to be filled
    /// in (back edges are not compared).
    #[must_use]
    pub fn from_loops(loops: Vec<Loop>) -> Self {
        let root = loops.iter().position(Loop::is_root);
        let node_count = loops
            .iter()
            .flat_map(|lp| lp.blocks.iter())
            .map(|block| block.index() + 1)
            .max()
            .unwrap_or(0);

        let mut innermost = vec![None; node_count];
        for (idx, lp) in loops.iter().enumerate() {
            for block in &lp.blocks {
                innermost[block.index()] = Some(idx);
            }
        }

        Self {
            loops,
            root,
            back_edges: Vec::new(),
            innermost,
        }
    }

    /// Returns all loops; the synthetic root (if present) is included.
    #[must_use]
    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    /// Returns the number of loops, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Returns `true` if there are no loops at all (empty graph).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Returns the synthetic root loop, if the graph was non-empty.
    #[must_use]
    pub fn root(&self) -> Option<&Loop> {
        self.root.map(|idx| &self.loops[idx])
    }

    /// Returns the natural loop with the given header.
    #[must_use]
    pub fn loop_for_header(&self, header: BlockId) -> Option<&Loop> {
        self.loops.iter().find(|lp| lp.header == Some(header))
    }

    /// Returns the loop owning the given block after trimming.
    ///
    /// Every reachable block is owned by exactly one loop (possibly the
    /// root); unreachable blocks belong to none.
    #[must_use]
    pub fn containing_loop(&self, block: BlockId) -> Option<&Loop> {
        self.innermost
            .get(block.index())
            .copied()
            .flatten()
            .map(|idx| &self.loops[idx])
    }

    /// Returns the nesting depth of a block: 0 in the root, 1 in a
    /// top-level natural loop, one more per nesting level.
    #[must_use]
    pub fn depth(&self, block: BlockId) -> usize {
        let mut depth = 0;
        let mut current = self.containing_loop(block);
        while let Some(lp) = current {
            if lp.header.is_none() {
                break;
            }
            depth += 1;
            current = match lp.parent {
                Some(header) => self.loop_for_header(header),
                None => None,
            };
        }
        depth
    }

    /// Returns the collected back edges `(latch, header)` in discovery order.
    #[must_use]
    pub fn back_edges(&self) -> &[(BlockId, BlockId)] {
        &self.back_edges
    }
}

impl PartialEq for LoopAnalysis {
    fn eq(&self, other: &Self) -> bool {
        if self.loops.len() != other.loops.len() {
            return false;
        }

        let by_header = |analysis: &'_ Self| -> FxHashMap<BlockId, usize> {
            analysis
                .loops
                .iter()
                .enumerate()
                .filter_map(|(idx, lp)| lp.header.map(|header| (header, idx)))
                .collect()
        };
        let this_map = by_header(self);
        let other_map = by_header(other);

        if this_map.len() != other_map.len() || self.root.is_some() != other.root.is_some() {
            return false;
        }

        let latch_set = |lp: &Loop| -> FxHashSet<BlockId> { lp.latches.iter().copied().collect() };

        for (header, &this_idx) in &this_map {
            let Some(&other_idx) = other_map.get(header) else {
                return false;
            };
            let this_loop = &self.loops[this_idx];
            let other_loop = &other.loops[other_idx];

            if this_loop.blocks != other_loop.blocks
                || latch_set(this_loop) != latch_set(other_loop)
                || this_loop.parent != other_loop.parent
            {
                return false;
            }
        }

        match (self.root(), other.root()) {
            (Some(this_root), Some(other_root)) => {
                let this_children: FxHashSet<BlockId> =
                    this_root.children.iter().copied().collect();
                let other_children: FxHashSet<BlockId> =
                    other_root.children.iter().copied().collect();
                this_root.blocks == other_root.blocks && this_children == other_children
            }
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LoopAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lp in &self.loops {
            match lp.header {
                Some(header) => write!(f, "loop {header}:")?,
                None => write!(f, "root loop:")?,
            }
            let mut blocks: Vec<BlockId> = lp.blocks.iter().copied().collect();
            blocks.sort_unstable();
            write!(f, " blocks")?;
            for block in blocks {
                write!(f, " {block}")?;
            }
            if !lp.latches.is_empty() {
                write!(f, "; latches")?;
                for latch in &lp.latches {
                    write!(f, " {latch}")?;
                }
            }
            if let Some(parent) = lp.parent {
                write!(f, "; parent {parent}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Collects back edges with a three-color DFS from the entry.
///
/// Returns the back edges `(source, target)` and the reachability mask.
/// An edge into a gray node (currently on the DFS stack) is a back edge;
/// white nodes are descended into, black nodes are skipped.
fn collect_back_edges<G: RootedGraph>(graph: &G) -> (Vec<(BlockId, BlockId)>, Vec<bool>) {
    let node_count = graph.node_count();
    let mut back_edges = Vec::new();
    let mut reachable = vec![false; node_count];

    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut colors = vec![Color::White; node_count];
    let mut stack = vec![(graph.entry(), State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if colors[node.index()] != Color::White {
                    continue;
                }
                colors[node.index()] = Color::Gray;
                reachable[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<BlockId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    match colors[succ.index()] {
                        Color::Gray => {}
                        Color::White => stack.push((succ, State::Enter)),
                        Color::Black => {}
                    }
                }
                // Classify in successor order (the stack above is reversed)
                for succ in successors {
                    if colors[succ.index()] == Color::Gray {
                        back_edges.push((node, succ));
                    }
                }
            }
            State::Exit => {
                colors[node.index()] = Color::Black;
            }
        }
    }

    (back_edges, reachable)
}
