//! Binary prefix trie stored as an index arena.
//!
//! Node 0 is always the root. Each node owns up to two children (`0` and `1`
//! edges) and keeps a non-owning parent index so a [`TrieCursor`] can climb
//! back up without a path stack.

use std::io::Read;

use crate::bit_stream::BitInput;
use crate::error::{ArchiveError, Result};
use crate::symbol::Symbol;

pub type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Node {
    symbol: Option<Symbol>,
    children: [Option<NodeId>; 2],
    parent: Option<NodeId>,
}

impl Node {
    fn is_terminal(&self) -> bool {
        self.symbol.is_some()
    }

    fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trie {
    nodes: Vec<Node>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    /// A trie holding only an empty, non-terminal root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    /// A single terminal node.
    pub fn leaf(symbol: Symbol) -> Self {
        Self {
            nodes: vec![Node {
                symbol: Some(symbol),
                ..Node::default()
            }],
        }
    }

    /// A new root owning `left` as its `0` child and `right` as its `1` child.
    pub fn join(left: Trie, right: Trie) -> Self {
        let left_offset = 1;
        let right_offset = 1 + left.nodes.len();
        let mut nodes = Vec::with_capacity(right_offset + right.nodes.len());
        nodes.push(Node {
            symbol: None,
            children: [Some(left_offset), Some(right_offset)],
            parent: None,
        });
        for (subtree, offset) in [(left, left_offset), (right, right_offset)] {
            for node in subtree.nodes {
                nodes.push(Node {
                    symbol: node.symbol,
                    children: node.children.map(|c| c.map(|id| id + offset)),
                    parent: Some(node.parent.map_or(ROOT, |id| id + offset)),
                });
            }
        }
        Self { nodes }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert the path spelled by the low `length` bits of `path` (MSB
    /// first) and mark its end with `symbol`.
    ///
    /// Fails if the new path would pass through or end on an existing
    /// terminal, or end on a node that already has children: either case
    /// means the codes being inserted are not prefix-free.
    pub fn add_branch(&mut self, path: u64, length: usize, symbol: Symbol) -> Result<()> {
        let mut current = ROOT;
        for step in (0..length).rev() {
            if self.nodes[current].is_terminal() {
                return Err(ArchiveError::malformed(format!(
                    "code of symbol {symbol} extends the code of another symbol"
                )));
            }
            let bit = ((path >> step) & 1) as usize;
            current = match self.nodes[current].children[bit] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node {
                        parent: Some(current),
                        ..Node::default()
                    });
                    self.nodes[current].children[bit] = Some(child);
                    child
                }
            };
        }
        let node = &mut self.nodes[current];
        if node.is_terminal() || node.has_children() {
            return Err(ArchiveError::malformed(format!(
                "code of symbol {symbol} collides with another code"
            )));
        }
        node.symbol = Some(symbol);
        Ok(())
    }

    pub fn cursor(&self) -> TrieCursor<'_> {
        TrieCursor {
            trie: self,
            current: ROOT,
        }
    }

    /// Walk from the root one input bit at a time until a terminal is reached.
    pub fn decode_symbol<R: Read>(&self, input: &mut BitInput<R>) -> Result<Symbol> {
        let mut cursor = self.cursor();
        loop {
            if let Some(symbol) = cursor.symbol() {
                return Ok(symbol);
            }
            let bit = input.get_bit()?;
            if !cursor.go_to_child(bit) {
                return Err(ArchiveError::malformed("bit sequence matches no code"));
            }
        }
    }
}

/// Read-only position inside a [`Trie`].
#[derive(Debug, Clone, Copy)]
pub struct TrieCursor<'a> {
    trie: &'a Trie,
    current: NodeId,
}

impl<'a> TrieCursor<'a> {
    fn node(&self) -> &'a Node {
        &self.trie.nodes[self.current]
    }

    pub fn is_terminal(&self) -> bool {
        self.node().is_terminal()
    }

    pub fn symbol(&self) -> Option<Symbol> {
        self.node().symbol
    }

    pub fn is_root(&self) -> bool {
        self.current == ROOT
    }

    pub fn has_child(&self, bit: bool) -> bool {
        self.node().children[bit as usize].is_some()
    }

    /// Step along the `bit` edge. Returns `false` and stays put if there is no such child.
    pub fn go_to_child(&mut self, bit: bool) -> bool {
        match self.node().children[bit as usize] {
            Some(child) => {
                self.current = child;
                true
            }
            None => false,
        }
    }

    /// Step to the parent; a no-op at the root.
    pub fn go_to_parent(&mut self) {
        if let Some(parent) = self.node().parent {
            self.current = parent;
        }
    }

    pub fn go_to_root(&mut self) {
        self.current = ROOT;
    }
}
