//! The decoded game as a tree of moves.
//!
//! Nodes live in one arena `Vec` and refer to each other by index; the
//! variation structure never needs the nodes to move, and the writer can
//! walk children without borrow gymnastics. The first child of a node is
//! the mainline continuation, later children are variations in stream
//! order.

use crate::model::DecodedMove;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct GameNode {
    /// `None` only on the root.
    pub mv: Option<DecodedMove>,
    /// The SAN token rendered at decode time, `--` for a null move.
    pub san: String,
    pub comment: Option<String>,
    pub nags: Vec<u8>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct GameTree {
    nodes: Vec<GameNode>,
}

impl GameTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![GameNode {
                mv: None,
                san: String::new(),
                comment: None,
                nags: vec![],
                parent: None,
                children: vec![],
            }],
        }
    }

    pub fn node(&self, id: NodeId) -> &GameNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut GameNode {
        &mut self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Append a move under `parent` and return the new node.
    pub fn add_child(&mut self, parent: NodeId, mv: DecodedMove, san: String) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(GameNode {
            mv: Some(mv),
            san,
            comment: None,
            nags: vec![],
            parent: Some(parent),
            children: vec![],
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Attach comment text to a node; a second comment on the same node
    /// is joined with a space.
    pub fn append_comment(&mut self, id: NodeId, text: &str) {
        let node = &mut self.nodes[id];
        match &mut node.comment {
            Some(c) => {
                c.push(' ');
                c.push_str(text);
            }
            None => node.comment = Some(text.to_string()),
        }
    }

    pub fn add_nag(&mut self, id: NodeId, nag: u8) {
        self.nodes[id].nags.push(nag);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl Default for GameTree {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn first_child_stays_mainline() {
    use crate::model::{ChessMan, MoveKind, Square};

    let mv = DecodedMove {
        from: Square::e2,
        to: Square::e4,
        man: ChessMan::WHITE_PAWN,
        capture: None,
        kind: MoveKind::DoublePush,
    };

    let mut tree = GameTree::new();
    let main = tree.add_child(GameTree::ROOT, mv, "e4".into());
    let var = tree.add_child(GameTree::ROOT, mv, "d4".into());

    assert_eq!(tree.node(GameTree::ROOT).children, vec![main, var]);
    assert_eq!(tree.parent(var), Some(GameTree::ROOT));
}

#[test]
fn comments_join() {
    let mut tree = GameTree::new();
    tree.append_comment(GameTree::ROOT, "one");
    tree.append_comment(GameTree::ROOT, "two");
    assert_eq!(tree.node(GameTree::ROOT).comment.as_deref(), Some("one two"));
}
