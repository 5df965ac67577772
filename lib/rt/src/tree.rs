//! Walks over "first child / next sibling" hierarchies.
//!
//! The engine exposes bookmarks and document structure as a node type that
//! can only answer three questions: is it valid, what is its first child,
//! what is its next sibling. [`Children`] walks one level of that relation,
//! [`DeepTree`] walks all of it in preorder without recursion.

use crate::enumerate::{EnumIter, Enumerable, Enumerator};
use crate::error::{Error, Result};
use std::mem;

/// A node discovered incrementally through the engine.
///
/// An invalid node (`ok() == false`) marks the end of a sibling chain.
pub trait Node: Clone {
    fn ok(&self) -> bool;

    fn first_child(&self) -> Self;

    fn next_sibling(&self) -> Self;

    fn children(&self) -> Children<Self> {
        Children::new(self.clone())
    }
}

/// The immediate children of one node.
#[derive(Debug, Clone)]
pub struct Children<T> {
    parent: T,
}

impl<T: Node> Children<T> {
    pub fn new(parent: T) -> Self {
        Self { parent }
    }

    pub fn parent(&self) -> &T {
        &self.parent
    }
}

impl<T: Node> Enumerable for Children<T> {
    type Item = T;
    type Enumerator<'a>
        = SiblingEnumerator<T>
    where
        Self: 'a;

    fn enumerator(&self) -> Result<Self::Enumerator<'_>> {
        Ok(SiblingEnumerator::new(self.parent.clone()))
    }
}

#[derive(Debug)]
enum SiblingState<T> {
    NotStarted,
    Positioned(T),
    Exhausted,
}

#[derive(Debug)]
pub struct SiblingEnumerator<T> {
    parent: T,
    state: SiblingState<T>,
}

impl<T: Node> SiblingEnumerator<T> {
    pub fn new(parent: T) -> Self {
        Self {
            parent,
            state: SiblingState::NotStarted,
        }
    }
}

impl<T: Node> Enumerator for SiblingEnumerator<T> {
    type Item = T;

    fn advance(&mut self) -> Result<bool> {
        let next = match mem::replace(&mut self.state, SiblingState::Exhausted) {
            SiblingState::NotStarted => self.parent.first_child(),
            SiblingState::Positioned(node) => node.next_sibling(),
            SiblingState::Exhausted => return Ok(false),
        };
        if !next.ok() {
            return Ok(false);
        }
        self.state = SiblingState::Positioned(next);
        Ok(true)
    }

    fn current(&self) -> Result<T> {
        match &self.state {
            SiblingState::Positioned(node) => Ok(node.clone()),
            _ => Err(Error::NotPositioned),
        }
    }
}

/// Every node below `root` in preorder.
#[derive(Debug, Clone)]
pub struct DeepTree<T> {
    root: T,
    include_root: bool,
}

impl<T: Node> DeepTree<T> {
    /// The descendants of `root`, not `root` itself.
    pub fn new(root: T) -> Self {
        Self {
            root,
            include_root: false,
        }
    }

    /// `root` first, then its descendants.
    pub fn including_root(root: T) -> Self {
        Self {
            root,
            include_root: true,
        }
    }
}

impl<T: Node> Enumerable for DeepTree<T> {
    type Item = T;
    type Enumerator<'a>
        = DeepTreeEnumerator<T>
    where
        Self: 'a;

    fn enumerator(&self) -> Result<Self::Enumerator<'_>> {
        DeepTreeEnumerator::new(self.root.clone(), self.include_root)
    }
}

enum Pending<T: Node> {
    Root(Option<T>),
    Children(EnumIter<SiblingEnumerator<T>>),
}

impl<T: Node> Pending<T> {
    fn take_next(&mut self) -> Option<Result<T>> {
        match self {
            Self::Root(root) => root.take().map(Ok),
            Self::Children(iter) => iter.next(),
        }
    }
}

struct Frame<T: Node> {
    node: T,
    pending: Pending<T>,
}

/// Preorder cursor with an explicit stack.
///
/// Each frame holds a node together with the part of its child list not yet
/// visited. A frame is only pushed for nodes that have at least one child,
/// so the stack never holds more frames than the tree is deep.
pub struct DeepTreeEnumerator<T: Node> {
    stack: Vec<Frame<T>>,
    current: Option<(T, usize)>,
}

impl<T: Node> DeepTreeEnumerator<T> {
    pub fn new(root: T, include_root: bool) -> Result<Self> {
        let pending = if include_root {
            Pending::Root(Some(root.clone()))
        } else {
            Pending::Children(root.children().iter()?)
        };
        Ok(Self {
            stack: vec![Frame {
                node: root,
                pending,
            }],
            current: None,
        })
    }

    /// Depth of the current element, counted from the first level yielded.
    pub fn depth(&self) -> Option<usize> {
        self.current.as_ref().map(|(_, depth)| *depth)
    }

    /// The node whose child list produced the current element.
    pub fn parent(&self) -> Option<&T> {
        let (_, depth) = self.current.as_ref()?;
        let frame = self.stack.get(*depth)?;
        match frame.pending {
            Pending::Children(_) => Some(&frame.node),
            Pending::Root(_) => None,
        }
    }
}

impl<T: Node> Enumerator for DeepTreeEnumerator<T> {
    type Item = T;

    fn advance(&mut self) -> Result<bool> {
        self.current = None;
        while let Some(top) = self.stack.last_mut() {
            let Some(next) = top.pending.take_next() else {
                self.stack.pop();
                continue;
            };
            let node = next?;
            let depth = self.stack.len() - 1;
            let children = node.children().iter()?;
            if !children.is_end() {
                self.stack.push(Frame {
                    node: node.clone(),
                    pending: Pending::Children(children),
                });
            }
            self.current = Some((node, depth));
            return Ok(true);
        }
        Ok(false)
    }

    fn current(&self) -> Result<T> {
        self.current
            .as_ref()
            .map(|(node, _)| node.clone())
            .ok_or(Error::NotPositioned)
    }
}
