//! AVL-balanced price level tree
//!
//! Holds one side of the book. Levels are keyed by fixed-point price and each
//! node owns its children exclusively, caching the height of its subtree.
//! Insertions and deletions rebalance the ancestor path while the recursion
//! unwinds, so every operation is bounded by the O(log n) tree height.

use std::cmp::{max, Ordering};
use std::fmt::Write as _;

use super::PriceLevel;
use crate::error::{BookError, Result};

type Link = Option<Box<Node>>;

#[derive(Debug, Clone)]
struct Node {
    level: PriceLevel,
    left: Link,
    right: Link,
    height: u8,
}

impl Node {
    fn new(level: PriceLevel) -> Box<Self> {
        Box::new(Self {
            level,
            left: None,
            right: None,
            height: 1,
        })
    }

    fn update_height(&mut self) {
        self.height = 1 + max(height(&self.left), height(&self.right));
    }

    /// Left subtree height minus right subtree height
    fn balance_factor(&self) -> i16 {
        i16::from(height(&self.left)) - i16::from(height(&self.right))
    }
}

fn height(link: &Link) -> u8 {
    link.as_ref().map_or(0, |node| node.height)
}

fn balance_factor(link: &Link) -> i16 {
    link.as_ref().map_or(0, |node| node.balance_factor())
}

/// Outcome of a single upsert against a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    /// A new price level was created
    Inserted,
    /// An existing level's quantity was overwritten
    Updated { previous: u64 },
    /// A zero quantity removed an existing level
    Removed { previous: u64 },
    /// A zero quantity targeted a price that is not in the tree
    Unchanged,
}

/// One node as seen by the diagnostic traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView {
    pub level: PriceLevel,
    /// Cached height of the subtree rooted at this node
    pub height: u8,
    /// Distance from the root
    pub depth: usize,
}

/// Self-balancing binary search tree of price levels for one book side
#[derive(Debug, Clone, Default)]
pub struct PriceLevelTree {
    root: Link,
    len: usize,
}

impl PriceLevelTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, overwrite or remove a level depending on its quantity
    ///
    /// A zero quantity deletes the price. A known price has its quantity
    /// replaced in place without touching the tree shape; an unknown price is
    /// inserted and the path back to the root is rebalanced.
    pub fn upsert(&mut self, level: PriceLevel) -> LevelChange {
        if level.quantity == 0 {
            return match self.delete(level.price) {
                Some(previous) => LevelChange::Removed {
                    previous: previous.quantity,
                },
                None => LevelChange::Unchanged,
            };
        }

        if let Some(node) = self.find_mut(level.price) {
            let previous = std::mem::replace(&mut node.level.quantity, level.quantity);
            return LevelChange::Updated { previous };
        }

        self.root = Some(insert(self.root.take(), level));
        self.len += 1;
        LevelChange::Inserted
    }

    /// Remove the level at `price`, returning it if it was present
    pub fn delete(&mut self, price: u64) -> Option<PriceLevel> {
        let mut removed = None;
        self.root = remove(self.root.take(), price, &mut removed);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Look up the level at an exact price
    pub fn get(&self, price: u64) -> Option<PriceLevel> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match price.cmp(&node.level.price) {
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
                Ordering::Equal => return Some(node.level),
            }
        }
        None
    }

    pub fn contains(&self, price: u64) -> bool {
        self.get(price).is_some()
    }

    /// Lowest priced level, `None` when the tree is empty
    pub fn min_level(&self) -> Option<PriceLevel> {
        self.root.as_deref().map(|root| leftmost(root).level)
    }

    /// Highest priced level, `None` when the tree is empty
    pub fn max_level(&self) -> Option<PriceLevel> {
        self.root.as_deref().map(|root| rightmost(root).level)
    }

    pub fn min_price(&self) -> Option<u64> {
        self.min_level().map(|level| level.price)
    }

    pub fn max_price(&self) -> Option<u64> {
        self.max_level().map(|level| level.price)
    }

    /// Number of price levels
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree, 0 when empty
    pub fn height(&self) -> usize {
        usize::from(height(&self.root))
    }

    /// Release every level
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Levels in ascending price order
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.root.as_deref(), false)
    }

    /// Levels in descending price order
    pub fn iter_desc(&self) -> Iter<'_> {
        Iter::new(self.root.as_deref(), true)
    }

    /// Right-to-left traversal reporting every node with its height and depth
    ///
    /// Intended for debugging only; the layout is not a stable format.
    pub fn structure(&self) -> Vec<NodeView> {
        let mut views = Vec::with_capacity(self.len);
        collect_structure(self.root.as_deref(), 0, &mut views);
        views
    }

    /// Render [`structure`](Self::structure) as an indented sideways tree
    pub fn render_structure(&self) -> String {
        let mut out = String::new();
        for view in self.structure() {
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "{:indent$}{} x {} (h={})",
                "",
                view.level.price,
                view.level.quantity,
                view.height,
                indent = view.depth * 4
            );
        }
        out
    }

    /// Check ordering, balance, cached heights and the level count
    pub fn validate(&self) -> Result<()> {
        let mut count = 0;
        check_subtree(self.root.as_deref(), None, None, &mut count)?;
        if count != self.len {
            return Err(BookError::CorruptTree(format!(
                "tracked {} levels but {} are reachable",
                self.len, count
            )));
        }
        Ok(())
    }

    fn find_mut(&mut self, price: u64) -> Option<&mut Node> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            match price.cmp(&node.level.price) {
                Ordering::Less => current = node.left.as_deref_mut(),
                Ordering::Greater => current = node.right.as_deref_mut(),
                Ordering::Equal => return Some(node),
            }
        }
        None
    }
}

impl Extend<PriceLevel> for PriceLevelTree {
    fn extend<I: IntoIterator<Item = PriceLevel>>(&mut self, levels: I) {
        for level in levels {
            self.upsert(level);
        }
    }
}

impl FromIterator<PriceLevel> for PriceLevelTree {
    fn from_iter<I: IntoIterator<Item = PriceLevel>>(levels: I) -> Self {
        let mut tree = Self::new();
        tree.extend(levels);
        tree
    }
}

impl<'a> IntoIterator for &'a PriceLevelTree {
    type Item = PriceLevel;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over a [`PriceLevelTree`]
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
    descending: bool,
}

impl<'a> Iter<'a> {
    fn new(root: Option<&'a Node>, descending: bool) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            descending,
        };
        iter.push_spine(root);
        iter
    }

    fn push_spine(&mut self, mut node: Option<&'a Node>) {
        while let Some(current) = node {
            self.stack.push(current);
            node = if self.descending {
                current.right.as_deref()
            } else {
                current.left.as_deref()
            };
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = PriceLevel;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let next = if self.descending {
            node.left.as_deref()
        } else {
            node.right.as_deref()
        };
        self.push_spine(next);
        Some(node.level)
    }
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

fn insert(link: Link, level: PriceLevel) -> Box<Node> {
    let Some(mut node) = link else {
        return Node::new(level);
    };

    match level.price.cmp(&node.level.price) {
        Ordering::Less => node.left = Some(insert(node.left.take(), level)),
        Ordering::Greater => node.right = Some(insert(node.right.take(), level)),
        Ordering::Equal => {
            node.level.quantity = level.quantity;
            return node;
        }
    }

    node.update_height();
    rebalance_after_insert(node, level.price)
}

/// Restore balance using the position of the key that was just inserted
fn rebalance_after_insert(mut node: Box<Node>, price: u64) -> Box<Node> {
    let balance = node.balance_factor();

    if balance > 1 {
        if let Some(left_price) = node.left.as_ref().map(|left| left.level.price) {
            // left-right case
            if price > left_price {
                node.left = node.left.take().map(rotate_left);
            }
            return rotate_right(node);
        }
    } else if balance < -1 {
        if let Some(right_price) = node.right.as_ref().map(|right| right.level.price) {
            // right-left case
            if price < right_price {
                node.right = node.right.take().map(rotate_right);
            }
            return rotate_left(node);
        }
    }

    node
}

fn remove(link: Link, price: u64, removed: &mut Option<PriceLevel>) -> Link {
    let mut node = link?;

    match price.cmp(&node.level.price) {
        Ordering::Less => node.left = remove(node.left.take(), price, removed),
        Ordering::Greater => node.right = remove(node.right.take(), price, removed),
        Ordering::Equal => {
            *removed = Some(node.level);
            match (node.left.take(), node.right.take()) {
                (None, None) => return None,
                (Some(child), None) | (None, Some(child)) => return Some(child),
                (Some(left), Some(right)) => {
                    // Splice in the in-order successor, then drop its old node
                    let successor = leftmost(&right).level;
                    node.level = successor;
                    node.left = Some(left);
                    node.right = remove(Some(right), successor.price, &mut None);
                }
            }
        }
    }

    node.update_height();
    Some(rebalance_after_delete(node))
}

/// Restore balance using the child's own balance factor
fn rebalance_after_delete(mut node: Box<Node>) -> Box<Node> {
    let balance = node.balance_factor();

    if balance > 1 {
        if balance_factor(&node.left) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }

    if balance < -1 {
        if balance_factor(&node.right) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }

    node
}

fn leftmost(mut node: &Node) -> &Node {
    while let Some(left) = node.left.as_deref() {
        node = left;
    }
    node
}

fn rightmost(mut node: &Node) -> &Node {
    while let Some(right) = node.right.as_deref() {
        node = right;
    }
    node
}

fn collect_structure(node: Option<&Node>, depth: usize, views: &mut Vec<NodeView>) {
    let Some(node) = node else {
        return;
    };
    collect_structure(node.right.as_deref(), depth + 1, views);
    views.push(NodeView {
        level: node.level,
        height: node.height,
        depth,
    });
    collect_structure(node.left.as_deref(), depth + 1, views);
}

/// Validate a subtree whose prices must lie strictly inside `(lower, upper)`
fn check_subtree(
    node: Option<&Node>,
    lower: Option<u64>,
    upper: Option<u64>,
    count: &mut usize,
) -> Result<u8> {
    let Some(node) = node else {
        return Ok(0);
    };
    let price = node.level.price;

    if lower.is_some_and(|lo| price <= lo) || upper.is_some_and(|hi| price >= hi) {
        return Err(BookError::CorruptTree(format!(
            "price {price} out of order (bounds {lower:?}..{upper:?})"
        )));
    }
    if node.level.quantity == 0 {
        return Err(BookError::CorruptTree(format!(
            "price {price} rests with zero quantity"
        )));
    }

    let left = check_subtree(node.left.as_deref(), lower, Some(price), count)?;
    let right = check_subtree(node.right.as_deref(), Some(price), upper, count)?;

    if left.abs_diff(right) > 1 {
        return Err(BookError::CorruptTree(format!(
            "price {price} unbalanced: left height {left}, right height {right}"
        )));
    }
    let expected = 1 + max(left, right);
    if node.height != expected {
        return Err(BookError::CorruptTree(format!(
            "price {price} caches height {} but subtree height is {expected}",
            node.height
        )));
    }

    *count += 1;
    Ok(expected)
}
