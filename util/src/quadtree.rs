//! # Quadtree Implementation
//!
//! This is an implementation of a point-region quadtree, as described in [the
//! wikipedia article](https://en.wikipedia.org/wiki/Quadtree), generalised so
//! that each stored point carries an item of payload data.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector2;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Number of entries per QuadTree node
pub const CAPACITY: usize = 4;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Represents a quad with a centre and half-width.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quad {
    centre: Vector2<f64>,
    half_width: f64,
}

/// A quadtree over payload-carrying points.
#[derive(Clone, Debug)]
pub struct QuadTree<T> {
    /// The bounds of this node
    boundary: Quad,

    /// Entries stored in this node
    entries: Vec<(Vector2<f64>, T)>,

    /// North West child of the node
    north_west: Option<Box<QuadTree<T>>>,

    /// North East child of the node
    north_east: Option<Box<QuadTree<T>>>,

    /// South West child of the node
    south_west: Option<Box<QuadTree<T>>>,

    /// South East child of the node
    south_east: Option<Box<QuadTree<T>>>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum QuadTreeError {
    #[error("The given point {0} was not in the bounds of the quadtree {1:?}")]
    PointNotInBounds(Vector2<f64>, Quad),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Quad {
    /// Creates a new quad with the given `centre` and `half_width`.
    pub fn new(centre: Vector2<f64>, half_width: f64) -> Self {
        Self { centre, half_width }
    }

    /// Returns `true` if `point` is inside this [`Quad`]
    pub fn contains(&self, point: &Vector2<f64>) -> bool {
        (self.centre[0] - self.half_width) < point[0]
            && (self.centre[0] + self.half_width) > point[0]
            && (self.centre[1] - self.half_width) < point[1]
            && (self.centre[1] + self.half_width) > point[1]
    }

    /// Returns `true` if `other` intersects with this [`Quad`].
    pub fn intersects(&self, other: &Quad) -> bool {
        (self.centre[0] - other.centre[0]).abs() <= self.half_width + other.half_width
            && (self.centre[1] - other.centre[1]).abs() <= self.half_width + other.half_width
    }
}

impl<T: Clone> QuadTree<T> {
    pub fn new(boundary: Quad) -> Self {
        Self {
            boundary,
            entries: Vec::new(),
            north_west: None,
            north_east: None,
            south_west: None,
            south_east: None,
        }
    }

    /// Insert an item at the given point in the QuadTree.
    pub fn insert(&mut self, point: Vector2<f64>, item: T) -> Result<(), QuadTreeError> {
        // Check if it's in the tree
        if !self.boundary.contains(&point) {
            return Err(QuadTreeError::PointNotInBounds(point, self.boundary));
        }

        // If there's a space in the tree and it's not been divided add it to the entry list
        if self.entries.len() < CAPACITY && self.north_west.is_none() {
            self.entries.push((point, item));
            return Ok(());
        }

        // Otherwise subdivide if needed
        if self.north_west.is_none() {
            self.subdivide();
        }

        // And add the entry to the first quad it will fit into
        if let Some(ref mut qt) = self.north_west {
            if qt.insert(point, item.clone()).is_ok() {
                return Ok(());
            }
        }
        if let Some(ref mut qt) = self.north_east {
            if qt.insert(point, item.clone()).is_ok() {
                return Ok(());
            }
        }
        if let Some(ref mut qt) = self.south_west {
            if qt.insert(point, item.clone()).is_ok() {
                return Ok(());
            }
        }
        if let Some(ref mut qt) = self.south_east {
            if qt.insert(point, item.clone()).is_ok() {
                return Ok(());
            }
        }

        // Points on the shared boundary of all children fall through, keep them here
        self.entries.push((point, item));
        Ok(())
    }

    /// Return a list of all items whose points lie within the given quad.
    pub fn query_in_quad(&self, quad: &Quad) -> Vec<T> {
        // Create items list
        let mut items = Vec::new();

        // Check that quad is in the tree, if not return an empty list
        if !self.boundary.intersects(quad) {
            return items;
        }

        // Check self for the entries
        for (point, item) in self.entries.iter() {
            if quad.contains(point) {
                items.push(item.clone())
            }
        }

        // If the tree has no children exit now
        if self.north_west.is_none() {
            return items;
        }

        // Otherwise search the children
        match self.north_west {
            Some(ref qt) => items.extend(qt.query_in_quad(quad)),
            None => unreachable!(),
        }
        match self.north_east {
            Some(ref qt) => items.extend(qt.query_in_quad(quad)),
            None => unreachable!(),
        }
        match self.south_west {
            Some(ref qt) => items.extend(qt.query_in_quad(quad)),
            None => unreachable!(),
        }
        match self.south_east {
            Some(ref qt) => items.extend(qt.query_in_quad(quad)),
            None => unreachable!(),
        }

        items
    }

    fn subdivide(&mut self) {
        let hw = self.boundary.half_width / 2.0;

        self.north_west = Some(Box::new(QuadTree::new(Quad::new(
            self.boundary.centre + Vector2::new(-hw, hw),
            hw,
        ))));
        self.north_east = Some(Box::new(QuadTree::new(Quad::new(
            self.boundary.centre + Vector2::new(hw, hw),
            hw,
        ))));
        self.south_west = Some(Box::new(QuadTree::new(Quad::new(
            self.boundary.centre + Vector2::new(-hw, -hw),
            hw,
        ))));
        self.south_east = Some(Box::new(QuadTree::new(Quad::new(
            self.boundary.centre + Vector2::new(hw, -hw),
            hw,
        ))));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut qt: QuadTree<usize> = QuadTree::new(Quad::new(Vector2::new(0.0, 0.0), 100.0));

        for i in 0..20usize {
            let x = -90.0 + 9.0 * i as f64;
            qt.insert(Vector2::new(x, x / 2.0), i).unwrap();
        }

        // Query a window covering the negative-x half
        let items = qt.query_in_quad(&Quad::new(Vector2::new(-50.0, -25.0), 50.0));
        assert!(!items.is_empty());
        for i in items {
            let x = -90.0 + 9.0 * i as f64;
            assert!(x < 0.0);
        }

        // Out of bounds insert fails
        assert!(qt.insert(Vector2::new(200.0, 0.0), 99).is_err());
    }
}
