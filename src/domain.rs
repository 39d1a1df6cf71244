//! Coordinate spaces used to address partitioned arrays with logical 1-D/2-D coordinates.
//!
//! A [Domain] linearizes `(i, j)` coordinates in row-major order with `x` varying fastest:
//! `project(i, j) = (i - x.lower) + x.width() * (j - y.lower)`.
//! [Domain::unproject] inverts this using `x.width()` for both the modulo and the
//! division, so rectangular domains (including halo border cells) round-trip.

/// A half-open bound `[lower, upper)` on one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub lower: i64,
    pub upper: i64,
}

impl Range {
    /// Panics if `upper < lower`.
    pub fn new(lower: i64, upper: i64) -> Range {
        assert!(
            upper >= lower,
            "invalid range: upper {:?} < lower {:?}",
            upper,
            lower
        );
        Range { lower, upper }
    }

    /// The range `[0, upper)`
    pub fn upto(upper: i64) -> Range {
        Range::new(0, upper)
    }

    pub fn width(&self) -> usize {
        (self.upper - self.lower) as usize
    }

    pub fn indexof(&self, i: i64) -> i64 {
        i - self.lower
    }

    pub fn contains(&self, i: i64) -> bool {
        self.lower <= i && i < self.upper
    }

    pub fn iter(&self) -> std::ops::Range<i64> {
        self.lower..self.upper
    }
}

impl From<std::ops::Range<i64>> for Range {
    fn from(range: std::ops::Range<i64>) -> Self {
        Range::new(range.start, range.end)
    }
}

/// A pair of [Range]s describing a 2-D block of cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Domain {
    pub x: Range,
    pub y: Range,
}

impl Domain {
    pub fn new(x: Range, y: Range) -> Domain {
        Domain { x, y }
    }

    /// number of cells in the domain
    pub fn size(&self) -> usize {
        self.x.width() * self.y.width()
    }

    pub fn contains(&self, i: i64, j: i64) -> bool {
        self.x.contains(i) && self.y.contains(j)
    }

    /// Linear offset of `(i, j)`.
    ///
    /// Panics if the coordinate lies outside the domain.
    pub fn project(&self, i: i64, j: i64) -> usize {
        assert!(
            self.contains(i, j),
            "coordinate ({:?},{:?}) outside domain {:?}",
            i,
            j,
            self
        );
        (self.x.indexof(i) + self.x.width() as i64 * self.y.indexof(j)) as usize
    }

    /// Coordinate of linear offset `proj`, the inverse of [Domain::project].
    ///
    /// Panics if `proj >= self.size()`.
    pub fn unproject(&self, proj: usize) -> (i64, i64) {
        assert!(
            proj < self.size(),
            "offset {:?} outside domain {:?} of size {:?}",
            proj,
            self,
            self.size()
        );
        let width = self.x.width();
        let i = (proj % width) as i64 + self.x.lower;
        let j = (proj / width) as i64 + self.y.lower;
        (i, j)
    }

    /// The domain shrunk by `amount` cells on every edge.
    pub fn inset(&self, amount: i64) -> Domain {
        Domain {
            x: Range::new(self.x.lower + amount, self.x.upper - amount),
            y: Range::new(self.y.lower + amount, self.y.upper - amount),
        }
    }

    /// Every coordinate of the domain in linear (offset) order
    pub fn cells(&self) -> impl Iterator<Item = (i64, i64)> {
        let domain = *self;
        (0..domain.size()).map(move |p| domain.unproject(p))
    }
}

/// One edge of a 2-D [Domain].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    XLower,
    XUpper,
    YLower,
    YUpper,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::XLower, Edge::XUpper, Edge::YLower, Edge::YUpper];
}

/// A [Domain] that can be grown on selected edges, e.g. to describe the halo
/// surrounding a compute region.
///
/// The subdomain owns its bounds by value; expanding it never affects the domain it was
/// created from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Subdomain {
    domain: Domain,
}

impl Subdomain {
    pub fn new(domain: Domain) -> Subdomain {
        Subdomain { domain }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Grow each of `edges` outward by `amount` cells (a negative amount shrinks),
    /// returning the resulting domain.
    pub fn expand(&mut self, edges: &[Edge], amount: i64) -> Domain {
        let (x, y) = (&mut self.domain.x, &mut self.domain.y);
        for edge in edges {
            match edge {
                Edge::XLower => x.lower -= amount,
                Edge::XUpper => x.upper += amount,
                Edge::YLower => y.lower -= amount,
                Edge::YUpper => y.upper += amount,
            }
        }
        assert!(
            x.upper >= x.lower && y.upper >= y.lower,
            "expanding by {:?} collapses subdomain {:?}",
            amount,
            self.domain
        );
        self.domain
    }
}

impl From<Domain> for Subdomain {
    fn from(domain: Domain) -> Self {
        Subdomain::new(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(domain: Domain) {
        let mut seen = vec![false; domain.size()];
        for i in domain.x.iter() {
            for j in domain.y.iter() {
                let p = domain.project(i, j);
                assert!(!seen[p], "offset {} projected twice", p);
                seen[p] = true;
                assert_eq!((i, j), domain.unproject(p));
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn square_round_trip() {
        round_trip(Domain::new(Range::upto(5), Range::upto(5)));
    }

    #[test]
    fn rectangular_round_trip() {
        round_trip(Domain::new(Range::upto(3), Range::upto(7)));
        round_trip(Domain::new(Range::upto(8), Range::upto(2)));
        round_trip(Domain::new(Range::new(-2, 4), Range::new(3, 6)));
    }

    #[test]
    fn project_is_row_major() {
        let domain = Domain::new(Range::new(1, 4), Range::new(10, 12));
        assert_eq!(0, domain.project(1, 10));
        assert_eq!(2, domain.project(3, 10));
        assert_eq!(3, domain.project(1, 11));
        assert_eq!(6, domain.size());
        let cells: Vec<(i64, i64)> = domain.cells().collect();
        assert_eq!((1, 10), cells[0]);
        assert_eq!((3, 11), cells[5]);
    }

    #[test]
    fn halo_round_trip() {
        let compute = Domain::new(Range::new(1, 4), Range::new(1, 6));
        let grid = Subdomain::new(compute).expand(&Edge::ALL, 1);
        assert_eq!(Domain::new(Range::upto(5), Range::upto(7)), grid);
        assert_eq!(compute, grid.inset(1));
        round_trip(grid);
        // border cells
        assert_eq!((0, 0), grid.unproject(grid.project(0, 0)));
        assert_eq!((4, 6), grid.unproject(grid.project(4, 6)));
    }

    #[test]
    fn expand_selected_edges() {
        let mut sub = Subdomain::new(Domain::new(Range::upto(3), Range::upto(3)));
        let grown = sub.expand(&[Edge::XLower, Edge::YUpper], 2);
        assert_eq!(Domain::new(Range::new(-2, 3), Range::new(0, 5)), grown);
        assert_eq!(grown, sub.domain());
    }

    #[test]
    #[should_panic(expected = "outside domain")]
    fn project_outside_panics() {
        Domain::new(Range::upto(3), Range::upto(3)).project(3, 0);
    }

    #[test]
    #[should_panic(expected = "invalid range")]
    fn inverted_range_panics() {
        Range::new(4, 1);
    }
}
