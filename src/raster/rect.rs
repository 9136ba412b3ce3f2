//! Inclusive integer rectangles in raster line/sample space.

/// An axis-aligned rectangle of pixels with inclusive corners.
///
/// `x` runs along samples and `y` along lines. A rectangle whose lower
/// right corner is above or left of its upper left corner is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub ul_x: i64,
    pub ul_y: i64,
    pub lr_x: i64,
    pub lr_y: i64,
}

impl Rect {
    pub fn new(ul_x: i64, ul_y: i64, lr_x: i64, lr_y: i64) -> Self {
        Self {
            ul_x,
            ul_y,
            lr_x,
            lr_y,
        }
    }

    /// The `width` by `height` rectangle starting at `(x, y)`.
    pub fn from_origin_size(x: i64, y: i64, width: usize, height: usize) -> Self {
        Self::new(x, y, x + width as i64 - 1, y + height as i64 - 1)
    }

    pub fn width(&self) -> usize {
        (self.lr_x - self.ul_x + 1).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.lr_y - self.ul_y + 1).max(0) as usize
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.ul_x && x <= self.lr_x && y >= self.ul_y && y <= self.lr_y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.ul_x <= other.lr_x
            && other.ul_x <= self.lr_x
            && self.ul_y <= other.lr_y
            && other.ul_y <= self.lr_y
    }

    /// The part of `self` inside `bounds`, or `None` if they do not overlap.
    pub fn clip_to(&self, bounds: &Rect) -> Option<Rect> {
        if !self.intersects(bounds) {
            return None;
        }
        Some(Rect::new(
            self.ul_x.max(bounds.ul_x),
            self.ul_y.max(bounds.ul_y),
            self.lr_x.min(bounds.lr_x),
            self.lr_y.min(bounds.lr_y),
        ))
    }

    /// Whether every pixel of `self` is inside `other`.
    pub fn completely_within(&self, other: &Rect) -> bool {
        !self.is_empty()
            && self.ul_x >= other.ul_x
            && self.lr_x <= other.lr_x
            && self.ul_y >= other.ul_y
            && self.lr_y <= other.lr_y
    }

    pub fn translate(&self, dx: i64, dy: i64) -> Rect {
        Rect::new(self.ul_x + dx, self.ul_y + dy, self.lr_x + dx, self.lr_y + dy)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_size() {
        let r = Rect::new(4, 4, 11, 11);
        assert_eq!((r.width(), r.height(), r.area()), (8, 8, 64));
        assert_eq!(Rect::from_origin_size(4, 4, 8, 8), r);
        assert!(Rect::new(3, 0, 2, 5).is_empty());
    }

    #[test]
    fn test_clip() {
        let image = Rect::new(0, 0, 15, 15);
        assert_eq!(
            Rect::new(-3, 10, 4, 20).clip_to(&image),
            Some(Rect::new(0, 10, 4, 15))
        );
        assert_eq!(Rect::new(16, 0, 20, 3).clip_to(&image), None);
        assert_eq!(Rect::new(-5, -5, -1, -1).clip_to(&image), None);
    }

    #[test]
    fn test_within() {
        let buffer = Rect::new(0, 0, 63, 63);
        assert!(Rect::new(0, 0, 63, 63).completely_within(&buffer));
        assert!(Rect::new(10, 20, 30, 40).completely_within(&buffer));
        assert!(!Rect::new(10, 20, 30, 64).completely_within(&buffer));
        assert!(Rect::new(5, 5, 6, 6).translate(-5, 2).contains(0, 7));
    }
}
