//! Axis-aligned boxes for detections, masks and crops

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip region to image boundaries
    pub fn clip_to(mut self, image_width: u32, image_height: u32) -> Self {
        self.x = self.x.min(image_width);
        self.y = self.y.min(image_height);
        self.width = self.width.min(image_width - self.x);
        self.height = self.height.min(image_height - self.y);
        self
    }

    /// Center point, rounded toward the top-left
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Check if a point lies strictly inside this region (edges excluded)
    pub fn contains_point_strict(&self, x: u32, y: u32) -> bool {
        self.x < x && x < self.x + self.width && self.y < y && y < self.y + self.height
    }

    /// Check if this region is valid (non-zero dimensions)
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_rounds_down() {
        let region = Region::new(10, 20, 5, 7);
        assert_eq!(region.center(), (12, 23));
    }

    #[test]
    fn test_strict_containment_excludes_edges() {
        let region = Region::new(10, 10, 10, 10);
        assert!(region.contains_point_strict(15, 15));
        assert!(!region.contains_point_strict(10, 15));
        assert!(!region.contains_point_strict(15, 20));
        assert!(region.contains_point_strict(19, 11));
    }

    #[test]
    fn test_clip_to_image_bounds() {
        let region = Region::new(1000, 2200, 200, 200).clip_to(1080, 2280);
        assert_eq!(region, Region::new(1000, 2200, 80, 80));
        assert!(region.is_valid());

        let outside = Region::new(2000, 10, 50, 50).clip_to(1080, 2280);
        assert!(!outside.is_valid());
    }
}
