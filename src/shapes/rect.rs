use super::point::PointF32;

/// Corner form bounding box, as the detector reports it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> BBox {
        BBox { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> PointF32 {
        PointF32 {
            x: (self.x1 + self.x2) / 2.,
            y: (self.y1 + self.y2) / 2.,
        }
    }

    pub fn scale(&mut self, factor: f32) -> BBox {
        self.x1 *= factor;
        self.y1 *= factor;
        self.x2 *= factor;
        self.y2 *= factor;

        *self
    }

    /// Intersection over union, 0..=1
    pub fn iou(&self, other: &BBox) -> f32 {
        let x_min = self.x1.max(other.x1);
        let x_max = self.x2.min(other.x2);
        let y_min = self.y1.max(other.y1);
        let y_max = self.y2.min(other.y2);

        let overlap_area = if x_min < x_max && y_min < y_max {
            (x_max - x_min) * (y_max - y_min)
        } else {
            0.
        };

        let union = self.area() + other.area() - overlap_area;

        if union > 0. {
            overlap_area / union
        } else {
            0.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area() {
        assert_eq!(BBox::new(0., 0., 10., 10.).area(), 100.);
        assert_eq!(BBox::new(5., 5., 25., 25.).area(), 400.);
    }

    #[test]
    fn test_iou() {
        let a = BBox::new(0., 0., 10., 10.);
        let b = BBox::new(5., 0., 15., 10.);
        assert!((a.iou(&b) - 50. / 150.).abs() < 1e-6);
        assert_eq!(a.iou(&a), 1.);
        assert_eq!(a.iou(&BBox::new(20., 20., 30., 30.)), 0.);
    }

    #[test]
    fn test_scale() {
        let mut b = BBox::new(1., 2., 3., 4.);
        assert_eq!(b.scale(2.), BBox::new(2., 4., 6., 8.));
        assert_eq!(b.center(), PointF32 { x: 4., y: 6. });
    }
}
