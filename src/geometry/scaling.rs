/// Bounding box in authoring coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create bounds from a set of points
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;

        for &(x, y) in points {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        Some(Self {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Expand bounds to include another set of points
    pub fn expand(&mut self, points: &[(f64, f64)]) {
        for &(x, y) in points {
            self.min_x = self.min_x.min(x);
            self.max_x = self.max_x.max(x);
            self.min_y = self.min_y.min(y);
            self.max_y = self.max_y.max(y);
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Maps authoring coordinates onto a simulation viewport.
///
/// Uniform scale `min(width / dx, height / dy) * scale_factor`, with the
/// minimum corner of the source bounds landing on the origin.
#[derive(Debug, Clone)]
pub struct Scaler {
    /// Viewport units per authoring unit
    scale: f64,
    min_x: f64,
    min_y: f64,
}

impl Scaler {
    /// Create a scaler that fits `bounds` into a `width` x `height` viewport
    ///
    /// # Arguments
    /// * `bounds` - Source bounding box
    /// * `width`, `height` - Viewport size
    /// * `scale_factor` - Fraction of the viewport to fill (e.g. 0.9)
    pub fn fit(bounds: &Bounds, width: f64, height: f64, scale_factor: f64) -> Self {
        let scale_x = if bounds.width() > 0.0 {
            width / bounds.width()
        } else {
            f64::INFINITY
        };
        let scale_y = if bounds.height() > 0.0 {
            height / bounds.height()
        } else {
            f64::INFINITY
        };

        let scale = scale_x.min(scale_y);
        let scale = if scale.is_finite() {
            scale * scale_factor
        } else {
            1.0
        };

        Self {
            scale,
            min_x: bounds.min_x,
            min_y: bounds.min_y,
        }
    }

    /// Scale a single point into the viewport
    pub fn scale(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.min_x) * self.scale, (y - self.min_y) * self.scale)
    }

    /// Scale a slice of points
    pub fn scale_points(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points.iter().map(|&(x, y)| self.scale(x, y)).collect()
    }
}
