pub mod polygon;
pub mod scaling;
pub mod shapes;

pub use polygon::{
    bearing_degrees, distance, heading_vector, nearest_vertex, normalize, normalize_degrees,
    point_in_polygon, signed_degrees,
};
pub use scaling::{Bounds, Scaler};
pub use shapes::{closed_polygon, oriented_rect, ring};
