mod bbox;
mod buffer;
mod proj;
mod repair;

pub(crate) use bbox::{intersecting, BoundingBox};
pub use buffer::Buffer;
pub use proj::{ProjectionStrategy, Projector};
pub(crate) use repair::{repair, ring_polygon};
