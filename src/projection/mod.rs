pub mod rotated_pole;

pub use rotated_pole::{GeoBounds, LatLonMesh, RotatedPole};
