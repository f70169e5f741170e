//! Reference record readers for the on-disk layouts the CLI supports.
//!
//! Each reader is a plain `fn(&Path) -> StoreResult<T>` and therefore a
//! [`RecordParser`](crate::storage::RecordParser) on its own.

mod calib;
mod camera;
mod label;
mod point_cloud;

pub use calib::read_calibration;
pub use camera::read_image;
pub use label::{label_parser, read_sustechpoints_labels};
pub use point_cloud::read_point_cloud;

#[cfg(test)]
pub(crate) use calib::SAMPLE as CALIB_SAMPLE;
#[cfg(test)]
pub(crate) use point_cloud::encode_points;
