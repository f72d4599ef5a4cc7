pub mod convert_color;
pub mod threshold;

pub use convert_color::rgb_to_hsv;
pub use threshold::in_range;
