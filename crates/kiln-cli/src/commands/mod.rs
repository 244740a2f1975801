mod build;
mod dump;
mod fill_template;
mod replicate;
mod structure;

pub use build::{build, push};
pub use dump::dump_latest_versions;
pub use fill_template::fill_template;
pub use replicate::copy_images_hierarchy;
pub use structure::show_structure;
