pub mod builder;
pub mod descriptor;
pub mod media;

pub use builder::build_descriptor;
pub use descriptor::{
    ActionBinding, ActionRegion, DismissRegion, MediaContent, MediaRegion, OverlayRegion,
    RegionName, RenderDescriptor, TextRegion,
};
pub use media::has_video_extension;
