pub mod identity;
pub mod model;
pub mod resolver;

pub use identity::PopupIdentity;
pub use model::{
    CallToAction, ContentBlock, CtaAction, DeviceVisibility, DismissalPolicy, FrequencyPolicy,
    LayoutPosition, MediaBlock, MediaKind, PopupConfig, ScheduleWindow, TriggerMode,
};
pub use resolver::{parse_frequency, parse_instant, resolve_config, ResolverOptions};
