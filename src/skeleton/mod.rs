pub mod profile;
pub mod resolver;

pub use profile::{ArmBoneNames, Axis, Convention, Handedness, JointRole, Side, SkeletonProfile};
pub use resolver::ProfileRegistry;
