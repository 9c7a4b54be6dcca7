//! Version resolution.
//!
//! [`VersionComputer`] applies increments, [`RecommendationEngine`] derives
//! an increment from commit history, and [`VersionResolver`] combines the
//! latest known version with either of them into a [`VersionDecision`]. The
//! orchestrator composes the three.

mod computer;
mod recommend;
mod resolver;

pub use computer::{Increment, VersionComputer};
pub use recommend::{ChangeLevel, RecommendationEngine};
pub use resolver::{
    ChangelogTiming, IncrementSpec, LatestVersionSources, PreReleaseRequest, ResolverState,
    VersionDecision, VersionResolver,
};
