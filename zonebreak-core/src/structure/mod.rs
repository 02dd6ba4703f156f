//! Support/resistance structure: pivot detection, the bounded pivot history,
//! zone classification and the online tracker that ties them together.

pub mod classifier;
pub mod pivot;
pub mod ring;
pub mod tracker;
pub mod zone;

pub use classifier::{PivotHistory, Signal, StructureAssessment, StructureClassifier, StructureError};
pub use pivot::{Pivot, PivotDetector, PivotKind};
pub use ring::PivotRing;
pub use tracker::StructureTracker;
pub use zone::{Zone, ZoneKind};
