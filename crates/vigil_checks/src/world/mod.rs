//! Block placement and breaking detectors.

pub mod fast_break;
pub mod fast_place;
pub mod nuker;
pub mod scaffold;

pub use fast_break::{FastBreakCheck, FastBreakConfig};
pub use fast_place::{FastPlaceCheck, FastPlaceConfig};
pub use nuker::{NukerCheck, NukerConfig};
pub use scaffold::{ScaffoldCheck, ScaffoldConfig};
