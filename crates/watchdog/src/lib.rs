pub mod decision;
pub mod probe;

pub use decision::{evaluate, Liveness, LivenessObservation};
pub use probe::LivenessProbe;
