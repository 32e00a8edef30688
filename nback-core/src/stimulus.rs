/// Bound for stimulus identifiers as the host names them (file names,
/// interned ids, letters). Sequence matching only ever needs equality.
pub trait Stimulus: Clone + PartialEq + Send + Sync + std::fmt::Debug {}

impl<T> Stimulus for T where T: Clone + PartialEq + Send + Sync + std::fmt::Debug {}
