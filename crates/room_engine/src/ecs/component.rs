//! Component trait

/// Marker trait for components
///
/// Components are closed data structs; behavior lives in the systems that read them.
pub trait Component: 'static + Send + Sync {}
