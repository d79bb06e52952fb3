//! Marker components
//!
//! Zero-sized tags whose presence alone carries meaning.

use crate::ecs::Component;

/// Present only while the entity is held by the mouse picker
///
/// Added by a successful pick and removed on release; at most one entity carries it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickedTag;

impl Component for PickedTag {}

/// Entity whose emissive screen is driven by the display animator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrtDisplay;

impl Component for CrtDisplay {}
