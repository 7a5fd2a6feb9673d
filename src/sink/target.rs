//! Placement of new surfaces
//!
//! Applications name the place a new sink goes either by a container
//! reference they already hold or by an identifier string the platform
//! resolves. The [`InsertMode`] says how the surface is placed relative to
//! that container.

use std::fmt;

/// Opaque reference to a platform container (layout node, window, view)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerRef(u64);

impl ContainerRef {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Where to place a newly created sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetElement {
    /// A container the caller already holds
    Container(ContainerRef),
    /// An identifier the platform resolves to a container
    Id(String),
}

impl fmt::Display for TargetElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetElement::Container(container) => write!(f, "{}", container),
            TargetElement::Id(id) => write!(f, "#{}", id),
        }
    }
}

impl From<ContainerRef> for TargetElement {
    fn from(container: ContainerRef) -> Self {
        TargetElement::Container(container)
    }
}

impl From<&str> for TargetElement {
    fn from(id: &str) -> Self {
        TargetElement::Id(id.to_string())
    }
}

impl From<String> for TargetElement {
    fn from(id: String) -> Self {
        TargetElement::Id(id)
    }
}

/// How a new sink is placed relative to its target container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Last child of the target
    #[default]
    Append,
    /// First child of the target
    Prepend,
    /// Takes the target's place
    Replace,
    /// Sibling immediately before the target
    Before,
    /// Sibling immediately after the target
    After,
}

impl InsertMode {
    /// Whether the mode places the sink next to the target rather than inside it
    pub fn needs_parent(&self) -> bool {
        matches!(self, InsertMode::Replace | InsertMode::Before | InsertMode::After)
    }
}

/// Baseline playback properties applied to every bound sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackProps {
    pub autoplay: bool,
    pub controls: bool,
    pub plays_inline: bool,
    /// Local streams are muted to avoid hearing yourself
    pub muted: bool,
}

impl PlaybackProps {
    /// Properties for a stream of the given origin
    pub fn for_stream(is_local: bool) -> Self {
        Self {
            autoplay: true,
            controls: false,
            plays_inline: true,
            muted: is_local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        assert_eq!(TargetElement::from("grid"), TargetElement::Id("grid".into()));
        assert_eq!(TargetElement::from("grid").to_string(), "#grid");
    }

    #[test]
    fn test_insert_mode_default() {
        assert_eq!(InsertMode::default(), InsertMode::Append);
        assert!(!InsertMode::Prepend.needs_parent());
        assert!(InsertMode::After.needs_parent());
    }

    #[test]
    fn test_playback_props_mute_local_only() {
        assert!(PlaybackProps::for_stream(true).muted);
        assert!(!PlaybackProps::for_stream(false).muted);
        assert!(PlaybackProps::for_stream(false).autoplay);
    }
}
