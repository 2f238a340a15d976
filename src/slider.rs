//! Speed slider bound to an animation container.
//!
//! A slider names its animator by container id (`data-animation-container`).
//! Animators register themselves in an [`AnimatorRegistry`] under that id, so
//! the slider never reaches into the DOM for a back-reference.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::effect::{Effect, Effects, TimerKind, TimerTarget, TimerToken};
use crate::hook::{DataAttributes, Hook};
use crate::parser;

/// Element id of the speed read-out next to the slider.
pub const SPEED_DISPLAY_ID: &str = "speed-display";

/// Live animators keyed by container id.
///
/// Entries are held weakly; a dropped animator simply stops resolving.
#[derive(Debug)]
pub struct AnimatorRegistry<T> {
    entries: RefCell<BTreeMap<String, Weak<T>>>,
}

impl<T> Default for AnimatorRegistry<T> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
        }
    }
}

impl<T> AnimatorRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: impl Into<String>, animator: &Rc<T>) {
        self.entries.borrow_mut().insert(id.into(), Rc::downgrade(animator));
    }

    /// Remove `id` if it still points at `animator`.
    pub fn unregister(&self, id: &str, animator: &Rc<T>) {
        let mut entries = self.entries.borrow_mut();
        if entries.get(id).is_some_and(|weak| weak.ptr_eq(&Rc::downgrade(animator))) {
            entries.remove(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Rc<T>> {
        let mut entries = self.entries.borrow_mut();
        let animator = entries.get(id)?.upgrade();
        if animator.is_none() {
            entries.remove(id);
        }
        animator
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// A slider's binding to the animator it drives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpeedSlider {
    target: Option<String>,
    attached: bool,
}

impl SpeedSlider {
    pub fn new(target: Option<String>) -> Self {
        Self {
            target: target.filter(|id| !id.trim().is_empty()),
            attached: false,
        }
    }

    /// Read the `animation-container` attribute.
    pub fn from_attributes(attrs: &DataAttributes) -> Self {
        Self::new(attrs.get("animation-container").map(str::to_string))
    }

    #[inline]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The animator this slider drives, if it is mounted.
    pub fn resolve<T>(&self, registry: &AnimatorRegistry<T>) -> Option<Rc<T>> {
        let target = self.target()?;
        let animator = registry.get(target);
        if animator.is_none() {
            debug!(target, "speed slider target not mounted");
        }
        animator
    }

    /// Parse a slider value into a speed in milliseconds.
    pub fn parse_value(raw: &str) -> Option<u64> {
        parser::parse_speed(raw)
    }

    /// Text for the speed read-out.
    ///
    /// ```rust
    /// use flipbook_core_view::SpeedSlider;
    ///
    /// assert_eq!(SpeedSlider::display_text(250), "250ms");
    /// ```
    pub fn display_text(speed_ms: u64) -> String {
        format!("{speed_ms}ms")
    }
}

impl TimerTarget for SpeedSlider {
    fn on_timer(&mut self, _kind: TimerKind, _token: TimerToken) -> Effects {
        Effects::new()
    }
}

impl Hook for SpeedSlider {
    fn on_attach(&mut self, attrs: &DataAttributes) -> Effects {
        *self = Self::from_attributes(attrs);
        self.attached = true;
        Effects::new()
    }

    fn on_data_change(&mut self, attrs: &DataAttributes) -> Effects {
        self.target = Self::from_attributes(attrs).target;
        Effects::new()
    }

    fn on_detach(&mut self) -> Effects {
        if !std::mem::take(&mut self.attached) {
            return Effects::new();
        }
        vec![Effect::DetachListeners]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnimationPlayer, Hook};

    fn attrs(target: &str) -> DataAttributes {
        DataAttributes::from_pairs([("animation-container", target)])
    }

    #[test]
    fn test_resolves_registered_animator() {
        let registry = AnimatorRegistry::new();
        let animator = Rc::new(RefCell::new(AnimationPlayer::default()));
        registry.register("animation-container-7", &animator);

        let slider = SpeedSlider::from_attributes(&attrs("animation-container-7"));
        let resolved = slider.resolve(&registry).unwrap();
        assert!(Rc::ptr_eq(&resolved, &animator));

        resolved.borrow_mut().set_speed(400);
        assert_eq!(animator.borrow().speed_ms(), 400);
    }

    #[test]
    fn test_unknown_or_missing_target() {
        let registry: AnimatorRegistry<()> = AnimatorRegistry::new();
        registry.register("a", &Rc::new(()));

        assert!(SpeedSlider::from_attributes(&attrs("b")).resolve(&registry).is_none());
        assert!(SpeedSlider::from_attributes(&attrs("  ")).target().is_none());
        assert!(SpeedSlider::from_attributes(&DataAttributes::new()).resolve(&registry).is_none());
    }

    #[test]
    fn test_dropped_animator_stops_resolving() {
        let registry = AnimatorRegistry::new();
        let animator = Rc::new(RefCell::new(AnimationPlayer::default()));
        registry.register("c", &animator);
        drop(animator);

        assert!(SpeedSlider::new(Some("c".into())).resolve(&registry).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_keeps_replacement() {
        let registry = AnimatorRegistry::new();
        let old = Rc::new(1);
        let new = Rc::new(2);
        registry.register("c", &old);
        registry.register("c", &new);
        registry.unregister("c", &old);
        assert_eq!(registry.get("c").as_deref(), Some(&2));

        registry.unregister("c", &new);
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_value_and_display() {
        assert_eq!(SpeedSlider::parse_value(" 320 "), Some(320));
        assert_eq!(SpeedSlider::parse_value("0"), None);
        assert_eq!(SpeedSlider::parse_value("fast"), None);
        assert_eq!(SpeedSlider::display_text(320), "320ms");
    }

    #[test]
    fn test_hook_lifecycle_follows_attribute() {
        let mut slider = SpeedSlider::default();
        assert!(slider.on_attach(&attrs("a")).is_empty());
        assert_eq!(slider.target(), Some("a"));

        slider.on_data_change(&attrs("b"));
        assert_eq!(slider.target(), Some("b"));

        assert_eq!(slider.on_detach(), vec![Effect::DetachListeners]);
        assert!(slider.on_detach().is_empty());
    }

    #[test]
    fn test_detached_animator_still_accepts_speed() {
        let registry = AnimatorRegistry::new();
        let animator = Rc::new(RefCell::new(AnimationPlayer::default()));
        registry.register("d", &animator);
        let _ = animator.borrow_mut().on_detach();

        let slider = SpeedSlider::new(Some("d".into()));
        if let Some(target) = slider.resolve(&registry) {
            target.borrow_mut().set_speed(90);
        }
        assert_eq!(animator.borrow().speed_ms(), 90);
    }
}
