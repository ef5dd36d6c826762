use crate::action::{Action, MethodAction, ViewAction};
use crate::registry::Registry;
use crate::types::ViewType;
use std::borrow::Cow;

/// Pseudo-action that pauses a run until the client has saved the record.
pub const SAVE: &str = "save";

/// Build an action from `type:target` or `controller:method` shorthand.
/// Returns `None` when `name` has no colon.
pub fn inline(name: &str) -> Option<Action> {
    let (left, right) = name.split_once(':')?;
    let action = match left.parse::<ViewType>() {
        Ok(view_type) => Action::View(ViewAction::single(view_type, right)),
        Err(_) => Action::Method(MethodAction::new(left, right)),
    };
    Some(action)
}

/// Turn a reference into an executable action: inline shorthand first,
/// then a registry lookup. Empty names never resolve.
pub fn resolve<'r>(registry: &'r Registry, name: &str) -> Option<Cow<'r, Action>> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if let Some(action) = inline(name) {
        return Some(Cow::Owned(action));
    }
    registry.get(name).map(Cow::Borrowed)
}
