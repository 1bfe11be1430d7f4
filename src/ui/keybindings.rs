// Keybindings for the gallery window
//
// Keybindings:
// - Left / h: Previous image
// - Right / l / Space: Next image
// - Escape / BackSpace: Back one screen

use gdk4::Key;
use gtk4::prelude::*;
use gtk4::{EventControllerKey, PropagationPhase, Widget};
use std::cell::RefCell;
use std::rc::Rc;

use albumview::NavAction;

/// Handler for a navigation action; returns whether the key was consumed
pub type ActionCallback = Box<dyn Fn(NavAction) -> bool>;

/// Map a key to the navigation action it triggers
pub fn action_for_key(keyval: Key) -> Option<NavAction> {
    match keyval {
        Key::Left | Key::h => Some(NavAction::Previous),
        Key::Right | Key::l | Key::space => Some(NavAction::Next),
        Key::Escape | Key::BackSpace => Some(NavAction::Back),
        _ => None,
    }
}

/// Window-level key controller that turns key presses into navigation actions
pub struct Keybindings {
    controller: EventControllerKey,
    on_action: Rc<RefCell<Option<ActionCallback>>>,
}

impl Keybindings {
    pub fn new() -> Self {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);

        let on_action: Rc<RefCell<Option<ActionCallback>>> = Rc::new(RefCell::new(None));

        let on_action_clone = on_action.clone();
        controller.connect_key_pressed(move |_controller, keyval, _keycode, _state| {
            let handled = match action_for_key(keyval) {
                Some(action) => on_action_clone
                    .borrow()
                    .as_ref()
                    .map(|cb| cb(action))
                    .unwrap_or(false),
                None => false,
            };

            if handled {
                glib::Propagation::Stop
            } else {
                glib::Propagation::Proceed
            }
        });

        Self {
            controller,
            on_action,
        }
    }

    /// Attach keybindings to a widget (typically the main window)
    pub fn attach(&self, widget: &impl IsA<Widget>) {
        widget.add_controller(self.controller.clone());
    }

    /// Set the action handler
    pub fn connect_action<F>(&self, f: F)
    where
        F: Fn(NavAction) -> bool + 'static,
    {
        *self.on_action.borrow_mut() = Some(Box::new(f));
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::new()
    }
}
