//! Text inputs with an adjacent clear ("x") button, as used by the filter
//! boxes in the sidebars.

use std::fmt;

use tracing::trace;

/// Notifications a [`TextInput`] sends to its listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// The value changed; dependent logic (filtering) should re-run.
    Input { value: String },
    /// The input lost focus.
    Blur,
}

type Listener = Box<dyn FnMut(&InputEvent) + Send>;

/// A single-line text input.
#[derive(Default)]
pub struct TextInput {
    value: String,
    focused: bool,
    listeners: Vec<Listener>,
}

impl fmt::Debug for TextInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextInput")
            .field("value", &self.value)
            .field("focused", &self.focused)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TextInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn on_event(&mut self, listener: impl FnMut(&InputEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Replace the value without notifying listeners.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Simulate the user typing: the value changes and listeners hear about it.
    pub fn type_text(&mut self, text: &str) {
        self.focused = true;
        self.value.push_str(text);
        self.notify_input();
    }

    /// Tell listeners the current value changed.
    pub fn notify_input(&mut self) {
        let event = InputEvent::Input {
            value: self.value.clone(),
        };
        self.emit(&event);
    }

    pub fn blur(&mut self) {
        self.focused = false;
        self.emit(&InputEvent::Blur);
    }

    fn emit(&mut self, event: &InputEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

/// Clear-button behaviour: empty the input, let dependent logic re-run, and
/// drop focus.
pub fn clear_input(input: &mut TextInput) {
    trace!(previous_len = input.value().len(), "clearing filter input");
    input.set_value("");
    input.notify_input();
    input.blur();
}

/// What a click landed on inside a [`FilterInputGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Input,
    ClearButton,
}

/// A filter input and the clear button rendered right after it.
#[derive(Debug, Default)]
pub struct FilterInputGroup {
    pub input: TextInput,
}

impl FilterInputGroup {
    #[must_use]
    pub fn new(input: TextInput) -> Self {
        Self { input }
    }

    pub fn dispatch_click(&mut self, target: ClickTarget) {
        match target {
            ClickTarget::Input => self.input.focus(),
            ClickTarget::ClearButton => clear_input(&mut self.input),
        }
    }
}
