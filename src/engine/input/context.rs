// Stack of named input contexts

use log::warn;

/// The active context plus the contexts it was pushed over.
///
/// The initial context can never be popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStack {
    current: String,
    stack: Vec<String>,
}

impl ContextStack {
    pub fn new(initial: &str) -> Self {
        Self {
            current: initial.to_string(),
            stack: Vec::new(),
        }
    }

    /// Make `name` current, saving the previous current context
    pub fn push(&mut self, name: &str) {
        let previous = std::mem::replace(&mut self.current, name.to_string());
        self.stack.push(previous);
    }

    /// Restore the previous context. Returns it, or `None` (and leaves the
    /// current context untouched) when nothing was pushed.
    pub fn pop(&mut self) -> Option<&str> {
        match self.stack.pop() {
            Some(previous) => {
                self.current = previous;
                Some(self.current.as_str())
            }
            None => {
                warn!("Context stack is empty, staying in '{}'", self.current);
                None
            }
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Saved contexts, bottom first
    pub fn saved(&self) -> &[String] {
        &self.stack
    }

    /// Number of saved contexts
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drop all saved contexts and make `initial` current
    pub fn reset(&mut self, initial: &str) {
        self.stack.clear();
        self.current = initial.to_string();
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop() {
        let mut stack = ContextStack::default();
        stack.push("menu");
        assert_eq!(stack.current(), "menu");
        assert_eq!(stack.saved().to_vec(), vec!["default".to_string()]);

        assert_eq!(stack.pop(), Some("default"));
        assert_eq!(stack.current(), "default");
    }

    #[test]
    fn test_balanced_pushes_and_pops() {
        let mut stack = ContextStack::default();
        let contexts = ["menu", "inventory", "debug", "menu"];
        for name in contexts {
            stack.push(name);
        }
        assert_eq!(stack.depth(), contexts.len());

        for _ in contexts {
            assert!(stack.pop().is_some());
        }
        assert_eq!(stack.current(), "default");
    }

    #[test]
    fn test_pop_restores_exact_prior_context() {
        let mut stack = ContextStack::default();
        stack.push("menu");
        stack.push("options");
        assert_eq!(stack.pop(), Some("menu"));
        assert_eq!(stack.current(), "menu");
    }

    #[test]
    fn test_pop_empty_is_noop() {
        let mut stack = ContextStack::default();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), "default");

        stack.push("menu");
        stack.pop();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), "default");
    }

    #[test]
    fn test_reset() {
        let mut stack = ContextStack::default();
        stack.push("menu");
        stack.reset("gameplay");
        assert_eq!(stack.current(), "gameplay");
        assert_eq!(stack.depth(), 0);
    }
}
