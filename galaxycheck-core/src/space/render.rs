//! Example space rendering for debugging and visualization.
//!
//! Spaces can be infinite, so every renderer takes a depth bound.

use super::ExampleSpace;
use std::fmt::Display;

impl<T> ExampleSpace<T>
where
    T: Display + Clone + 'static,
{
    /// Render the space as a tree down to `max_depth`.
    pub fn render(&self, max_depth: usize) -> String {
        let mut result = String::new();
        self.render_recursive(&mut result, "", true, max_depth);
        result
    }

    fn render_recursive(&self, result: &mut String, prefix: &str, is_last: bool, depth: usize) {
        result.push_str(prefix);
        if is_last {
            result.push_str("└── ");
        } else {
            result.push_str("├── ");
        }
        result.push_str(&format!("{}\n", self.current));

        if depth == 0 {
            return;
        }

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        let children: Vec<ExampleSpace<T>> = self.subspace().collect();
        for (i, child) in children.iter().enumerate() {
            let child_is_last = i == children.len() - 1;
            child.render_recursive(result, &child_prefix, child_is_last, depth - 1);
        }
    }

    /// Render the space compactly, showing only values.
    pub fn render_compact(&self, max_depth: usize) -> String {
        let value = &self.current.value;
        if max_depth == 0 {
            return format!("{value}");
        }
        let children: Vec<String> = self
            .subspace()
            .map(|child| child.render_compact(max_depth - 1))
            .collect();
        if children.is_empty() {
            format!("{value}")
        } else {
            format!("{value}[{}]", children.join(", "))
        }
    }

    /// Render the immediate shrinks of the current value.
    pub fn render_shrinks(&self) -> String {
        let shrinks: Vec<String> = self
            .subspace()
            .map(|child| format!("{}", child.current.value))
            .collect();
        if shrinks.is_empty() {
            format!("{} (no shrinks)", self.current.value)
        } else {
            format!("{} → [{}]", self.current.value, shrinks.join(", "))
        }
    }
}
