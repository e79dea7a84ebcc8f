//! Output writers - emit the syntax tree as CoffeeScript.

pub mod coffee;
pub mod state;

pub use coffee::{CoffeeWriter, RenderOptions, Rendered, render, render_with};
pub use state::{RenderState, Scope, ScopeKind};
