//! Mutable state of one render pass.

/// Kind of an enclosing definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Class,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    /// Parameter rendered as `@`: a method's first parameter, or `self`
    /// in a function outside a class body.
    pub receiver: Option<String>,
}

impl Scope {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ScopeKind::Class,
            receiver: None,
        }
    }

    pub fn function(name: impl Into<String>, receiver: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: ScopeKind::Function,
            receiver,
        }
    }
}

/// Indent level and enclosing definitions.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub indent_level: usize,
    scopes: Vec<Scope>,
}

impl RenderState {
    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    /// Whether the innermost scope is a class body.
    pub fn in_class(&self) -> bool {
        matches!(self.scopes.last(), Some(scope) if scope.kind == ScopeKind::Class)
    }

    /// Receiver visible from here: the nearest method's, looking through
    /// nested functions but not through a class.
    pub fn receiver(&self) -> Option<&str> {
        for scope in self.scopes.iter().rev() {
            match scope.kind {
                ScopeKind::Class => return None,
                ScopeKind::Function => {
                    if let Some(receiver) = &scope.receiver {
                        return Some(receiver);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_resolves_through_nested_functions() {
        let mut state = RenderState::default();
        assert_eq!(state.receiver(), None);

        state.push(Scope::class("C"));
        assert!(state.in_class());
        state.push(Scope::function("m", Some("self".into())));
        assert!(!state.in_class());
        state.push(Scope::function("inner", None));
        assert_eq!(state.receiver(), Some("self"));
    }

    #[test]
    fn class_boundary_hides_outer_receiver() {
        let mut state = RenderState::default();
        state.push(Scope::class("Outer"));
        state.push(Scope::function("m", Some("this".into())));
        state.push(Scope::class("Inner"));
        assert_eq!(state.receiver(), None);
        state.push(Scope::function("helper", None));
        assert_eq!(state.receiver(), None);

        state.pop();
        state.pop();
        assert_eq!(state.receiver(), Some("this"));
    }
}
