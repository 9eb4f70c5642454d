//! Minimal behavior-tree primitives for turn-based decision making.
//!
//! Every node completes within a single tick: conditions evaluate
//! immediately and actions execute atomically, so there is no `Running`
//! state.

/// The result of evaluating a behavior node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
        }
    }
}

impl From<bool> for Status {
    fn from(ok: bool) -> Self {
        if ok { Status::Success } else { Status::Failure }
    }
}

/// A behavior tree node evaluated against a context `C`.
pub trait Behavior<C>: Send + Sync {
    fn tick(&self, ctx: &mut C) -> Status;
}

impl<C> Behavior<C> for Box<dyn Behavior<C>> {
    #[inline]
    fn tick(&self, ctx: &mut C) -> Status {
        (**self).tick(ctx)
    }
}

/// Runs children left to right until one fails (logical AND).
pub struct Sequence<C> {
    children: Vec<Box<dyn Behavior<C>>>,
}

impl<C> Sequence<C> {
    /// # Panics
    ///
    /// Panics if `children` is empty.
    pub fn new(children: Vec<Box<dyn Behavior<C>>>) -> Self {
        assert!(
            !children.is_empty(),
            "Sequence must have at least one child"
        );
        Self { children }
    }
}

impl<C> Behavior<C> for Sequence<C> {
    fn tick(&self, ctx: &mut C) -> Status {
        for child in &self.children {
            if child.tick(ctx).is_failure() {
                return Status::Failure;
            }
        }
        Status::Success
    }
}

/// Runs children left to right until one succeeds (logical OR).
pub struct Selector<C> {
    children: Vec<Box<dyn Behavior<C>>>,
}

impl<C> Selector<C> {
    /// # Panics
    ///
    /// Panics if `children` is empty.
    pub fn new(children: Vec<Box<dyn Behavior<C>>>) -> Self {
        assert!(
            !children.is_empty(),
            "Selector must have at least one child"
        );
        Self { children }
    }
}

impl<C> Behavior<C> for Selector<C> {
    fn tick(&self, ctx: &mut C) -> Status {
        for child in &self.children {
            if child.tick(ctx).is_success() {
                return Status::Success;
            }
        }
        Status::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Push(u32, Status);

    impl Behavior<Vec<u32>> for Push {
        fn tick(&self, ctx: &mut Vec<u32>) -> Status {
            ctx.push(self.0);
            self.1
        }
    }

    fn push(id: u32, status: Status) -> Box<dyn Behavior<Vec<u32>>> {
        Box::new(Push(id, status))
    }

    #[test]
    fn selector_stops_at_first_success() {
        let tree = Selector::new(vec![
            push(1, Status::Failure),
            push(2, Status::Success),
            push(3, Status::Success),
        ]);
        let mut trace = Vec::new();
        assert_eq!(tree.tick(&mut trace), Status::Success);
        assert_eq!(trace, vec![1, 2]);
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let tree = Sequence::new(vec![
            push(1, Status::Success),
            push(2, Status::Failure),
            push(3, Status::Success),
        ]);
        let mut trace = Vec::new();
        assert_eq!(tree.tick(&mut trace), Status::Failure);
        assert_eq!(trace, vec![1, 2]);
    }

    #[test]
    fn selector_of_failures_fails() {
        let tree = Selector::new(vec![push(1, Status::Failure), push(2, Status::Failure)]);
        let mut trace = Vec::new();
        assert!(tree.tick(&mut trace).is_failure());
        assert_eq!(Status::Failure.invert(), Status::Success);
    }

    #[test]
    #[should_panic(expected = "at least one child")]
    fn empty_selector_panics() {
        let _ = Selector::<Vec<u32>>::new(Vec::new());
    }
}
