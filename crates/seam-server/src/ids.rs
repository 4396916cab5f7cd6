//! Identifier newtypes for the server object graph.
//!
//! Back references (pane→window, window→session) are ids resolved through
//! the server maps, never owning pointers: a pane can never outlive its
//! window because only the window's id list keeps it reachable.

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

id_type!(
    /// A session. Displayed as `$0`, `$1`, ...
    SessionId,
    "$"
);
id_type!(
    /// A window. Displayed as `@0`, `@1`, ...
    WindowId,
    "@"
);
id_type!(
    /// A pane. Displayed as `%0`, `%1`, ... (also exported to children
    /// as `SEAM_PANE`).
    PaneId,
    "%"
);
id_type!(
    /// A connected client.
    ClientId,
    "#"
);

/// Monotonic id allocator, one per id space.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Hand out the next id.
    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to [`next`](Self::next) would return.
    #[must_use]
    pub fn peek(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes() {
        assert_eq!(SessionId(3).to_string(), "$3");
        assert_eq!(WindowId(0).to_string(), "@0");
        assert_eq!(PaneId(7).to_string(), "%7");
    }

    #[test]
    fn allocator_is_monotonic() {
        let mut alloc = IdAllocator::default();
        assert_eq!(alloc.next(), 0);
        assert_eq!(alloc.next(), 1);
        assert_eq!(alloc.next(), 2);
    }
}
