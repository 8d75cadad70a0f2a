//! Ahead-of-time file initializers.
//!
//! A code generator emits one [`FileInit`] per schema file, typically as a
//! `static`, pointing at the initializers of the files it imports. Loading
//! one into a pool with [`DefPool::load_init`](crate::DefPool::load_init)
//! loads its dependencies first and then the file itself, reusing the
//! generator's pre-built layout instead of computing one.

use crate::descriptor::FileDescriptor;

/// Everything needed to add one generated file to a pool.
///
/// ```
/// use tessera_defs::{DefPool, FileDescriptor, FileInit};
///
/// fn empty() -> FileDescriptor {
///     FileDescriptor::new("empty.proto")
/// }
/// static EMPTY: FileInit<'static> = FileInit {
///     name: "empty.proto",
///     deps: &[],
///     descriptor: empty,
///     layout: None,
/// };
///
/// let mut pool = DefPool::new();
/// let id = pool.load_init(&EMPTY).unwrap();
/// assert_eq!(pool.load_init(&EMPTY).unwrap(), id);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FileInit<'a> {
    /// File name; must equal the descriptor's name.
    pub name: &'a str,
    /// Initializers of the files this one imports.
    pub deps: &'a [&'a FileInit<'a>],
    /// Produces the file's schema description.
    pub descriptor: fn() -> FileDescriptor,
    /// File-form mini-descriptor for the file's messages. `None` lays the
    /// messages out at load time.
    pub layout: Option<&'a [u8]>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, MessageDescriptor};
    use crate::error::BuildError;
    use crate::pool::DefPool;
    use tessera_core::FieldType;

    fn base() -> FileDescriptor {
        FileDescriptor::new("base.proto")
            .package("b")
            .message(MessageDescriptor::new("Id").field(FieldDescriptor::new("v", 1, FieldType::UInt64)))
    }

    fn user() -> FileDescriptor {
        FileDescriptor::new("user.proto")
            .dependency("base.proto")
            .message(MessageDescriptor::new("User").field(FieldDescriptor::message("id", 1, "b.Id")))
    }

    static BASE: FileInit<'static> = FileInit {
        name: "base.proto",
        deps: &[],
        descriptor: base,
        layout: None,
    };

    static USER: FileInit<'static> = FileInit {
        name: "user.proto",
        deps: &[&BASE],
        descriptor: user,
        layout: None,
    };

    #[test]
    fn dependencies_load_first() {
        let mut pool = DefPool::new();
        pool.load_init(&USER).unwrap();
        assert_eq!(pool.file_count(), 2);
        assert_eq!(pool.find_file("base.proto").unwrap().id().0, 0);
        assert!(pool.find_message("User").is_some());
        pool.load_init(&BASE).unwrap();
        assert_eq!(pool.file_count(), 2);
    }

    #[test]
    fn supplied_layout_is_used() {
        let mut scratch = DefPool::new();
        let id = scratch.add_file(&base()).unwrap();
        let layout = scratch.file_layout(id).unwrap();

        let init = FileInit {
            name: "base.proto",
            deps: &[],
            descriptor: base,
            layout: Some(&layout),
        };
        let mut pool = DefPool::new();
        pool.load_init(&init).unwrap();
        let a = scratch.find_message("b.Id").unwrap();
        let b = pool.find_message("b.Id").unwrap();
        assert_eq!(scratch.tables().get(a.table()), pool.tables().get(b.table()));
    }

    #[test]
    fn name_mismatch_is_rejected() {
        let init = FileInit {
            name: "other.proto",
            deps: &[],
            descriptor: base,
            layout: None,
        };
        let mut pool = DefPool::new();
        assert!(matches!(
            pool.load_init(&init),
            Err(BuildError::InitNameMismatch { .. })
        ));
    }

    fn a() -> FileDescriptor {
        FileDescriptor::new("a.proto").dependency("b.proto")
    }

    fn b() -> FileDescriptor {
        FileDescriptor::new("b.proto").dependency("a.proto")
    }

    static CYCLE_A: FileInit<'static> = FileInit {
        name: "a.proto",
        deps: &[&CYCLE_B],
        descriptor: a,
        layout: None,
    };

    static CYCLE_B: FileInit<'static> = FileInit {
        name: "b.proto",
        deps: &[&CYCLE_A],
        descriptor: b,
        layout: None,
    };

    #[test]
    fn cycles_are_rejected() {
        let mut pool = DefPool::new();
        assert_eq!(
            pool.load_init(&CYCLE_A),
            Err(BuildError::CyclicDependency {
                file: "a.proto".into()
            })
        );
        assert_eq!(pool.file_count(), 0);
    }
}
