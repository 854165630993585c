//! Method identity
//!
//! Every RPC is identified by a three-level name (`Namespace.Service.Method`)
//! plus a small per-service index assigned at generation time. The index is
//! used for O(1) lookup of per-method filter and middleware lists.

use std::fmt;

/// Immutable identity of one generated method.
///
/// Generated code declares one `static` per method:
///
/// ```
/// use trellis_common::protocol::MethodInfo;
///
/// static TEST_DO_SOMETHING: MethodInfo =
///     MethodInfo::new("Foo", "Test", "DoSomething", "Foo.Test.DoSomething", 0);
///
/// assert_eq!(TEST_DO_SOMETHING.rpc_path(), "/rpc/Foo.Test.DoSomething");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    pub namespace: &'static str,
    pub service_name: &'static str,
    pub method_name: &'static str,
    /// Dot-joined `namespace.service_name.method_name`
    pub full_method_name: &'static str,
    /// Position of the method within its service
    pub index: usize,
}

impl MethodInfo {
    pub const fn new(
        namespace: &'static str,
        service_name: &'static str,
        method_name: &'static str,
        full_method_name: &'static str,
        index: usize,
    ) -> Self {
        Self {
            namespace,
            service_name,
            method_name,
            full_method_name,
            index,
        }
    }

    /// HTTP path the method is served on.
    pub fn rpc_path(&self) -> String {
        format!("/rpc/{}", self.full_method_name)
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_method_name)
    }
}

/// Key of the filter and middleware option tables.
///
/// `Any` entries are prepended to the list of every method of the service.
/// Selectors are only used while building tables, never at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodSelector {
    Any,
    Index(usize),
}

/// Shorthand for [`MethodSelector::Any`].
pub const ANY_METHOD: MethodSelector = MethodSelector::Any;

impl From<&MethodInfo> for MethodSelector {
    fn from(method: &MethodInfo) -> Self {
        MethodSelector::Index(method.index)
    }
}

impl From<usize> for MethodSelector {
    fn from(index: usize) -> Self {
        MethodSelector::Index(index)
    }
}
