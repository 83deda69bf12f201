use crate::runtime::gc::GcHandle;

/// A key paired with a value handle, used to build named containers.
///
/// The value is not protected by the pair; it must be reachable from a root
/// until it has been stored in a protected container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArg {
    name: String,
    value: GcHandle,
}

impl NamedArg {
    pub fn new(name: impl Into<String>, value: GcHandle) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> GcHandle {
        self.value
    }
}

impl<S: Into<String>> From<(S, GcHandle)> for NamedArg {
    fn from((name, value): (S, GcHandle)) -> Self {
        Self::new(name, value)
    }
}
