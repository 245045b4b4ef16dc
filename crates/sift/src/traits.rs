//! The [`Seekable`] trait: how records expose themselves to the engine.

use std::borrow::Cow;

use serde_json::Value;

/// Trait for types that can be filtered by sift.
///
/// The engine matches expressions against a structural JSON view of each
/// record. [`serde_json::Value`] implements this by borrowing itself, so
/// JSON collections are filtered without copying.
///
/// # Serde-backed Implementation
///
/// Most structs derive `Serialize` and use [`seekable_via_serde!`]:
///
/// ```
/// use serde::Serialize;
/// use sift::seekable_via_serde;
///
/// #[derive(Serialize)]
/// struct Task {
///     name: String,
///     priority: u8,
/// }
///
/// seekable_via_serde!(Task);
/// ```
///
/// # Manual Implementation
///
/// ```
/// use std::borrow::Cow;
/// use serde_json::{json, Value};
/// use sift::Seekable;
///
/// struct Task {
///     name: String,
///     priority: u8,
/// }
///
/// impl Seekable for Task {
///     fn seek_value(&self) -> Cow<'_, Value> {
///         Cow::Owned(json!({"name": self.name, "priority": self.priority}))
///     }
/// }
/// ```
pub trait Seekable {
    /// Returns the structural view of this record used for matching and ordering.
    fn seek_value(&self) -> Cow<'_, Value>;
}

impl Seekable for Value {
    fn seek_value(&self) -> Cow<'_, Value> {
        Cow::Borrowed(self)
    }
}

impl Seekable for String {
    fn seek_value(&self) -> Cow<'_, Value> {
        Cow::Owned(Value::String(self.clone()))
    }
}

impl Seekable for bool {
    fn seek_value(&self) -> Cow<'_, Value> {
        Cow::Owned(Value::Bool(*self))
    }
}

impl Seekable for i64 {
    fn seek_value(&self) -> Cow<'_, Value> {
        Cow::Owned(Value::from(*self))
    }
}

impl Seekable for f64 {
    fn seek_value(&self) -> Cow<'_, Value> {
        Cow::Owned(Value::from(*self))
    }
}

/// Implements [`Seekable`] for `Serialize` types by converting through
/// `serde_json::to_value`. Values that fail to serialize are seen as `null`.
#[macro_export]
macro_rules! seekable_via_serde {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Seekable for $ty {
                fn seek_value(&self) -> ::std::borrow::Cow<'_, $crate::__private::Value> {
                    ::std::borrow::Cow::Owned(
                        $crate::__private::to_value(self).unwrap_or($crate::__private::Value::Null),
                    )
                }
            }
        )+
    };
}
