/// Macro to generate `_or_default()` methods that return a field's value
/// or a default when the field is `None` or empty.
///
/// # Usage
/// ```ignore
/// impl MyQuery {
///     impl_or_default!(pub, namespace_or_default, namespace, "default");
/// }
/// ```
#[macro_export]
macro_rules! impl_or_default {
    (pub, $method_name:ident, $field:ident, $default:expr) => {
        pub fn $method_name(&self) -> &str {
            self.$field
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or($default)
        }
    };
}
