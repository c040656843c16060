//! Fallible construction.
//!
//! | Pattern | Use When |
//! |---------|----------|
//! | `new()` | Construction always succeeds |
//! | [`TryNew`] | Construction validates its input and may fail |
//! | `TryFrom<T>` | Converting from another type |
//!
//! Types implementing `TryNew` do not also offer a plain `new()` that
//! performs the same validation; the `try_` prefix keeps fallibility
//! visible at the call site.

/// Trait for fallible construction with validation.
///
/// # Example
///
/// ```
/// use agentree_types::TryNew;
///
/// struct Percent(f64);
///
/// #[derive(Debug, PartialEq)]
/// struct OutOfRange;
///
/// impl TryNew for Percent {
///     type Error = OutOfRange;
///     type Args = f64;
///
///     fn try_new(value: f64) -> Result<Self, Self::Error> {
///         if !(0.0..=100.0).contains(&value) {
///             return Err(OutOfRange);
///         }
///         Ok(Percent(value))
///     }
/// }
///
/// assert!(Percent::try_new(50.0).is_ok());
/// assert_eq!(Percent::try_new(120.0).err(), Some(OutOfRange));
/// ```
pub trait TryNew: Sized {
    /// Error returned when validation fails.
    type Error;

    /// Arguments required for construction (use a tuple for several).
    type Args;

    /// Validates `args` and constructs `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] when the arguments violate the type's invariants.
    fn try_new(args: Self::Args) -> Result<Self, Self::Error>;
}
