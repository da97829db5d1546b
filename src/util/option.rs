use std::hint;

/// Unwrapping for options the crate itself guarantees are [`Some`].
pub(crate) trait OptionExt<T> {
    /// Returns the contained value. A [`None`] hits [`unreachable!`] in debug builds.
    ///
    /// # Safety
    /// The option must be [`Some`]: headers read back from a block this crate wrote, or the walk
    /// stack while a walk is unfinished.
    unsafe fn assume_some(self) -> T;
}

impl<T> OptionExt<T> for Option<T> {
    unsafe fn assume_some(self) -> T {
        let Some(val) = self else {
            if cfg!(debug_assertions) {
                unreachable!("option the crate produced itself was None");
            }
            // SAFETY: Guaranteed by the caller.
            unsafe { hint::unreachable_unchecked() }
        };
        val
    }
}
