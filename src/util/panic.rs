/// Asserts that running `$run` panics. The block may borrow vectors from the enclosing test.
#[allow(unused_macros)]
macro_rules! assert_panics {
    ($run:block) => {
        assert_panics!($run, concat!("expected a panic from ", stringify!($run)))
    };
    ($run:block, $msg:expr) => {{
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $run));
        assert!(outcome.is_err(), "{}", $msg);
    }};
}

#[allow(unused_imports)]
pub(crate) use assert_panics;
