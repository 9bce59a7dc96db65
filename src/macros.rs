//! Leveled logging macros
//!
//! Every macro takes the dispatcher first, then an optional `err = <error>,`
//! and `tag = <tag>,`, then `format!` arguments:
//!
//! ```ignore
//! woodlog::warn!(dispatcher, "retrying upload {} of {}", attempt, max);
//! woodlog::error!(dispatcher, err = &e, "upload failed");
//! woodlog::info!(dispatcher, tag = "Sync", "done in {:?}", elapsed);
//! ```
//!
//! The call site (function path, file, line) is recorded at compile time, so no
//! stack walk happens.

/// The `CallSite` of the enclosing function
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __f() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __type_name_of(__f);
        $crate::probe::CallSite::new(
            name.strip_suffix("::__f").unwrap_or(name),
            ::std::file!(),
            ::std::line!(),
        )
    }};
}

/// Log at an explicit level
#[macro_export]
macro_rules! log {
    ($dispatcher:expr, $level:expr, err = $err:expr, tag = $tag:expr, $($arg:tt)+) => {{
        let __message = ::std::format!($($arg)+);
        $dispatcher.dispatch_at(
            $crate::call_site!(),
            ::std::option::Option::Some($tag),
            $level,
            &__message,
            ::std::option::Option::Some($err as &(dyn ::std::error::Error + 'static)),
            &[],
        );
    }};
    ($dispatcher:expr, $level:expr, err = $err:expr, $($arg:tt)+) => {{
        let __message = ::std::format!($($arg)+);
        $dispatcher.dispatch_at(
            $crate::call_site!(),
            ::std::option::Option::None,
            $level,
            &__message,
            ::std::option::Option::Some($err as &(dyn ::std::error::Error + 'static)),
            &[],
        );
    }};
    ($dispatcher:expr, $level:expr, tag = $tag:expr, $($arg:tt)+) => {{
        let __message = ::std::format!($($arg)+);
        $dispatcher.dispatch_at(
            $crate::call_site!(),
            ::std::option::Option::Some($tag),
            $level,
            &__message,
            ::std::option::Option::None,
            &[],
        );
    }};
    ($dispatcher:expr, $level:expr, $($arg:tt)+) => {{
        let __message = ::std::format!($($arg)+);
        $dispatcher.dispatch_at(
            $crate::call_site!(),
            ::std::option::Option::None,
            $level,
            &__message,
            ::std::option::Option::None,
            &[],
        );
    }};
}

#[macro_export]
macro_rules! verbose {
    ($dispatcher:expr, $($rest:tt)+) => {
        $crate::log!($dispatcher, $crate::level::Level::Verbose, $($rest)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($dispatcher:expr, $($rest:tt)+) => {
        $crate::log!($dispatcher, $crate::level::Level::Debug, $($rest)+)
    };
}

#[macro_export]
macro_rules! info {
    ($dispatcher:expr, $($rest:tt)+) => {
        $crate::log!($dispatcher, $crate::level::Level::Info, $($rest)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($dispatcher:expr, $($rest:tt)+) => {
        $crate::log!($dispatcher, $crate::level::Level::Warn, $($rest)+)
    };
}

#[macro_export]
macro_rules! error {
    ($dispatcher:expr, $($rest:tt)+) => {
        $crate::log!($dispatcher, $crate::level::Level::Error, $($rest)+)
    };
}

/// Log at ASSERT; terminates the call when any sink accepts it
#[macro_export]
macro_rules! wtf {
    ($dispatcher:expr, $($rest:tt)+) => {
        $crate::log!($dispatcher, $crate::level::Level::Assert, $($rest)+)
    };
}
