#[cfg(feature = "tracing")]
macro_rules! mtrace {
    ($($tt:tt)*) => {
        tracing::trace!(target: "masonry", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! mtrace {
    ($($tt:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! mdebug {
    ($($tt:tt)*) => {
        tracing::debug!(target: "masonry", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! mdebug {
    ($($tt:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! mwarn {
    ($($tt:tt)*) => {
        tracing::warn!(target: "masonry", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! mwarn {
    ($($tt:tt)*) => {};
}
