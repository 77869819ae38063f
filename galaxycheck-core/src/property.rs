//! Property definitions for property-based testing.

use crate::check::{check, CheckResult};
use crate::data::Config;
use crate::error::Result;
use crate::gen::Gen;
use std::any::Any;
use std::cell::Cell;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Once;
use std::thread;

/// Result of running a property's test function on one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    /// The value is a counterexample. Carries the failure message, if any.
    Fail(Option<String>),
    /// The value did not meet a precondition and does not count.
    Discard,
}

impl Outcome {
    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }
}

/// Values a test function may return.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> Outcome {
        if self {
            Outcome::Pass
        } else {
            Outcome::Fail(None)
        }
    }
}

/// A unit-returning test passes unless it panics.
impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Outcome::Pass
    }
}

impl<E: Display> IntoOutcome for std::result::Result<(), E> {
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(()) => Outcome::Pass,
            Err(error) => Outcome::Fail(Some(error.to_string())),
        }
    }
}

/// Panic payload marking a failed precondition.
#[derive(Debug)]
struct PreconditionFailed;

/// Discard the current test case unless `condition` holds.
///
/// Call from inside a test function. The value is treated as neither a pass
/// nor a failure.
pub fn precondition(condition: bool) {
    if !condition {
        panic::resume_unwind(Box::new(PreconditionFailed));
    }
}

type TestFn<T> = Rc<dyn Fn(&T) -> Outcome>;

/// A property that can be tested with generated inputs.
pub struct Property<T> {
    gen: Gen<T>,
    test: TestFn<T>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Property {
            gen: self.gen.clone(),
            test: self.test.clone(),
        }
    }
}

impl<T: Clone + 'static> Property<T> {
    /// Create a property from a generator and test function.
    ///
    /// Panics inside the test function are caught and reported as failures
    /// carrying the panic message, so `assert!` works as expected. They are
    /// not printed; the failure message is shown in the check report.
    pub fn for_all<R, F>(gen: Gen<T>, test: F) -> Self
    where
        R: IntoOutcome,
        F: Fn(&T) -> R + 'static,
    {
        Property {
            gen,
            test: Rc::new(move |value: &T| {
                match capture_panic(|| test(value).into_outcome()) {
                    Ok(outcome) => outcome,
                    Err(payload) => outcome_from_panic(payload),
                }
            }),
        }
    }

    pub fn gen(&self) -> &Gen<T> {
        &self.gen
    }

    /// Run the test function on a single value.
    pub fn test(&self, value: &T) -> Outcome {
        (self.test)(value)
    }

    pub(crate) fn test_fn(&self) -> TestFn<T> {
        self.test.clone()
    }

    /// Check this property with the given configuration.
    pub fn check(&self, config: &Config) -> Result<CheckResult<T>> {
        check(self, config)
    }
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

fn capturing() -> bool {
    CAPTURING.with(Cell::get)
}

/// Wrap the process panic hook once so it stays silent on threads that are
/// currently running a test function. Other panics reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !capturing() {
                previous(info);
            }
        }));
    });
}

/// Run `f`, catching a panic without printing it.
fn capture_panic<R>(f: impl FnOnce() -> R) -> thread::Result<R> {
    install_quiet_hook();
    let was_capturing = CAPTURING.with(|flag| flag.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|flag| flag.set(was_capturing));
    result
}

fn outcome_from_panic(payload: Box<dyn Any + Send>) -> Outcome {
    if payload.is::<PreconditionFailed>() {
        return Outcome::Discard;
    }
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test function panicked".to_string()
    };
    Outcome::Fail(Some(message))
}

/// Create a property that checks a condition for all generated values.
pub fn for_all<T, R, F>(gen: Gen<T>, test: F) -> Property<T>
where
    T: Clone + 'static,
    R: IntoOutcome,
    F: Fn(&T) -> R + 'static,
{
    Property::for_all(gen, test)
}
